pub mod auth;
pub mod events;
pub mod query;
pub mod ticket;
