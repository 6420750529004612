// src/db/event_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::contracts::EventLog,
    models::events::{AuditEntry, TimelineEntry},
};

// Timeline e auditoria são apenas-append: este repositório não expõe
// UPDATE nem DELETE.
#[derive(Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventLog for EventRepository {
    async fn append_timeline(&self, entry: &TimelineEntry) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO ticket_timeline (
                id, ticket_id, tenant_id, kind, message,
                next_action_at, next_action_note, actor_id, actor_name, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(entry.id)
        .bind(entry.ticket_id)
        .bind(entry.tenant_id)
        .bind(entry.kind)
        .bind(&entry.message)
        .bind(entry.next_action_at)
        .bind(&entry.next_action_note)
        .bind(entry.actor_id)
        .bind(&entry.actor_name)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn append_audit(&self, entry: &AuditEntry) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO ticket_audit (
                id, ticket_id, tenant_id, kind, from_status, to_status,
                reason, actor_id, actor_name, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(entry.id)
        .bind(entry.ticket_id)
        .bind(entry.tenant_id)
        .bind(entry.kind)
        .bind(entry.from_status)
        .bind(entry.to_status)
        .bind(&entry.reason)
        .bind(entry.actor_id)
        .bind(&entry.actor_name)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_timeline(&self, ticket_id: Uuid) -> Result<Vec<TimelineEntry>, AppError> {
        let entries = sqlx::query_as::<_, TimelineEntry>(
            "SELECT * FROM ticket_timeline WHERE ticket_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn list_audit(&self, ticket_id: Uuid) -> Result<Vec<AuditEntry>, AppError> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            "SELECT * FROM ticket_audit WHERE ticket_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
