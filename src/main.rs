//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::middleware::auth::identity_guard;

#[tokio::main]
async fn main() {
    // Inicializa o logger
    tracing_subscriber::fmt().with_target(false).compact().init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    // Roda as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Rotas do fluxo de garantias. O gateway autentica; o identity_guard
    // só materializa a identidade repassada nos cabeçalhos.
    let ticket_routes = Router::new()
        .route(
            "/",
            post(handlers::tickets::create_ticket)
                .get(handlers::tickets::list_tickets),
        )
        .route("/buckets", get(handlers::tickets::next_action_buckets))
        .route(
            "/{id}",
            get(handlers::tickets::get_ticket).put(handlers::tickets::update_ticket),
        )
        .route("/{id}/advance", post(handlers::tickets::advance_ticket))
        .route("/{id}/revert", post(handlers::tickets::revert_ticket))
        .route("/{id}/checklist", get(handlers::tickets::get_checklist))
        .route("/{id}/summary", get(handlers::tickets::get_stage_summary))
        .route(
            "/{id}/timeline",
            get(handlers::tickets::list_timeline)
                .post(handlers::tickets::create_timeline_entry),
        )
        .route("/{id}/audit", get(handlers::tickets::list_audit))
        .layer(axum_middleware::from_fn(identity_guard));

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/tickets", ticket_routes)
        .merge(
            SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", docs::ApiDoc::openapi()),
        )
        .with_state(app_state);

    // Inicia o servidor
    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}
