// src/config.rs

use std::{env, sync::Arc, time::Duration};

use chrono_tz::Tz;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::contracts::{AttachmentGate, EventLog, SupplierDirectory, TicketStore},
    db::{AttachmentRepository, EventRepository, SupplierRepository, TicketRepository},
    services::query_service::{QueryStrategy, TicketQueryService},
    services::summary_service::StageSummaryService,
    services::workflow_service::WorkflowService,
};

// Fuso padrão dos tenants brasileiros; sobrescrito por APP_TIMEZONE.
const DEFAULT_TIMEZONE: &str = "America/Sao_Paulo";

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub workflow_service: WorkflowService,
    pub query_service: TicketQueryService,
    pub summary_service: StageSummaryService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");

        let timezone: Tz = env::var("APP_TIMEZONE")
            .unwrap_or_else(|_| DEFAULT_TIMEZONE.to_string())
            .parse()
            .map_err(|e| anyhow::anyhow!("APP_TIMEZONE inválida: {}", e))?;

        // Estratégia de consulta escolhida aqui, na configuração — nunca
        // deduzida de erro do provedor em tempo de execução.
        let indexed_queries = env::var("INDEXED_QUERIES")
            .map(|v| v.trim().to_ascii_lowercase() != "false")
            .unwrap_or(true);

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let tickets: Arc<dyn TicketStore> = Arc::new(TicketRepository::new(db_pool.clone()));
        let suppliers: Arc<dyn SupplierDirectory> =
            Arc::new(SupplierRepository::new(db_pool.clone()));
        let attachments: Arc<dyn AttachmentGate> =
            Arc::new(AttachmentRepository::new(db_pool.clone()));
        let events: Arc<dyn EventLog> = Arc::new(EventRepository::new(db_pool.clone()));

        let workflow_service = WorkflowService::new(
            tickets.clone(),
            suppliers,
            attachments.clone(),
            events.clone(),
            timezone,
        );

        let strategy = if indexed_queries {
            QueryStrategy::Indexed
        } else {
            QueryStrategy::Scan
        };
        let query_service = TicketQueryService::new(tickets.clone(), strategy, timezone);

        let summary_service = StageSummaryService::new(tickets, attachments, events);

        Ok(Self {
            db_pool,
            workflow_service,
            query_service,
            summary_service,
        })
    }
}
