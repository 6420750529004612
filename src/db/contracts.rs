// src/db/contracts.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::events::{Attachment, AttachmentCategory, AuditEntry, TimelineEntry},
    models::query::{NextActionCounts, TicketFilter, TicketPage},
    models::ticket::{ResolutionResult, StageRecord, Supplier, Ticket, TicketStatus},
};

// Contratos que o motor de workflow consome. As implementações Postgres
// moram neste módulo; os testes de serviço usam versões em memória.
// Os serviços recebem Arc<dyn ...> no construtor — nada de estado global.

// Dados do fornecedor congelados na saída de INTERNO. Depois de gravados,
// só um revert os limpa.
#[derive(Debug, Clone)]
pub struct SupplierFreeze {
    pub supplier_id: Uuid,
    pub supplier_name: String,
    pub sla_days: i32,
    pub delivered_at: DateTime<Utc>,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct ResolutionUpdate {
    pub result: ResolutionResult,
    pub notes: Option<String>,
}

// Mutação de status a ser aplicada num único write condicional. Os campos
// `clear_*` atendem ao revert: nenhum dado de etapa posterior sobrevive a
// um retorno de status.
#[derive(Debug, Clone)]
pub struct TransitionUpdate {
    pub to_status: TicketStatus,
    pub is_closed: bool,
    pub freeze_supplier: Option<SupplierFreeze>,
    pub supplier_response: Option<String>,
    pub resolution: Option<ResolutionUpdate>,
    pub closed_at: Option<DateTime<Utc>>,
    pub clear_supplier_assignment: bool,
    pub clear_supplier_response: bool,
    pub clear_resolution: bool,
    pub clear_closed: bool,
}

impl TransitionUpdate {
    pub fn to(status: TicketStatus) -> Self {
        Self {
            to_status: status,
            is_closed: false,
            freeze_supplier: None,
            supplier_response: None,
            resolution: None,
            closed_at: None,
            clear_supplier_assignment: false,
            clear_supplier_response: false,
            clear_resolution: false,
            clear_closed: false,
        }
    }
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Busca por id, com histórico de etapas carregado. O escopo de tenant
    /// é verificado pelo chamador, que rejeita (não filtra) divergências.
    async fn get(&self, ticket_id: Uuid) -> Result<Option<Ticket>, AppError>;

    /// Grava o chamado recém-criado junto com seu histórico inicial.
    async fn insert(&self, ticket: &Ticket) -> Result<(), AppError>;

    /// Aplica a mutação de status e o registro de etapa numa única
    /// transação, condicionada ao status esperado. Retorna `false` quando
    /// outro escritor transicionou o chamado primeiro; nesse caso nada é
    /// gravado.
    async fn commit_transition(
        &self,
        ticket_id: Uuid,
        tenant_id: Uuid,
        expected: TicketStatus,
        update: &TransitionUpdate,
        stage: Option<&StageRecord>,
    ) -> Result<bool, AppError>;

    /// Persiste os campos descritivos e os tokens de busca já mesclados
    /// pelo serviço.
    async fn update_details(&self, ticket: &Ticket) -> Result<(), AppError>;

    /// Sobrescrita da próxima ação, efeito colateral de um registro de
    /// timeline que a carrega.
    async fn set_next_action(
        &self,
        ticket_id: Uuid,
        tenant_id: Uuid,
        at: NaiveDate,
        note: Option<&str>,
    ) -> Result<(), AppError>;

    /// Caminho indexado: filtros empurrados para o banco. A listagem não
    /// carrega o histórico de etapas.
    async fn query(
        &self,
        tenant_id: Uuid,
        filter: &TicketFilter,
        today: NaiveDate,
        limit: i64,
        cursor: Option<Uuid>,
    ) -> Result<TicketPage, AppError>;

    /// Caminho de varredura: conjunto completo do tenant, filtrado em
    /// memória pela estratégia Scan do motor de consulta.
    async fn list_by_tenant(&self, tenant_id: Uuid) -> Result<Vec<Ticket>, AppError>;

    /// Contadores de próxima ação (atrasada / hoje / próximos 7 dias)
    /// sobre os chamados abertos do tenant.
    async fn count_next_actions(
        &self,
        tenant_id: Uuid,
        today: NaiveDate,
    ) -> Result<NextActionCounts, AppError>;
}

#[async_trait]
pub trait SupplierDirectory: Send + Sync {
    async fn get(&self, supplier_id: Uuid, tenant_id: Uuid) -> Result<Option<Supplier>, AppError>;
}

#[async_trait]
pub trait AttachmentGate: Send + Sync {
    /// Gate de transição: existe anexo da categoria no chamado?
    async fn exists(
        &self,
        ticket_id: Uuid,
        category: AttachmentCategory,
    ) -> Result<bool, AppError>;

    async fn list_for_ticket(&self, ticket_id: Uuid) -> Result<Vec<Attachment>, AppError>;
}

#[async_trait]
pub trait EventLog: Send + Sync {
    async fn append_timeline(&self, entry: &TimelineEntry) -> Result<(), AppError>;
    async fn append_audit(&self, entry: &AuditEntry) -> Result<(), AppError>;
    async fn list_timeline(&self, ticket_id: Uuid) -> Result<Vec<TimelineEntry>, AppError>;
    async fn list_audit(&self, ticket_id: Uuid) -> Result<Vec<AuditEntry>, AppError>;
}
