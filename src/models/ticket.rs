// src/models/ticket.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enums ---

// Mapeia o CREATE TYPE ticket_status do banco. A ordem das variantes segue
// a esteira operacional; a posição na cadeia vem da tabela de transições
// (services::transition), nunca daqui.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "ticket_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Recebimento,
    Interno,
    EntregaLogistica,
    CobrancaAcompanhamento,
    Resolucao,
    Encerrado,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Recebimento => "RECEBIMENTO",
            TicketStatus::Interno => "INTERNO",
            TicketStatus::EntregaLogistica => "ENTREGA_LOGISTICA",
            TicketStatus::CobrancaAcompanhamento => "COBRANCA_ACOMPANHAMENTO",
            TicketStatus::Resolucao => "RESOLUCAO",
            TicketStatus::Encerrado => "ENCERRADO",
        }
    }
}

// Desfecho do chamado, definido ao sair de RESOLUCAO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "resolution_result", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionResult {
    Credito,
    Troca,
    Negado,
}

// --- Structs ---

// Um registro por status alcançado: quando e por quem o chamado chegou lá.
// Log apenas-append; um revert não remove registros, e uma etapa revisitada
// ganha um registro novo.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StageRecord {
    pub status: TicketStatus,
    pub completed_at: DateTime<Utc>,
    pub actor_id: Uuid,
    pub actor_name: String,
}

// Fornecedor homologado do tenant. O CRUD administrativo mora em outro
// serviço; aqui é consulta somente-leitura para congelar nome e SLA.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "Eletropeças Ltda")]
    pub name: String,
    #[schema(example = 10)]
    pub sla_days: i32,
}

// O chamado de garantia. Campos de status só mudam pelo WorkflowService;
// campos descritivos mudam pelo endpoint de edição direta.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub store_id: Uuid,
    pub status: TicketStatus,

    // Cliente e venda de origem
    #[schema(example = "Maria das Dores")]
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub customer_document: Option<String>,
    pub sale_number: Option<String>,

    // Peça e defeito
    #[schema(example = "Compressor 110V")]
    pub part_description: String,
    pub defect_description: Option<String>,

    // Fornecedor e SLA: congelados na saída de INTERNO, imutáveis até um revert
    pub supplier_id: Option<Uuid>,
    pub supplier_name: Option<String>,
    pub sla_days: Option<i32>,
    #[schema(example = "NF-123456")]
    pub outbound_invoice: Option<String>,
    pub sent_to_supplier_at: Option<NaiveDate>,
    pub delivered_to_supplier_at: Option<DateTime<Utc>>,
    pub due_date: Option<NaiveDate>,

    // Acompanhamento de cobrança
    pub next_action_at: Option<NaiveDate>,
    pub next_action_note: Option<String>,
    pub supplier_response: Option<String>,

    // Resolução e encerramento
    pub resolution_result: Option<ResolutionResult>,
    pub resolution_notes: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,
    // Espelho de status == ENCERRADO, mantido para o índice de atrasados
    pub is_closed: bool,

    #[schema(ignore)]
    pub search_tokens: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // Carregado da tabela filha; não é coluna de tickets
    #[sqlx(skip)]
    pub stage_history: Vec<StageRecord>,
}
