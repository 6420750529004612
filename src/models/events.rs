// src/models/events.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Timeline (narrativa operacional) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "timeline_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimelineKind {
    Nota,
    Telefone,
    Email,
    // Registro automático gravado pelo motor a cada mudança de status
    MudancaStatus,
}

// Evento visível na linha do tempo do chamado. Apenas-append. Quando o
// registro carrega próxima ação, ela sobrescreve os campos de próxima
// ação do chamado como efeito colateral.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub id: Uuid,
    pub ticket_id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub kind: TimelineKind,
    #[schema(example = "Fornecedor prometeu retorno na sexta")]
    pub message: String,
    pub next_action_at: Option<NaiveDate>,
    pub next_action_note: Option<String>,
    pub actor_id: Uuid,
    pub actor_name: String,
    pub created_at: DateTime<Utc>,
}

// --- Auditoria (trilha de conformidade) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "audit_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditKind {
    StatusChange,
    AdminRevert,
    // Gravado pelo subsistema de arquivos quando um anexo é subido
    Upload,
}

// Distinta da timeline: a auditoria responde quem/quando/por quê/de→para.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: Uuid,
    pub ticket_id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub kind: AuditKind,
    pub from_status: Option<super::ticket::TicketStatus>,
    pub to_status: Option<super::ticket::TicketStatus>,
    pub reason: Option<String>,
    pub actor_id: Uuid,
    pub actor_name: String,
    pub created_at: DateTime<Utc>,
}

// --- Anexos ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "attachment_category", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttachmentCategory {
    // Comprovante de entrega exigido para sair de ENTREGA_LOGISTICA
    Canhoto,
    NotaFiscal,
    Foto,
    Outro,
}

// Metadado do arquivo; o binário vive no provedor de storage e o upload
// acontece fora deste serviço. Imutável depois de criado.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: Uuid,
    pub ticket_id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub category: AttachmentCategory,
    pub file_id: String,
    pub file_name: Option<String>,
    pub created_at: DateTime<Utc>,
}
