// src/handlers/tickets.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, tenancy::TenantContext},
    models::query::TicketFilter,
    models::ticket::{ResolutionResult, TicketStatus},
    models::events::TimelineKind,
    services::transition::AdvanceInput,
    services::workflow_service::{NewTicketInput, NewTimelineEntry, UpdateTicketInput},
};

// =============================================================================
//  1. ABERTURA E EDIÇÃO
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketPayload {
    pub store_id: Uuid,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Maria das Dores")]
    pub customer_name: String,

    #[schema(example = "(11) 91234-5678")]
    pub customer_phone: Option<String>,

    #[schema(example = "123.456.789-00")]
    pub customer_document: Option<String>,

    #[schema(example = "VD-0042")]
    pub sale_number: Option<String>,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Compressor 110V")]
    pub part_description: String,

    #[schema(example = "Não gela")]
    pub defect_description: Option<String>,
}

// POST /api/tickets
#[utoipa::path(
    post,
    path = "/api/tickets",
    tag = "Tickets",
    request_body = CreateTicketPayload,
    responses(
        (status = 201, description = "Chamado aberto no RECEBIMENTO", body = crate::models::ticket::Ticket)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    )
)]
pub async fn create_ticket(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<CreateTicketPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let ticket = app_state
        .workflow_service
        .create_ticket(
            tenant.0,
            &user.0,
            NewTicketInput {
                store_id: payload.store_id,
                customer_name: payload.customer_name,
                customer_phone: payload.customer_phone,
                customer_document: payload.customer_document,
                sale_number: payload.sale_number,
                part_description: payload.part_description,
                defect_description: payload.defect_description,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ticket)))
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTicketPayload {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_document: Option<String>,
    pub sale_number: Option<String>,
    pub part_description: Option<String>,
    pub defect_description: Option<String>,
    pub supplier_id: Option<Uuid>,
    #[schema(example = "NF-123456")]
    pub outbound_invoice: Option<String>,
    pub sent_to_supplier_at: Option<NaiveDate>,
}

// PUT /api/tickets/{id}
#[utoipa::path(
    put,
    path = "/api/tickets/{id}",
    tag = "Tickets",
    request_body = UpdateTicketPayload,
    responses(
        (status = 200, description = "Campos descritivos atualizados (tokens de busca reconstruídos)", body = crate::models::ticket::Ticket),
        (status = 404, description = "Chamado não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do Chamado"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    )
)]
pub async fn update_ticket(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTicketPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let ticket = app_state
        .workflow_service
        .update_details(
            id,
            tenant.0,
            UpdateTicketInput {
                customer_name: payload.customer_name,
                customer_phone: payload.customer_phone,
                customer_document: payload.customer_document,
                sale_number: payload.sale_number,
                part_description: payload.part_description,
                defect_description: payload.defect_description,
                supplier_id: payload.supplier_id,
                outbound_invoice: payload.outbound_invoice,
                sent_to_supplier_at: payload.sent_to_supplier_at,
            },
        )
        .await?;

    Ok(Json(ticket))
}

// =============================================================================
//  2. CONSULTA
// =============================================================================

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListTicketsParams {
    pub status: Option<TicketStatus>,
    pub store_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub search: Option<String>,
    #[serde(default)]
    pub overdue_only: bool,
    #[serde(default)]
    pub action_today_only: bool,
    pub limit: Option<i64>,
    pub cursor: Option<Uuid>,
}

// GET /api/tickets
#[utoipa::path(
    get,
    path = "/api/tickets",
    tag = "Tickets",
    responses(
        (status = 200, description = "Página de chamados do tenant", body = crate::models::query::TicketPage)
    ),
    params(
        ListTicketsParams,
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    )
)]
pub async fn list_tickets(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    tenant: TenantContext,
    Query(params): Query<ListTicketsParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = TicketFilter {
        status: params.status,
        store_id: params.store_id,
        supplier_id: params.supplier_id,
        search: params.search,
        overdue_only: params.overdue_only,
        action_today_only: params.action_today_only,
    };

    let page = app_state
        .query_service
        .list(tenant.0, &filter, params.limit.unwrap_or(20), params.cursor)
        .await?;

    Ok(Json(page))
}

// GET /api/tickets/buckets
#[utoipa::path(
    get,
    path = "/api/tickets/buckets",
    tag = "Tickets",
    responses(
        (status = 200, description = "Contadores de próxima ação (atrasada / hoje / próximos 7 dias)", body = crate::models::query::NextActionCounts)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    )
)]
pub async fn next_action_buckets(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    let counts = app_state.query_service.next_action_counts(tenant.0).await?;
    Ok(Json(counts))
}

// GET /api/tickets/{id}
#[utoipa::path(
    get,
    path = "/api/tickets/{id}",
    tag = "Tickets",
    responses(
        (status = 200, description = "Chamado com histórico de etapas", body = crate::models::ticket::Ticket),
        (status = 404, description = "Chamado não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do Chamado"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    )
)]
pub async fn get_ticket(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let ticket = app_state.workflow_service.get_ticket(id, tenant.0).await?;
    Ok(Json(ticket))
}

// GET /api/tickets/{id}/checklist
#[utoipa::path(
    get,
    path = "/api/tickets/{id}/checklist",
    tag = "Tickets",
    responses(
        (status = 200, description = "Requisitos pendentes para a próxima etapa", body = crate::services::transition::TransitionChecklist)
    ),
    params(
        ("id" = Uuid, Path, description = "ID do Chamado"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    )
)]
pub async fn get_checklist(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let checklist = app_state.workflow_service.checklist(id, tenant.0).await?;
    Ok(Json(checklist))
}

// GET /api/tickets/{id}/summary
#[utoipa::path(
    get,
    path = "/api/tickets/{id}/summary",
    tag = "Tickets",
    responses(
        (status = 200, description = "Resumo por etapa: responsável, conclusão, último registro e anexos", body = [crate::services::summary_service::StageSummary])
    ),
    params(
        ("id" = Uuid, Path, description = "ID do Chamado"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    )
)]
pub async fn get_stage_summary(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let summaries = app_state.summary_service.stage_summaries(id, tenant.0).await?;
    Ok(Json(summaries))
}

// =============================================================================
//  3. TRANSIÇÕES
// =============================================================================

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceTicketPayload {
    pub supplier_id: Option<Uuid>,
    #[schema(example = "Troca autorizada pelo fornecedor")]
    pub supplier_response: Option<String>,
    pub resolution_result: Option<ResolutionResult>,
    pub resolution_notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionResponse {
    pub status: TicketStatus,
}

// POST /api/tickets/{id}/advance
#[utoipa::path(
    post,
    path = "/api/tickets/{id}/advance",
    tag = "Tickets",
    request_body = AdvanceTicketPayload,
    responses(
        (status = 200, description = "Chamado avançado uma etapa", body = TransitionResponse),
        (status = 400, description = "Transição inválida ou requisito pendente"),
        (status = 403, description = "Perfil sem permissão para a etapa"),
        (status = 409, description = "Outro operador transicionou o chamado antes")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do Chamado"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    )
)]
pub async fn advance_ticket(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdvanceTicketPayload>,
) -> Result<impl IntoResponse, AppError> {
    let status = app_state
        .workflow_service
        .advance(
            id,
            tenant.0,
            &user.0,
            AdvanceInput {
                supplier_id: payload.supplier_id,
                supplier_response: payload.supplier_response,
                resolution_result: payload.resolution_result,
                resolution_notes: payload.resolution_notes,
            },
        )
        .await?;

    Ok(Json(TransitionResponse { status }))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevertTicketPayload {
    pub target_status: TicketStatus,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Fornecedor errado")]
    pub reason: String,
}

// POST /api/tickets/{id}/revert
#[utoipa::path(
    post,
    path = "/api/tickets/{id}/revert",
    tag = "Tickets",
    request_body = RevertTicketPayload,
    responses(
        (status = 200, description = "Chamado retornado ao status anterior", body = TransitionResponse),
        (status = 400, description = "Alvo não antecede o status atual"),
        (status = 403, description = "Somente administradores")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do Chamado"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    )
)]
pub async fn revert_ticket(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<RevertTicketPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let status = app_state
        .workflow_service
        .revert(id, tenant.0, &user.0, payload.target_status, &payload.reason)
        .await?;

    Ok(Json(TransitionResponse { status }))
}

// =============================================================================
//  4. TIMELINE E AUDITORIA
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTimelineEntryPayload {
    #[schema(example = "TELEFONE")]
    pub kind: TimelineKind,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Fornecedor prometeu retorno na sexta")]
    pub message: String,

    pub next_action_at: Option<NaiveDate>,
    pub next_action_note: Option<String>,
}

// POST /api/tickets/{id}/timeline
#[utoipa::path(
    post,
    path = "/api/tickets/{id}/timeline",
    tag = "Tickets",
    request_body = CreateTimelineEntryPayload,
    responses(
        (status = 201, description = "Registro criado; próxima ação do chamado atualizada quando presente", body = crate::models::events::TimelineEntry)
    ),
    params(
        ("id" = Uuid, Path, description = "ID do Chamado"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    )
)]
pub async fn create_timeline_entry(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateTimelineEntryPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let entry = app_state
        .workflow_service
        .register_entry(
            id,
            tenant.0,
            &user.0,
            NewTimelineEntry {
                kind: payload.kind,
                message: payload.message,
                next_action_at: payload.next_action_at,
                next_action_note: payload.next_action_note,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(entry)))
}

// GET /api/tickets/{id}/timeline
#[utoipa::path(
    get,
    path = "/api/tickets/{id}/timeline",
    tag = "Tickets",
    responses(
        (status = 200, description = "Linha do tempo do chamado", body = [crate::models::events::TimelineEntry])
    ),
    params(
        ("id" = Uuid, Path, description = "ID do Chamado"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    )
)]
pub async fn list_timeline(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let entries = app_state.workflow_service.list_timeline(id, tenant.0).await?;
    Ok(Json(entries))
}

// GET /api/tickets/{id}/audit
#[utoipa::path(
    get,
    path = "/api/tickets/{id}/audit",
    tag = "Tickets",
    responses(
        (status = 200, description = "Trilha de auditoria do chamado", body = [crate::models::events::AuditEntry])
    ),
    params(
        ("id" = Uuid, Path, description = "ID do Chamado"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    )
)]
pub async fn list_audit(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let entries = app_state.workflow_service.list_audit(id, tenant.0).await?;
    Ok(Json(entries))
}
