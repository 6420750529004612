// src/docs.rs

use utoipa::OpenApi;

use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Abertura e edição ---
        handlers::tickets::create_ticket,
        handlers::tickets::update_ticket,

        // --- Consulta ---
        handlers::tickets::list_tickets,
        handlers::tickets::next_action_buckets,
        handlers::tickets::get_ticket,
        handlers::tickets::get_checklist,
        handlers::tickets::get_stage_summary,

        // --- Transições ---
        handlers::tickets::advance_ticket,
        handlers::tickets::revert_ticket,

        // --- Timeline e auditoria ---
        handlers::tickets::create_timeline_entry,
        handlers::tickets::list_timeline,
        handlers::tickets::list_audit,
    ),
    components(
        schemas(
            // --- Domínio ---
            models::ticket::TicketStatus,
            models::ticket::ResolutionResult,
            models::ticket::StageRecord,
            models::ticket::Supplier,
            models::ticket::Ticket,
            models::auth::Role,
            models::auth::Actor,

            // --- Eventos ---
            models::events::TimelineKind,
            models::events::TimelineEntry,
            models::events::AuditKind,
            models::events::AuditEntry,
            models::events::AttachmentCategory,
            models::events::Attachment,

            // --- Consulta ---
            models::query::TicketFilter,
            models::query::TicketPage,
            models::query::NextActionBucket,
            models::query::NextActionCounts,

            // --- Workflow ---
            services::transition::ChecklistItem,
            services::transition::TransitionChecklist,
            services::summary_service::StageSummary,

            // --- Payloads ---
            handlers::tickets::CreateTicketPayload,
            handlers::tickets::UpdateTicketPayload,
            handlers::tickets::AdvanceTicketPayload,
            handlers::tickets::RevertTicketPayload,
            handlers::tickets::CreateTimelineEntryPayload,
            handlers::tickets::TransitionResponse,
        )
    ),
    tags(
        (name = "Tickets", description = "Fluxo de garantias: abertura, esteira de status, cobrança e encerramento")
    )
)]
pub struct ApiDoc;
