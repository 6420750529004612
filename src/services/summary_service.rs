// src/services/summary_service.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::contracts::{AttachmentGate, EventLog, TicketStore},
    models::events::{Attachment, TimelineEntry},
    models::ticket::TicketStatus,
};

// Quantos anexos aparecem por etapa no resumo.
const MAX_ATTACHMENTS_PER_STAGE: usize = 3;

// Visão reconstruída de uma etapa já alcançada.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StageSummary {
    pub status: TicketStatus,
    pub actor_name: String,
    pub completed_at: DateTime<Utc>,
    pub last_entry: Option<TimelineEntry>,
    pub attachments: Vec<Attachment>,
}

// Reconstrói, para cada etapa do histórico, quem respondeu, quando, o
// último registro de timeline e os anexos da janela da etapa.
//
// A atribuição por janela de tempo assume que timeline e anexos foram
// gravados com relógios coerentes com as transições; relógio adiantado de
// cliente pode atribuir um registro à etapa vizinha. É uma aproximação
// documentada, não uma garantia.
#[derive(Clone)]
pub struct StageSummaryService {
    tickets: Arc<dyn TicketStore>,
    attachments: Arc<dyn AttachmentGate>,
    events: Arc<dyn EventLog>,
}

impl StageSummaryService {
    pub fn new(
        tickets: Arc<dyn TicketStore>,
        attachments: Arc<dyn AttachmentGate>,
        events: Arc<dyn EventLog>,
    ) -> Self {
        Self { tickets, attachments, events }
    }

    pub async fn stage_summaries(
        &self,
        ticket_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Vec<StageSummary>, AppError> {
        let ticket = self
            .tickets
            .get(ticket_id)
            .await?
            .ok_or(AppError::TicketNotFound)?;

        if ticket.tenant_id != tenant_id {
            return Err(AppError::TicketNotFound);
        }

        let mut history = ticket.stage_history.clone();
        history.sort_by_key(|record| record.completed_at);

        let mut timeline = self.events.list_timeline(ticket.id).await?;
        timeline.sort_by_key(|entry| entry.created_at);

        let mut attachments = self.attachments.list_for_ticket(ticket.id).await?;
        attachments.sort_by_key(|att| att.created_at);

        let mut summaries = Vec::with_capacity(history.len());

        for (i, record) in history.iter().enumerate() {
            // Janela da etapa: (fim da anterior, fim desta]
            let window_start = i.checked_sub(1).map(|prev| history[prev].completed_at);
            let window_end = record.completed_at;

            let last_entry = timeline
                .iter()
                .filter(|entry| entry.created_at <= window_end)
                .next_back()
                .cloned();

            let stage_attachments: Vec<Attachment> = attachments
                .iter()
                .filter(|att| {
                    let after_start = window_start.map(|start| att.created_at > start).unwrap_or(true);
                    after_start && att.created_at <= window_end
                })
                .take(MAX_ATTACHMENTS_PER_STAGE)
                .cloned()
                .collect();

            summaries.push(StageSummary {
                status: record.status,
                actor_name: record.actor_name.clone(),
                completed_at: record.completed_at,
                last_entry,
                attachments: stage_attachments,
            });
        }

        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::{MemAttachmentGate, MemEventLog, MemTicketStore};
    use crate::models::events::{AttachmentCategory, TimelineKind};
    use crate::models::ticket::{StageRecord, Ticket};
    use chrono::{Duration, Utc};

    fn base_ticket(tenant_id: Uuid) -> Ticket {
        let now = Utc::now();
        Ticket {
            id: Uuid::new_v4(),
            tenant_id,
            store_id: Uuid::new_v4(),
            status: TicketStatus::EntregaLogistica,
            customer_name: "Cliente".into(),
            customer_phone: None,
            customer_document: None,
            sale_number: None,
            part_description: "Peça".into(),
            defect_description: None,
            supplier_id: None,
            supplier_name: None,
            sla_days: None,
            outbound_invoice: None,
            sent_to_supplier_at: None,
            delivered_to_supplier_at: None,
            due_date: None,
            next_action_at: None,
            next_action_note: None,
            supplier_response: None,
            resolution_result: None,
            resolution_notes: None,
            closed_at: None,
            is_closed: false,
            search_tokens: vec![],
            created_at: now,
            updated_at: now,
            stage_history: vec![],
        }
    }

    fn stage(status: TicketStatus, at: DateTime<Utc>, actor: &str) -> StageRecord {
        StageRecord {
            status,
            completed_at: at,
            actor_id: Uuid::new_v4(),
            actor_name: actor.to_string(),
        }
    }

    fn entry(ticket: &Ticket, message: &str, at: DateTime<Utc>) -> TimelineEntry {
        TimelineEntry {
            id: Uuid::new_v4(),
            ticket_id: ticket.id,
            tenant_id: ticket.tenant_id,
            kind: TimelineKind::Nota,
            message: message.to_string(),
            next_action_at: None,
            next_action_note: None,
            actor_id: Uuid::new_v4(),
            actor_name: "Operador".into(),
            created_at: at,
        }
    }

    fn attachment(ticket: &Ticket, at: DateTime<Utc>) -> Attachment {
        Attachment {
            id: Uuid::new_v4(),
            ticket_id: ticket.id,
            tenant_id: ticket.tenant_id,
            category: AttachmentCategory::Foto,
            file_id: "arquivo".into(),
            file_name: None,
            created_at: at,
        }
    }

    #[tokio::test]
    async fn registros_e_anexos_caem_na_janela_da_etapa() {
        let tenant = Uuid::new_v4();
        let tickets = Arc::new(MemTicketStore::default());
        let gate = Arc::new(MemAttachmentGate::default());
        let events = Arc::new(MemEventLog::default());

        let t0 = Utc::now() - Duration::hours(10);
        let t1 = t0 + Duration::hours(4);
        let t2 = t0 + Duration::hours(8);

        let mut ticket = base_ticket(tenant);
        ticket.stage_history = vec![
            stage(TicketStatus::Recebimento, t0, "Balcão"),
            stage(TicketStatus::Interno, t1, "Triagem"),
            stage(TicketStatus::EntregaLogistica, t2, "Logística"),
        ];
        tickets.insert(&ticket).await.unwrap();

        // nota dentro da janela do INTERNO e outra depois do fim dela
        events.append_timeline(&entry(&ticket, "conferida", t1 - Duration::hours(1))).await.unwrap();
        events.append_timeline(&entry(&ticket, "despachada", t2 - Duration::hours(1))).await.unwrap();

        // anexo dentro da janela do INTERNO, outro na janela da ENTREGA
        gate.add(attachment(&ticket, t1 - Duration::minutes(30)));
        gate.add(attachment(&ticket, t2 - Duration::minutes(30)));

        let service = StageSummaryService::new(tickets, gate, events);
        let summaries = service.stage_summaries(ticket.id, tenant).await.unwrap();

        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].status, TicketStatus::Recebimento);
        assert_eq!(summaries[0].actor_name, "Balcão");
        assert!(summaries[0].last_entry.is_none());
        assert!(summaries[0].attachments.is_empty());

        // janela do INTERNO: (t0, t1]
        assert_eq!(summaries[1].last_entry.as_ref().unwrap().message, "conferida");
        assert_eq!(summaries[1].attachments.len(), 1);

        // janela da ENTREGA: (t1, t2]; o último registro até t2 é o despacho
        assert_eq!(summaries[2].last_entry.as_ref().unwrap().message, "despachada");
        assert_eq!(summaries[2].attachments.len(), 1);
    }

    #[tokio::test]
    async fn anexos_por_etapa_sao_limitados_a_tres() {
        let tenant = Uuid::new_v4();
        let tickets = Arc::new(MemTicketStore::default());
        let gate = Arc::new(MemAttachmentGate::default());
        let events = Arc::new(MemEventLog::default());

        let t0 = Utc::now() - Duration::hours(2);
        let mut ticket = base_ticket(tenant);
        ticket.stage_history = vec![stage(TicketStatus::Recebimento, t0, "Balcão")];
        tickets.insert(&ticket).await.unwrap();

        for i in 0..5 {
            gate.add(attachment(&ticket, t0 - Duration::minutes(i)));
        }

        let service = StageSummaryService::new(tickets, gate, events);
        let summaries = service.stage_summaries(ticket.id, tenant).await.unwrap();
        assert_eq!(summaries[0].attachments.len(), 3);
    }

    #[tokio::test]
    async fn resumo_de_outro_tenant_e_rejeitado() {
        let tickets = Arc::new(MemTicketStore::default());
        let gate = Arc::new(MemAttachmentGate::default());
        let events = Arc::new(MemEventLog::default());

        let ticket = base_ticket(Uuid::new_v4());
        tickets.insert(&ticket).await.unwrap();

        let service = StageSummaryService::new(tickets, gate, events);
        let err = service.stage_summaries(ticket.id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::TicketNotFound));
    }
}
