// src/db/memory.rs

// Implementações em memória dos contratos, usadas pelos testes de
// serviço. Reproduzem a semântica dos repositórios Postgres, inclusive o
// commit condicional de transição.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::contracts::{AttachmentGate, EventLog, SupplierDirectory, TicketStore, TransitionUpdate},
    models::events::{Attachment, AttachmentCategory, AuditEntry, TimelineEntry},
    models::query::{NextActionCounts, TicketFilter, TicketPage},
    models::ticket::{StageRecord, Supplier, Ticket, TicketStatus},
    services::query_service,
};

#[derive(Default)]
pub struct MemTicketStore {
    tickets: Mutex<HashMap<Uuid, Ticket>>,
}

#[async_trait]
impl TicketStore for MemTicketStore {
    async fn get(&self, ticket_id: Uuid) -> Result<Option<Ticket>, AppError> {
        Ok(self.tickets.lock().unwrap().get(&ticket_id).cloned())
    }

    async fn insert(&self, ticket: &Ticket) -> Result<(), AppError> {
        self.tickets.lock().unwrap().insert(ticket.id, ticket.clone());
        Ok(())
    }

    async fn commit_transition(
        &self,
        ticket_id: Uuid,
        tenant_id: Uuid,
        expected: TicketStatus,
        update: &TransitionUpdate,
        stage: Option<&StageRecord>,
    ) -> Result<bool, AppError> {
        let mut tickets = self.tickets.lock().unwrap();

        let Some(ticket) = tickets.get_mut(&ticket_id) else {
            return Ok(false);
        };
        if ticket.tenant_id != tenant_id || ticket.status != expected {
            return Ok(false);
        }

        ticket.status = update.to_status;
        ticket.is_closed = update.is_closed;
        ticket.updated_at = Utc::now();

        if let Some(freeze) = &update.freeze_supplier {
            ticket.supplier_id = Some(freeze.supplier_id);
            ticket.supplier_name = Some(freeze.supplier_name.clone());
            ticket.sla_days = Some(freeze.sla_days);
            ticket.delivered_to_supplier_at = Some(freeze.delivered_at);
            ticket.due_date = Some(freeze.due_date);
        }
        if let Some(response) = &update.supplier_response {
            ticket.supplier_response = Some(response.clone());
        }
        if let Some(resolution) = &update.resolution {
            ticket.resolution_result = Some(resolution.result);
            ticket.resolution_notes = resolution.notes.clone();
        }
        if let Some(closed_at) = update.closed_at {
            ticket.closed_at = Some(closed_at);
        }

        if update.clear_supplier_assignment {
            ticket.supplier_id = None;
            ticket.supplier_name = None;
            ticket.sla_days = None;
            ticket.delivered_to_supplier_at = None;
            ticket.due_date = None;
        }
        if update.clear_supplier_response {
            ticket.supplier_response = None;
        }
        if update.clear_resolution {
            ticket.resolution_result = None;
            ticket.resolution_notes = None;
        }
        if update.clear_closed {
            ticket.closed_at = None;
        }

        if let Some(stage) = stage {
            ticket.stage_history.push(stage.clone());
        }

        Ok(true)
    }

    async fn update_details(&self, updated: &Ticket) -> Result<(), AppError> {
        let mut tickets = self.tickets.lock().unwrap();

        if let Some(ticket) = tickets.get_mut(&updated.id) {
            if ticket.tenant_id != updated.tenant_id {
                return Ok(());
            }
            ticket.customer_name = updated.customer_name.clone();
            ticket.customer_phone = updated.customer_phone.clone();
            ticket.customer_document = updated.customer_document.clone();
            ticket.sale_number = updated.sale_number.clone();
            ticket.part_description = updated.part_description.clone();
            ticket.defect_description = updated.defect_description.clone();
            ticket.supplier_id = updated.supplier_id;
            ticket.outbound_invoice = updated.outbound_invoice.clone();
            ticket.sent_to_supplier_at = updated.sent_to_supplier_at;
            ticket.search_tokens = updated.search_tokens.clone();
            ticket.updated_at = Utc::now();
        }

        Ok(())
    }

    async fn set_next_action(
        &self,
        ticket_id: Uuid,
        tenant_id: Uuid,
        at: NaiveDate,
        note: Option<&str>,
    ) -> Result<(), AppError> {
        let mut tickets = self.tickets.lock().unwrap();

        if let Some(ticket) = tickets.get_mut(&ticket_id) {
            if ticket.tenant_id == tenant_id {
                ticket.next_action_at = Some(at);
                ticket.next_action_note = note.map(|n| n.to_string());
                ticket.updated_at = Utc::now();
            }
        }

        Ok(())
    }

    async fn query(
        &self,
        tenant_id: Uuid,
        filter: &TicketFilter,
        today: NaiveDate,
        limit: i64,
        cursor: Option<Uuid>,
    ) -> Result<TicketPage, AppError> {
        let mut all = self.list_by_tenant(tenant_id).await?;
        all.retain(|t| query_service::matches_filter(t, filter, today));
        query_service::sort_for_listing(&mut all, filter.overdue_only);
        Ok(query_service::paginate(all, limit, cursor))
    }

    async fn list_by_tenant(&self, tenant_id: Uuid) -> Result<Vec<Ticket>, AppError> {
        Ok(self
            .tickets
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn count_next_actions(
        &self,
        tenant_id: Uuid,
        today: NaiveDate,
    ) -> Result<NextActionCounts, AppError> {
        let all = self.list_by_tenant(tenant_id).await?;
        Ok(query_service::count_buckets(&all, today))
    }
}

#[derive(Default)]
pub struct MemSupplierDirectory {
    suppliers: Mutex<Vec<Supplier>>,
}

impl MemSupplierDirectory {
    pub fn add(&self, supplier: Supplier) {
        self.suppliers.lock().unwrap().push(supplier);
    }
}

#[async_trait]
impl SupplierDirectory for MemSupplierDirectory {
    async fn get(&self, supplier_id: Uuid, tenant_id: Uuid) -> Result<Option<Supplier>, AppError> {
        Ok(self
            .suppliers
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == supplier_id && s.tenant_id == tenant_id)
            .cloned())
    }
}

#[derive(Default)]
pub struct MemAttachmentGate {
    attachments: Mutex<Vec<Attachment>>,
}

impl MemAttachmentGate {
    pub fn add(&self, attachment: Attachment) {
        self.attachments.lock().unwrap().push(attachment);
    }
}

#[async_trait]
impl AttachmentGate for MemAttachmentGate {
    async fn exists(
        &self,
        ticket_id: Uuid,
        category: AttachmentCategory,
    ) -> Result<bool, AppError> {
        Ok(self
            .attachments
            .lock()
            .unwrap()
            .iter()
            .any(|a| a.ticket_id == ticket_id && a.category == category))
    }

    async fn list_for_ticket(&self, ticket_id: Uuid) -> Result<Vec<Attachment>, AppError> {
        Ok(self
            .attachments
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.ticket_id == ticket_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MemEventLog {
    timeline: Mutex<Vec<TimelineEntry>>,
    audit: Mutex<Vec<AuditEntry>>,
}

impl MemEventLog {
    pub fn timeline_snapshot(&self) -> Vec<TimelineEntry> {
        self.timeline.lock().unwrap().clone()
    }

    pub fn audit_snapshot(&self) -> Vec<AuditEntry> {
        self.audit.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventLog for MemEventLog {
    async fn append_timeline(&self, entry: &TimelineEntry) -> Result<(), AppError> {
        self.timeline.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn append_audit(&self, entry: &AuditEntry) -> Result<(), AppError> {
        self.audit.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn list_timeline(&self, ticket_id: Uuid) -> Result<Vec<TimelineEntry>, AppError> {
        Ok(self
            .timeline
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.ticket_id == ticket_id)
            .cloned()
            .collect())
    }

    async fn list_audit(&self, ticket_id: Uuid) -> Result<Vec<AuditEntry>, AppError> {
        Ok(self
            .audit
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.ticket_id == ticket_id)
            .cloned()
            .collect())
    }
}
