// src/services/workflow_service.rs

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use crate::{
    common::{error::AppError, text},
    db::contracts::{
        AttachmentGate, EventLog, ResolutionUpdate, SupplierDirectory, SupplierFreeze,
        TicketStore, TransitionUpdate,
    },
    models::auth::{Actor, Role},
    models::events::{AttachmentCategory, AuditEntry, AuditKind, TimelineEntry, TimelineKind},
    models::ticket::{StageRecord, Ticket, TicketStatus},
    services::sla,
    services::transition::{self, AdvanceInput, DerivedChecks, TransitionChecklist},
};

// Dados do balcão para abrir o chamado.
#[derive(Debug, Clone)]
pub struct NewTicketInput {
    pub store_id: Uuid,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub customer_document: Option<String>,
    pub sale_number: Option<String>,
    pub part_description: String,
    pub defect_description: Option<String>,
}

// Edição direta dos campos descritivos (None = mantém o valor atual).
#[derive(Debug, Default, Clone)]
pub struct UpdateTicketInput {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_document: Option<String>,
    pub sale_number: Option<String>,
    pub part_description: Option<String>,
    pub defect_description: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub outbound_invoice: Option<String>,
    pub sent_to_supplier_at: Option<NaiveDate>,
}

// Registro manual na timeline (nota ou contato).
#[derive(Debug, Clone)]
pub struct NewTimelineEntry {
    pub kind: TimelineKind,
    pub message: String,
    pub next_action_at: Option<NaiveDate>,
    pub next_action_note: Option<String>,
}

// Orquestra as mutações do chamado: única porta de entrada para mudança
// de status. Carrega, valida, grava condicionado ao status lido e só
// então registra auditoria e timeline.
#[derive(Clone)]
pub struct WorkflowService {
    tickets: Arc<dyn TicketStore>,
    suppliers: Arc<dyn SupplierDirectory>,
    attachments: Arc<dyn AttachmentGate>,
    events: Arc<dyn EventLog>,
    timezone: Tz,
}

impl WorkflowService {
    pub fn new(
        tickets: Arc<dyn TicketStore>,
        suppliers: Arc<dyn SupplierDirectory>,
        attachments: Arc<dyn AttachmentGate>,
        events: Arc<dyn EventLog>,
        timezone: Tz,
    ) -> Self {
        Self { tickets, suppliers, attachments, events, timezone }
    }

    // Acesso de outro tenant é rejeitado como inexistente, nunca filtrado
    // em silêncio.
    async fn load_owned(&self, ticket_id: Uuid, tenant_id: Uuid) -> Result<Ticket, AppError> {
        let ticket = self
            .tickets
            .get(ticket_id)
            .await?
            .ok_or(AppError::TicketNotFound)?;

        if ticket.tenant_id != tenant_id {
            tracing::warn!(
                "Acesso negado: chamado {} pertence a outro tenant ({} != {})",
                ticket_id,
                ticket.tenant_id,
                tenant_id
            );
            return Err(AppError::TicketNotFound);
        }

        Ok(ticket)
    }

    async fn derived_checks(&self, ticket: &Ticket) -> Result<DerivedChecks, AppError> {
        // Só consulta o storage quando o gate da etapa atual precisa
        let canhoto_exists = if ticket.status == TicketStatus::EntregaLogistica {
            self.attachments
                .exists(ticket.id, AttachmentCategory::Canhoto)
                .await?
        } else {
            false
        };

        Ok(DerivedChecks { canhoto_exists })
    }

    /// Abre o chamado no RECEBIMENTO, com o primeiro registro de etapa e o
    /// registro automático na timeline.
    pub async fn create_ticket(
        &self,
        tenant_id: Uuid,
        actor: &Actor,
        input: NewTicketInput,
    ) -> Result<Ticket, AppError> {
        let now = Utc::now();

        let ticket = Ticket {
            id: Uuid::new_v4(),
            tenant_id,
            store_id: input.store_id,
            status: TicketStatus::Recebimento,
            search_tokens: text::build_search_tokens(
                &input.customer_name,
                input.customer_phone.as_deref(),
                input.customer_document.as_deref(),
                input.sale_number.as_deref(),
            ),
            customer_name: input.customer_name,
            customer_phone: input.customer_phone,
            customer_document: input.customer_document,
            sale_number: input.sale_number,
            part_description: input.part_description,
            defect_description: input.defect_description,
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
            created_at: now,
            updated_at: now,
            stage_history: vec![StageRecord {
                status: TicketStatus::Recebimento,
                completed_at: now,
                actor_id: actor.id,
                actor_name: actor.name.clone(),
            }],
        };

        self.tickets.insert(&ticket).await?;

        self.events
            .append_timeline(&TimelineEntry {
                id: Uuid::new_v4(),
                ticket_id: ticket.id,
                tenant_id,
                kind: TimelineKind::MudancaStatus,
                message: format!("Chamado aberto no {}", TicketStatus::Recebimento.as_str()),
                next_action_at: None,
                next_action_note: None,
                actor_id: actor.id,
                actor_name: actor.name.clone(),
                created_at: now,
            })
            .await?;

        Ok(ticket)
    }

    /// Avança o chamado exatamente uma etapa na cadeia. Retorna o novo
    /// status ou o erro tipado da validação.
    pub async fn advance(
        &self,
        ticket_id: Uuid,
        tenant_id: Uuid,
        actor: &Actor,
        input: AdvanceInput,
    ) -> Result<TicketStatus, AppError> {
        let ticket = self.load_owned(ticket_id, tenant_id).await?;
        let checks = self.derived_checks(&ticket).await?;
        let rule = transition::validate(&ticket, actor.role, &input, &checks)?;

        let now = Utc::now();
        let mut update = TransitionUpdate::to(rule.to);

        match rule.from {
            // Congela fornecedor e SLA; o prazo nasce aqui e não muda mais
            TicketStatus::Interno => {
                let supplier_id = input
                    .supplier_id
                    .or(ticket.supplier_id)
                    .ok_or(AppError::MissingRequirement { missing: "fornecedor" })?;

                let supplier = self
                    .suppliers
                    .get(supplier_id, tenant_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::Validation("Fornecedor não encontrado para esta loja.".into())
                    })?;

                update.freeze_supplier = Some(SupplierFreeze {
                    supplier_id,
                    supplier_name: supplier.name,
                    sla_days: supplier.sla_days,
                    delivered_at: now,
                    due_date: sla::compute_due_date(now, supplier.sla_days, self.timezone),
                });
            }
            TicketStatus::CobrancaAcompanhamento => {
                let response = input
                    .supplier_response
                    .clone()
                    .or_else(|| ticket.supplier_response.clone())
                    .ok_or(AppError::MissingRequirement { missing: "resposta_fornecedor" })?;
                update.supplier_response = Some(response);
            }
            TicketStatus::Resolucao => {
                let result = input
                    .resolution_result
                    .or(ticket.resolution_result)
                    .ok_or(AppError::MissingRequirement { missing: "resolucao" })?;
                update.resolution = Some(ResolutionUpdate {
                    result,
                    notes: input
                        .resolution_notes
                        .clone()
                        .or_else(|| ticket.resolution_notes.clone()),
                });
                update.closed_at = Some(now);
                update.is_closed = true;
            }
            _ => {}
        }

        let stage = StageRecord {
            status: rule.to,
            completed_at: now,
            actor_id: actor.id,
            actor_name: actor.name.clone(),
        };

        let committed = self
            .tickets
            .commit_transition(ticket.id, tenant_id, rule.from, &update, Some(&stage))
            .await?;

        if !committed {
            let current = self
                .tickets
                .get(ticket.id)
                .await?
                .map(|t| t.status)
                .unwrap_or(ticket.status);
            return Err(AppError::TransitionConflict { current });
        }

        self.record_status_change(
            &ticket,
            tenant_id,
            actor,
            AuditKind::StatusChange,
            rule.from,
            rule.to,
            None,
        )
        .await?;

        Ok(rule.to)
    }

    /// Retorno privilegiado a qualquer status estritamente anterior.
    /// Limpa os dados das etapas desfeitas; o histórico de etapas não é
    /// rebobinado — segue como log imutável do que já foi alcançado.
    pub async fn revert(
        &self,
        ticket_id: Uuid,
        tenant_id: Uuid,
        actor: &Actor,
        target: TicketStatus,
        reason: &str,
    ) -> Result<TicketStatus, AppError> {
        if actor.role != Role::Admin {
            return Err(AppError::Forbidden(actor.role.as_str().to_string()));
        }

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation("O motivo do retorno é obrigatório.".into()));
        }

        let ticket = self.load_owned(ticket_id, tenant_id).await?;

        if !transition::precedes(target, ticket.status) {
            return Err(AppError::InvalidTransition(format!(
                "O status {} não antecede {} na esteira.",
                target.as_str(),
                ticket.status.as_str()
            )));
        }

        let mut update = TransitionUpdate::to(target);
        update.clear_closed = true;
        // Nenhum dado de etapa posterior ao alvo sobrevive ao retorno
        update.clear_resolution =
            !transition::precedes(TicketStatus::Resolucao, target);
        update.clear_supplier_response =
            !transition::precedes(TicketStatus::CobrancaAcompanhamento, target);
        update.clear_supplier_assignment =
            !transition::precedes(TicketStatus::Interno, target);

        let committed = self
            .tickets
            .commit_transition(ticket.id, tenant_id, ticket.status, &update, None)
            .await?;

        if !committed {
            let current = self
                .tickets
                .get(ticket.id)
                .await?
                .map(|t| t.status)
                .unwrap_or(ticket.status);
            return Err(AppError::TransitionConflict { current });
        }

        self.record_status_change(
            &ticket,
            tenant_id,
            actor,
            AuditKind::AdminRevert,
            ticket.status,
            target,
            Some(reason),
        )
        .await?;

        Ok(target)
    }

    #[allow(clippy::too_many_arguments)]
    async fn record_status_change(
        &self,
        ticket: &Ticket,
        tenant_id: Uuid,
        actor: &Actor,
        kind: AuditKind,
        from: TicketStatus,
        to: TicketStatus,
        reason: Option<&str>,
    ) -> Result<(), AppError> {
        let now = Utc::now();

        self.events
            .append_audit(&AuditEntry {
                id: Uuid::new_v4(),
                ticket_id: ticket.id,
                tenant_id,
                kind,
                from_status: Some(from),
                to_status: Some(to),
                reason: reason.map(|r| r.to_string()),
                actor_id: actor.id,
                actor_name: actor.name.clone(),
                created_at: now,
            })
            .await?;

        let message = match reason {
            Some(reason) => format!(
                "Status retornado de {} para {} (motivo: {})",
                from.as_str(),
                to.as_str(),
                reason
            ),
            None => format!("Status alterado de {} para {}", from.as_str(), to.as_str()),
        };

        self.events
            .append_timeline(&TimelineEntry {
                id: Uuid::new_v4(),
                ticket_id: ticket.id,
                tenant_id,
                kind: TimelineKind::MudancaStatus,
                message,
                next_action_at: None,
                next_action_note: None,
                actor_id: actor.id,
                actor_name: actor.name.clone(),
                created_at: now,
            })
            .await?;

        Ok(())
    }

    /// Nota ou contato manual. Quando o registro traz próxima ação, ela
    /// sobrescreve a agenda do chamado.
    pub async fn register_entry(
        &self,
        ticket_id: Uuid,
        tenant_id: Uuid,
        actor: &Actor,
        input: NewTimelineEntry,
    ) -> Result<TimelineEntry, AppError> {
        if input.kind == TimelineKind::MudancaStatus {
            return Err(AppError::Validation(
                "Registros de mudança de status são gravados pelo próprio motor.".into(),
            ));
        }
        if input.message.trim().is_empty() {
            return Err(AppError::Validation("A mensagem do registro é obrigatória.".into()));
        }

        let ticket = self.load_owned(ticket_id, tenant_id).await?;

        let entry = TimelineEntry {
            id: Uuid::new_v4(),
            ticket_id: ticket.id,
            tenant_id,
            kind: input.kind,
            message: input.message,
            next_action_at: input.next_action_at,
            next_action_note: input.next_action_note,
            actor_id: actor.id,
            actor_name: actor.name.clone(),
            created_at: Utc::now(),
        };

        self.events.append_timeline(&entry).await?;

        if let Some(at) = entry.next_action_at {
            self.tickets
                .set_next_action(ticket.id, tenant_id, at, entry.next_action_note.as_deref())
                .await?;
        }

        Ok(entry)
    }

    /// Edição direta dos campos descritivos. Os tokens de busca são
    /// reconstruídos a cada edição para a busca não ficar defasada.
    pub async fn update_details(
        &self,
        ticket_id: Uuid,
        tenant_id: Uuid,
        input: UpdateTicketInput,
    ) -> Result<Ticket, AppError> {
        let mut ticket = self.load_owned(ticket_id, tenant_id).await?;

        if input.supplier_id.is_some()
            && transition::precedes(TicketStatus::Interno, ticket.status)
        {
            return Err(AppError::Validation(
                "Fornecedor não pode ser trocado após o envio; use o retorno de status.".into(),
            ));
        }

        if let Some(v) = input.customer_name {
            ticket.customer_name = v;
        }
        if let Some(v) = input.customer_phone {
            ticket.customer_phone = Some(v);
        }
        if let Some(v) = input.customer_document {
            ticket.customer_document = Some(v);
        }
        if let Some(v) = input.sale_number {
            ticket.sale_number = Some(v);
        }
        if let Some(v) = input.part_description {
            ticket.part_description = v;
        }
        if let Some(v) = input.defect_description {
            ticket.defect_description = Some(v);
        }
        if let Some(v) = input.supplier_id {
            ticket.supplier_id = Some(v);
        }
        if let Some(v) = input.outbound_invoice {
            ticket.outbound_invoice = Some(v);
        }
        if let Some(v) = input.sent_to_supplier_at {
            ticket.sent_to_supplier_at = Some(v);
        }

        ticket.search_tokens = text::build_search_tokens(
            &ticket.customer_name,
            ticket.customer_phone.as_deref(),
            ticket.customer_document.as_deref(),
            ticket.sale_number.as_deref(),
        );

        self.tickets.update_details(&ticket).await?;

        Ok(ticket)
    }

    pub async fn get_ticket(&self, ticket_id: Uuid, tenant_id: Uuid) -> Result<Ticket, AppError> {
        self.load_owned(ticket_id, tenant_id).await
    }

    /// Visão consultiva dos requisitos da próxima etapa.
    pub async fn checklist(
        &self,
        ticket_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<TransitionChecklist, AppError> {
        let ticket = self.load_owned(ticket_id, tenant_id).await?;
        let checks = self.derived_checks(&ticket).await?;
        Ok(transition::build_checklist(&ticket, &checks))
    }

    pub async fn list_timeline(
        &self,
        ticket_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Vec<TimelineEntry>, AppError> {
        let ticket = self.load_owned(ticket_id, tenant_id).await?;
        self.events.list_timeline(ticket.id).await
    }

    pub async fn list_audit(
        &self,
        ticket_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Vec<AuditEntry>, AppError> {
        let ticket = self.load_owned(ticket_id, tenant_id).await?;
        self.events.list_audit(ticket.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::{MemAttachmentGate, MemEventLog, MemSupplierDirectory, MemTicketStore};
    use crate::models::events::AttachmentCategory;
    use crate::models::ticket::{ResolutionResult, Supplier};
    use chrono::NaiveDate;

    struct Ambiente {
        service: WorkflowService,
        tickets: Arc<MemTicketStore>,
        suppliers: Arc<MemSupplierDirectory>,
        attachments: Arc<MemAttachmentGate>,
        events: Arc<MemEventLog>,
        tenant_id: Uuid,
    }

    fn ambiente() -> Ambiente {
        let tickets = Arc::new(MemTicketStore::default());
        let suppliers = Arc::new(MemSupplierDirectory::default());
        let attachments = Arc::new(MemAttachmentGate::default());
        let events = Arc::new(MemEventLog::default());

        let service = WorkflowService::new(
            tickets.clone(),
            suppliers.clone(),
            attachments.clone(),
            events.clone(),
            chrono_tz::UTC,
        );

        Ambiente {
            service,
            tickets,
            suppliers,
            attachments,
            events,
            tenant_id: Uuid::new_v4(),
        }
    }

    fn actor(role: Role) -> Actor {
        Actor { id: Uuid::new_v4(), name: "Operador Teste".into(), role }
    }

    fn novo_chamado() -> NewTicketInput {
        NewTicketInput {
            store_id: Uuid::new_v4(),
            customer_name: "Joana Prado".into(),
            customer_phone: Some("(11) 91234-5678".into()),
            customer_document: None,
            sale_number: Some("VD-100".into()),
            part_description: "Motor do portão".into(),
            defect_description: Some("Não liga".into()),
        }
    }

    async fn abre_chamado(env: &Ambiente) -> Ticket {
        env.service
            .create_ticket(env.tenant_id, &actor(Role::Loja), novo_chamado())
            .await
            .unwrap()
    }

    fn canhoto(ticket: &Ticket) -> crate::models::events::Attachment {
        crate::models::events::Attachment {
            id: Uuid::new_v4(),
            ticket_id: ticket.id,
            tenant_id: ticket.tenant_id,
            category: AttachmentCategory::Canhoto,
            file_id: "canhoto.pdf".into(),
            file_name: None,
            created_at: Utc::now(),
        }
    }

    // Leva um chamado recém-criado até o status pedido, cumprindo os gates.
    async fn avanca_ate(env: &Ambiente, ticket: &Ticket, alvo: TicketStatus) -> TicketStatus {
        let fornecedor = Supplier {
            id: Uuid::new_v4(),
            tenant_id: env.tenant_id,
            name: "Eletropeças".into(),
            sla_days: 10,
        };
        env.suppliers.add(fornecedor.clone());

        let mut status = TicketStatus::Recebimento;
        while status != alvo {
            match status {
                TicketStatus::Recebimento => {
                    status = env
                        .service
                        .advance(ticket.id, env.tenant_id, &actor(Role::Loja), AdvanceInput::default())
                        .await
                        .unwrap();
                }
                TicketStatus::Interno => {
                    env.service
                        .update_details(
                            ticket.id,
                            env.tenant_id,
                            UpdateTicketInput {
                                outbound_invoice: Some("NF-55".into()),
                                sent_to_supplier_at: NaiveDate::from_ymd_opt(2025, 5, 2),
                                ..Default::default()
                            },
                        )
                        .await
                        .unwrap();
                    let input = AdvanceInput { supplier_id: Some(fornecedor.id), ..Default::default() };
                    status = env
                        .service
                        .advance(ticket.id, env.tenant_id, &actor(Role::Interno), input)
                        .await
                        .unwrap();
                }
                TicketStatus::EntregaLogistica => {
                    env.attachments.add(canhoto(ticket));
                    status = env
                        .service
                        .advance(ticket.id, env.tenant_id, &actor(Role::Logistica), AdvanceInput::default())
                        .await
                        .unwrap();
                }
                TicketStatus::CobrancaAcompanhamento => {
                    let input = AdvanceInput {
                        supplier_response: Some("Troca autorizada".into()),
                        ..Default::default()
                    };
                    status = env
                        .service
                        .advance(ticket.id, env.tenant_id, &actor(Role::Cobranca), input)
                        .await
                        .unwrap();
                }
                TicketStatus::Resolucao => {
                    let input = AdvanceInput {
                        resolution_result: Some(ResolutionResult::Troca),
                        ..Default::default()
                    };
                    status = env
                        .service
                        .advance(ticket.id, env.tenant_id, &actor(Role::Cobranca), input)
                        .await
                        .unwrap();
                }
                TicketStatus::Encerrado => break,
            }
        }
        status
    }

    #[tokio::test]
    async fn criacao_abre_no_recebimento_com_historico_e_timeline() {
        let env = ambiente();
        let ticket = abre_chamado(&env).await;

        assert_eq!(ticket.status, TicketStatus::Recebimento);
        assert_eq!(ticket.stage_history.len(), 1);
        assert_eq!(ticket.stage_history[0].status, TicketStatus::Recebimento);
        assert!(ticket.search_tokens.contains(&"joana".to_string()));
        assert!(ticket.search_tokens.contains(&"11912345678".to_string()));

        let timeline = env.events.timeline_snapshot();
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline[0].kind, TimelineKind::MudancaStatus);
    }

    #[tokio::test]
    async fn avanco_de_interno_congela_fornecedor_e_calcula_prazo() {
        let env = ambiente();
        let ticket = abre_chamado(&env).await;

        let status = avanca_ate(&env, &ticket, TicketStatus::EntregaLogistica).await;
        assert_eq!(status, TicketStatus::EntregaLogistica);

        let atualizado = env.service.get_ticket(ticket.id, env.tenant_id).await.unwrap();
        assert_eq!(atualizado.sla_days, Some(10));
        assert_eq!(atualizado.supplier_name.as_deref(), Some("Eletropeças"));

        let entregue = atualizado.delivered_to_supplier_at.unwrap();
        let esperado = sla::compute_due_date(entregue, 10, chrono_tz::UTC);
        assert_eq!(atualizado.due_date, Some(esperado));

        // um registro por status alcançado: RECEBIMENTO, INTERNO, ENTREGA
        assert_eq!(atualizado.stage_history.len(), 3);
        assert_eq!(atualizado.stage_history[2].status, TicketStatus::EntregaLogistica);

        let audit = env.events.audit_snapshot();
        let ultima = audit.last().unwrap();
        assert_eq!(ultima.kind, AuditKind::StatusChange);
        assert_eq!(ultima.from_status, Some(TicketStatus::Interno));
        assert_eq!(ultima.to_status, Some(TicketStatus::EntregaLogistica));
    }

    #[tokio::test]
    async fn avanco_sem_canhoto_falha_e_nao_muda_o_status() {
        let env = ambiente();
        let ticket = abre_chamado(&env).await;
        avanca_ate(&env, &ticket, TicketStatus::EntregaLogistica).await;

        let err = env
            .service
            .advance(ticket.id, env.tenant_id, &actor(Role::Logistica), AdvanceInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MissingRequirement { missing: "canhoto" }));

        let atual = env.service.get_ticket(ticket.id, env.tenant_id).await.unwrap();
        assert_eq!(atual.status, TicketStatus::EntregaLogistica);
    }

    #[tokio::test]
    async fn encerrado_nao_avanca() {
        let env = ambiente();
        let ticket = abre_chamado(&env).await;
        avanca_ate(&env, &ticket, TicketStatus::Encerrado).await;

        let atual = env.service.get_ticket(ticket.id, env.tenant_id).await.unwrap();
        assert!(atual.is_closed);
        assert!(atual.closed_at.is_some());
        assert_eq!(atual.resolution_result, Some(ResolutionResult::Troca));

        let err = env
            .service
            .advance(ticket.id, env.tenant_id, &actor(Role::Admin), AdvanceInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn revert_limpa_dados_das_etapas_desfeitas() {
        let env = ambiente();
        let ticket = abre_chamado(&env).await;
        avanca_ate(&env, &ticket, TicketStatus::Resolucao).await;

        let status = env
            .service
            .revert(
                ticket.id,
                env.tenant_id,
                &actor(Role::Admin),
                TicketStatus::Interno,
                "fornecedor errado",
            )
            .await
            .unwrap();
        assert_eq!(status, TicketStatus::Interno);

        let atual = env.service.get_ticket(ticket.id, env.tenant_id).await.unwrap();
        assert_eq!(atual.resolution_result, None);
        assert_eq!(atual.supplier_response, None);
        // alvo anterior ao envio: fornecedor e prazo também caem
        assert_eq!(atual.supplier_id, None);
        assert_eq!(atual.due_date, None);
        assert!(!atual.is_closed);
        // o histórico não é rebobinado: um registro por status alcançado
        // (RECEBIMENTO, INTERNO, ENTREGA, COBRANCA, RESOLUCAO)
        assert_eq!(atual.stage_history.len(), 5);

        let audit = env.events.audit_snapshot();
        let ultima = audit.last().unwrap();
        assert_eq!(ultima.kind, AuditKind::AdminRevert);
        assert_eq!(ultima.reason.as_deref(), Some("fornecedor errado"));
        assert_eq!(ultima.from_status, Some(TicketStatus::Resolucao));
        assert_eq!(ultima.to_status, Some(TicketStatus::Interno));
    }

    #[tokio::test]
    async fn revert_exige_admin_motivo_e_alvo_anterior() {
        let env = ambiente();
        let ticket = abre_chamado(&env).await;
        avanca_ate(&env, &ticket, TicketStatus::Interno).await;

        let err = env
            .service
            .revert(ticket.id, env.tenant_id, &actor(Role::Cobranca), TicketStatus::Recebimento, "x")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = env
            .service
            .revert(ticket.id, env.tenant_id, &actor(Role::Admin), TicketStatus::Recebimento, "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = env
            .service
            .revert(ticket.id, env.tenant_id, &actor(Role::Admin), TicketStatus::Resolucao, "motivo")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn acesso_de_outro_tenant_e_rejeitado_como_inexistente() {
        let env = ambiente();
        let ticket = abre_chamado(&env).await;

        let err = env
            .service
            .advance(ticket.id, Uuid::new_v4(), &actor(Role::Admin), AdvanceInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TicketNotFound));
    }

    #[tokio::test]
    async fn transicao_concorrente_perde_no_commit_condicional() {
        let env = ambiente();
        let ticket = abre_chamado(&env).await;

        // outro escritor já moveu o chamado: o commit esperando RECEBIMENTO falha
        let update = TransitionUpdate::to(TicketStatus::Interno);
        assert!(env
            .tickets
            .commit_transition(ticket.id, env.tenant_id, TicketStatus::Recebimento, &update, None)
            .await
            .unwrap());

        let perdedor = env
            .tickets
            .commit_transition(ticket.id, env.tenant_id, TicketStatus::Recebimento, &update, None)
            .await
            .unwrap();
        assert!(!perdedor);
    }

    #[tokio::test]
    async fn nota_com_proxima_acao_atualiza_a_agenda_do_chamado() {
        let env = ambiente();
        let ticket = abre_chamado(&env).await;

        let amanha = NaiveDate::from_ymd_opt(2025, 8, 6).unwrap();
        let entry = env
            .service
            .register_entry(
                ticket.id,
                env.tenant_id,
                &actor(Role::Cobranca),
                NewTimelineEntry {
                    kind: TimelineKind::Telefone,
                    message: "Fornecedor pediu retorno amanhã".into(),
                    next_action_at: Some(amanha),
                    next_action_note: Some("Ligar de novo".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(entry.kind, TimelineKind::Telefone);

        let atual = env.service.get_ticket(ticket.id, env.tenant_id).await.unwrap();
        assert_eq!(atual.next_action_at, Some(amanha));
        assert_eq!(atual.next_action_note.as_deref(), Some("Ligar de novo"));
    }

    #[tokio::test]
    async fn edicao_reconstroi_os_tokens_de_busca() {
        let env = ambiente();
        let ticket = abre_chamado(&env).await;

        env.service
            .update_details(
                ticket.id,
                env.tenant_id,
                UpdateTicketInput {
                    customer_name: Some("Carlos Andrade".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let atual = env.service.get_ticket(ticket.id, env.tenant_id).await.unwrap();
        assert!(atual.search_tokens.contains(&"carlos".to_string()));
        assert!(!atual.search_tokens.contains(&"joana".to_string()));
    }
}
