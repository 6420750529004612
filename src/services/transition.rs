// src/services/transition.rs

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::auth::Role,
    models::ticket::{ResolutionResult, Ticket, TicketStatus},
};

// A esteira é uma cadeia fixa, não um grafo: cada status tem no máximo um
// sucessor. Uma única tabela declarativa concentra sucessor, perfis
// autorizados e gate de saída; o validador e o checklist iteram as mesmas
// linhas e por construção não divergem.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    None,
    // Saída de INTERNO: fornecedor definido + NF de saída + data de envio
    EnvioFornecedor,
    // Saída de ENTREGA_LOGISTICA: canhoto anexado
    Canhoto,
    // Saída de COBRANCA_ACOMPANHAMENTO: resposta do fornecedor registrada
    RespostaFornecedor,
    // Saída de RESOLUCAO: desfecho escolhido
    Resolucao,
}

#[derive(Debug)]
pub struct TransitionRule {
    pub from: TicketStatus,
    pub to: TicketStatus,
    pub allowed_roles: &'static [Role],
    pub gate: Gate,
}

pub const TRANSITIONS: &[TransitionRule] = &[
    TransitionRule {
        from: TicketStatus::Recebimento,
        to: TicketStatus::Interno,
        allowed_roles: &[Role::Loja, Role::Admin],
        gate: Gate::None,
    },
    TransitionRule {
        from: TicketStatus::Interno,
        to: TicketStatus::EntregaLogistica,
        allowed_roles: &[Role::Interno, Role::Admin],
        gate: Gate::EnvioFornecedor,
    },
    TransitionRule {
        from: TicketStatus::EntregaLogistica,
        to: TicketStatus::CobrancaAcompanhamento,
        allowed_roles: &[Role::Logistica, Role::Admin],
        gate: Gate::Canhoto,
    },
    TransitionRule {
        from: TicketStatus::CobrancaAcompanhamento,
        to: TicketStatus::Resolucao,
        allowed_roles: &[Role::Cobranca, Role::Admin],
        gate: Gate::RespostaFornecedor,
    },
    TransitionRule {
        from: TicketStatus::Resolucao,
        to: TicketStatus::Encerrado,
        allowed_roles: &[Role::Cobranca, Role::Admin],
        gate: Gate::Resolucao,
    },
];

/// Linha da tabela cujo `from` é o status dado; ENCERRADO não tem linha.
pub fn rule_for(status: TicketStatus) -> Option<&'static TransitionRule> {
    TRANSITIONS.iter().find(|rule| rule.from == status)
}

/// Posição do status na cadeia, derivada da própria tabela.
pub fn chain_index(status: TicketStatus) -> usize {
    TRANSITIONS
        .iter()
        .position(|rule| rule.from == status)
        .unwrap_or(TRANSITIONS.len())
}

/// `a` vem estritamente antes de `b` na cadeia?
pub fn precedes(a: TicketStatus, b: TicketStatus) -> bool {
    chain_index(a) < chain_index(b)
}

// Campos que o operador pode mandar junto com o avanço. O validador aceita
// o valor da requisição ou o já gravado no chamado.
#[derive(Debug, Default, Clone)]
pub struct AdvanceInput {
    pub supplier_id: Option<Uuid>,
    pub supplier_response: Option<String>,
    pub resolution_result: Option<ResolutionResult>,
    pub resolution_notes: Option<String>,
}

// Verificações que exigem I/O, resolvidas pelo chamador antes de validar.
// Mantê-las fora daqui preserva o validador puro.
#[derive(Debug, Default, Clone, Copy)]
pub struct DerivedChecks {
    pub canhoto_exists: bool,
}

/// Decide se a transição a partir do status atual é legal. Puro e sem
/// efeito colateral: reutilizado pelo WorkflowService (que revalida na
/// execução) e pelo checklist (que só exibe).
pub fn validate(
    ticket: &Ticket,
    role: Role,
    input: &AdvanceInput,
    checks: &DerivedChecks,
) -> Result<&'static TransitionRule, AppError> {
    let rule = rule_for(ticket.status).ok_or_else(|| {
        AppError::InvalidTransition(format!(
            "O status {} é terminal e não possui próxima etapa.",
            ticket.status.as_str()
        ))
    })?;

    if !rule.allowed_roles.contains(&role) {
        return Err(AppError::Forbidden(role.as_str().to_string()));
    }

    if let Some(missing) = first_missing(rule.gate, ticket, input, checks) {
        return Err(AppError::MissingRequirement { missing });
    }

    Ok(rule)
}

// Primeiro requisito não atendido do gate, na ordem em que o operador
// deve resolvê-los.
fn first_missing(
    gate: Gate,
    ticket: &Ticket,
    input: &AdvanceInput,
    checks: &DerivedChecks,
) -> Option<&'static str> {
    requirements(gate, ticket, input, checks)
        .into_iter()
        .find(|(_, _, satisfied, _)| !satisfied)
        .map(|(key, _, _, _)| key)
}

// (chave, rótulo, satisfeito, ação sugerida) de cada requisito do gate.
fn requirements(
    gate: Gate,
    ticket: &Ticket,
    input: &AdvanceInput,
    checks: &DerivedChecks,
) -> Vec<(&'static str, &'static str, bool, &'static str)> {
    match gate {
        Gate::None => vec![],
        Gate::EnvioFornecedor => vec![
            (
                "fornecedor",
                "Fornecedor definido",
                input.supplier_id.or(ticket.supplier_id).is_some(),
                "Selecione o fornecedor responsável pela peça",
            ),
            (
                "nota_fiscal_saida",
                "Nota fiscal de saída",
                non_empty(ticket.outbound_invoice.as_deref()),
                "Informe o número da NF de envio ao fornecedor",
            ),
            (
                "data_envio",
                "Data de envio ao fornecedor",
                ticket.sent_to_supplier_at.is_some(),
                "Registre a data em que a peça foi despachada",
            ),
        ],
        Gate::Canhoto => vec![(
            "canhoto",
            "Canhoto de entrega anexado",
            checks.canhoto_exists,
            "Anexe o canhoto assinado pelo fornecedor",
        )],
        Gate::RespostaFornecedor => vec![(
            "resposta_fornecedor",
            "Resposta do fornecedor",
            non_empty(input.supplier_response.as_deref())
                || non_empty(ticket.supplier_response.as_deref()),
            "Registre a resposta do fornecedor sobre a garantia",
        )],
        Gate::Resolucao => vec![(
            "resolucao",
            "Desfecho definido",
            input.resolution_result.or(ticket.resolution_result).is_some(),
            "Escolha o desfecho: crédito, troca ou negado",
        )],
    }
}

fn non_empty(value: Option<&str>) -> bool {
    value.map(|v| !v.trim().is_empty()).unwrap_or(false)
}

// --- Checklist (visão consultiva para a UI) ---

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub key: &'static str,
    pub label: &'static str,
    pub satisfied: bool,
    pub suggested_action: Option<&'static str>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionChecklist {
    pub current_status: TicketStatus,
    pub next_status: Option<TicketStatus>,
    pub can_advance: bool,
    pub items: Vec<ChecklistItem>,
}

/// Lista o que falta para a próxima etapa, a partir do mesmo snapshot e
/// das mesmas regras do validador. Consultivo: a execução revalida.
pub fn build_checklist(ticket: &Ticket, checks: &DerivedChecks) -> TransitionChecklist {
    let Some(rule) = rule_for(ticket.status) else {
        return TransitionChecklist {
            current_status: ticket.status,
            next_status: None,
            can_advance: false,
            items: vec![],
        };
    };

    let input = AdvanceInput::default();
    let items = requirements(rule.gate, ticket, &input, checks)
        .into_iter()
        .map(|(key, label, satisfied, action)| ChecklistItem {
            key,
            label,
            satisfied,
            suggested_action: if satisfied { None } else { Some(action) },
        })
        .collect();

    // O checklist descreve requisitos da etapa, não permissões do ator:
    // validamos com um perfil autorizado da própria linha.
    let can_advance = validate(ticket, rule.allowed_roles[0], &input, checks).is_ok();

    TransitionChecklist {
        current_status: ticket.status,
        next_status: Some(rule.to),
        can_advance,
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn ticket_base(status: TicketStatus) -> Ticket {
        Ticket {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            store_id: Uuid::new_v4(),
            status,
            customer_name: "Cliente Teste".into(),
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
            created_at: Utc::now(),
            updated_at: Utc::now(),
            stage_history: vec![],
        }
    }

    #[test]
    fn tabela_forma_uma_cadeia_sem_bifurcacao() {
        for (i, rule) in TRANSITIONS.iter().enumerate() {
            // cada from aparece uma única vez
            assert_eq!(
                TRANSITIONS.iter().filter(|r| r.from == rule.from).count(),
                1
            );
            // o to de uma linha é o from da seguinte
            if let Some(next) = TRANSITIONS.get(i + 1) {
                assert_eq!(rule.to, next.from);
            }
        }
        assert!(rule_for(TicketStatus::Encerrado).is_none());
    }

    #[test]
    fn ordem_da_cadeia_vem_da_tabela() {
        assert!(precedes(TicketStatus::Recebimento, TicketStatus::Interno));
        assert!(precedes(TicketStatus::Interno, TicketStatus::Encerrado));
        assert!(!precedes(TicketStatus::Encerrado, TicketStatus::Resolucao));
        assert!(!precedes(TicketStatus::Interno, TicketStatus::Interno));
    }

    #[test]
    fn perfil_errado_e_rejeitado() {
        let ticket = ticket_base(TicketStatus::Recebimento);
        let err = validate(&ticket, Role::Cobranca, &AdvanceInput::default(), &DerivedChecks::default())
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        // admin pode tudo
        assert!(validate(&ticket, Role::Admin, &AdvanceInput::default(), &DerivedChecks::default()).is_ok());
    }

    #[test]
    fn status_terminal_nao_avanca() {
        let ticket = ticket_base(TicketStatus::Encerrado);
        let err = validate(&ticket, Role::Admin, &AdvanceInput::default(), &DerivedChecks::default())
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    #[test]
    fn saida_de_interno_exige_fornecedor_nf_e_data() {
        let mut ticket = ticket_base(TicketStatus::Interno);

        let err = validate(&ticket, Role::Interno, &AdvanceInput::default(), &DerivedChecks::default())
            .unwrap_err();
        assert!(matches!(err, AppError::MissingRequirement { missing: "fornecedor" }));

        // fornecedor pode vir na requisição
        let input = AdvanceInput { supplier_id: Some(Uuid::new_v4()), ..Default::default() };
        let err = validate(&ticket, Role::Interno, &input, &DerivedChecks::default()).unwrap_err();
        assert!(matches!(err, AppError::MissingRequirement { missing: "nota_fiscal_saida" }));

        ticket.outbound_invoice = Some("NF-1".into());
        let err = validate(&ticket, Role::Interno, &input, &DerivedChecks::default()).unwrap_err();
        assert!(matches!(err, AppError::MissingRequirement { missing: "data_envio" }));

        ticket.sent_to_supplier_at = NaiveDate::from_ymd_opt(2025, 5, 2);
        assert!(validate(&ticket, Role::Interno, &input, &DerivedChecks::default()).is_ok());
    }

    #[test]
    fn saida_de_entrega_exige_canhoto() {
        let ticket = ticket_base(TicketStatus::EntregaLogistica);

        let err = validate(&ticket, Role::Logistica, &AdvanceInput::default(), &DerivedChecks::default())
            .unwrap_err();
        assert!(matches!(err, AppError::MissingRequirement { missing: "canhoto" }));

        let checks = DerivedChecks { canhoto_exists: true };
        assert!(validate(&ticket, Role::Logistica, &AdvanceInput::default(), &checks).is_ok());
    }

    #[test]
    fn resposta_em_branco_nao_satisfaz_a_cobranca() {
        let mut ticket = ticket_base(TicketStatus::CobrancaAcompanhamento);
        ticket.supplier_response = Some("   ".into());

        let err = validate(&ticket, Role::Cobranca, &AdvanceInput::default(), &DerivedChecks::default())
            .unwrap_err();
        assert!(matches!(err, AppError::MissingRequirement { missing: "resposta_fornecedor" }));
    }

    #[test]
    fn checklist_e_validador_concordam() {
        // propriedade: can_advance == validate sem erro, para o mesmo snapshot
        let mut cenarios = vec![
            ticket_base(TicketStatus::Recebimento),
            ticket_base(TicketStatus::Interno),
            ticket_base(TicketStatus::EntregaLogistica),
            ticket_base(TicketStatus::Encerrado),
        ];
        let mut pronto = ticket_base(TicketStatus::Interno);
        pronto.supplier_id = Some(Uuid::new_v4());
        pronto.outbound_invoice = Some("NF-9".into());
        pronto.sent_to_supplier_at = NaiveDate::from_ymd_opt(2025, 1, 1);
        cenarios.push(pronto);

        for ticket in &cenarios {
            let checks = DerivedChecks::default();
            let checklist = build_checklist(ticket, &checks);
            let valido = rule_for(ticket.status)
                .map(|rule| validate(ticket, rule.allowed_roles[0], &AdvanceInput::default(), &checks).is_ok())
                .unwrap_or(false);
            assert_eq!(checklist.can_advance, valido);
        }
    }

    #[test]
    fn checklist_marca_itens_pendentes_com_acao_sugerida() {
        let mut ticket = ticket_base(TicketStatus::Interno);
        ticket.outbound_invoice = Some("NF-7".into());

        let checklist = build_checklist(&ticket, &DerivedChecks::default());
        assert_eq!(checklist.next_status, Some(TicketStatus::EntregaLogistica));
        assert!(!checklist.can_advance);
        assert_eq!(checklist.items.len(), 3);

        let nf = checklist.items.iter().find(|i| i.key == "nota_fiscal_saida").unwrap();
        assert!(nf.satisfied);
        assert!(nf.suggested_action.is_none());

        let fornecedor = checklist.items.iter().find(|i| i.key == "fornecedor").unwrap();
        assert!(!fornecedor.satisfied);
        assert!(fornecedor.suggested_action.is_some());
    }
}
