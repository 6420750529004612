// src/services/query_service.rs

use std::sync::Arc;

use chrono::NaiveDate;
use chrono_tz::Tz;
use uuid::Uuid;

use crate::{
    common::{dates, error::AppError, text},
    db::contracts::TicketStore,
    models::query::{NextActionBucket, NextActionCounts, TicketFilter, TicketPage},
    models::ticket::Ticket,
    services::sla,
};

const MAX_PAGE_SIZE: i64 = 100;

// Estratégia escolhida na configuração, nunca deduzida de erro do
// provedor: Indexed empurra os filtros para o banco; Scan busca o
// conjunto do tenant e filtra em memória com semântica idêntica, ao
// custo de latência.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStrategy {
    Indexed,
    Scan,
}

#[derive(Clone)]
pub struct TicketQueryService {
    tickets: Arc<dyn TicketStore>,
    strategy: QueryStrategy,
    timezone: Tz,
}

impl TicketQueryService {
    pub fn new(tickets: Arc<dyn TicketStore>, strategy: QueryStrategy, timezone: Tz) -> Self {
        Self { tickets, strategy, timezone }
    }

    /// Listagem paginada do tenant com filtros combináveis.
    pub async fn list(
        &self,
        tenant_id: Uuid,
        filter: &TicketFilter,
        limit: i64,
        cursor: Option<Uuid>,
    ) -> Result<TicketPage, AppError> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let today = dates::today_in(self.timezone);

        match self.strategy {
            QueryStrategy::Indexed => {
                self.tickets.query(tenant_id, filter, today, limit, cursor).await
            }
            QueryStrategy::Scan => {
                let mut all = self.tickets.list_by_tenant(tenant_id).await?;
                all.retain(|t| matches_filter(t, filter, today));
                sort_for_listing(&mut all, filter.overdue_only);
                Ok(paginate(all, limit, cursor))
            }
        }
    }

    /// Contadores de próxima ação para o painel de acompanhamento.
    pub async fn next_action_counts(&self, tenant_id: Uuid) -> Result<NextActionCounts, AppError> {
        let today = dates::today_in(self.timezone);

        match self.strategy {
            QueryStrategy::Indexed => self.tickets.count_next_actions(tenant_id, today).await,
            QueryStrategy::Scan => {
                let all = self.tickets.list_by_tenant(tenant_id).await?;
                Ok(count_buckets(&all, today))
            }
        }
    }
}

// --- Semântica compartilhada pelos dois caminhos ---
// O caminho Scan e as lojas em memória dos testes usam estas funções;
// o SQL do caminho Indexed espelha cada predicado.

pub(crate) fn matches_filter(ticket: &Ticket, filter: &TicketFilter, today: NaiveDate) -> bool {
    if let Some(status) = filter.status {
        if ticket.status != status {
            return false;
        }
    }
    if let Some(store_id) = filter.store_id {
        if ticket.store_id != store_id {
            return false;
        }
    }
    if let Some(supplier_id) = filter.supplier_id {
        if ticket.supplier_id != Some(supplier_id) {
            return false;
        }
    }
    if let Some(search) = filter.search.as_deref() {
        let candidates = text::search_candidates(search);
        if !ticket.search_tokens.iter().any(|t| candidates.contains(t)) {
            return false;
        }
    }
    if filter.overdue_only {
        let overdue = !ticket.is_closed
            && ticket.due_date.map(|due| sla::is_overdue(due, today)).unwrap_or(false);
        if !overdue {
            return false;
        }
    }
    if filter.action_today_only && ticket.next_action_at != Some(today) {
        return false;
    }

    true
}

// O recorte de atrasados sai em ordem crescente de vencimento; o restante
// em ordem de criação, mais novos primeiro. O id desempata para a
// paginação ser estável.
pub(crate) fn sort_for_listing(tickets: &mut [Ticket], overdue_only: bool) {
    if overdue_only {
        tickets.sort_by(|a, b| a.due_date.cmp(&b.due_date).then(a.id.cmp(&b.id)));
    } else {
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
    }
}

// Sonda limit+1: se sobrar linha além do limite, o id do último item da
// página vira o cursor da próxima.
pub(crate) fn paginate(tickets: Vec<Ticket>, limit: i64, cursor: Option<Uuid>) -> TicketPage {
    let start = match cursor {
        Some(cursor_id) => tickets
            .iter()
            .position(|t| t.id == cursor_id)
            .map(|pos| pos + 1)
            .unwrap_or(0),
        None => 0,
    };

    let mut items: Vec<Ticket> = tickets.into_iter().skip(start).take(limit as usize + 1).collect();

    let next_cursor = if items.len() as i64 > limit {
        items.truncate(limit as usize);
        items.last().map(|t| t.id)
    } else {
        None
    };

    TicketPage { items, next_cursor }
}

/// Classifica a próxima ação de um chamado em relação a hoje.
pub fn bucket_for(next_action: Option<NaiveDate>, today: NaiveDate) -> NextActionBucket {
    match next_action {
        None => NextActionBucket::Unscheduled,
        Some(d) if d < today => NextActionBucket::Overdue,
        Some(d) if d == today => NextActionBucket::Today,
        Some(d) if d <= dates::add_days(today, 7) => NextActionBucket::NextSevenDays,
        Some(_) => NextActionBucket::Scheduled,
    }
}

pub(crate) fn count_buckets(tickets: &[Ticket], today: NaiveDate) -> NextActionCounts {
    let mut counts = NextActionCounts::default();

    for ticket in tickets.iter().filter(|t| !t.is_closed) {
        match bucket_for(ticket.next_action_at, today) {
            NextActionBucket::Overdue => counts.overdue += 1,
            NextActionBucket::Today => counts.today += 1,
            NextActionBucket::NextSevenDays => counts.next_seven_days += 1,
            _ => {}
        }
    }

    counts
}
