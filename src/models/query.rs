// src/models/query.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::ticket::{Ticket, TicketStatus};

// Filtros opcionais da listagem. Todos combináveis; o escopo de tenant é
// obrigatório e vem do contexto, nunca do filtro.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub store_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    // Termo livre, comparado contra os tokens normalizados do chamado
    pub search: Option<String>,
    #[serde(default)]
    pub overdue_only: bool,
    #[serde(default)]
    pub action_today_only: bool,
}

// Página de resultados. `next_cursor` é o id do último item quando a sonda
// limit+1 encontrou mais uma linha.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketPage {
    pub items: Vec<Ticket>,
    pub next_cursor: Option<Uuid>,
}

// Classificação da próxima ação para os painéis de acompanhamento.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NextActionBucket {
    Overdue,
    Today,
    NextSevenDays,
    Scheduled,
    Unscheduled,
}

#[derive(Debug, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NextActionCounts {
    pub overdue: i64,
    pub today: i64,
    pub next_seven_days: i64,
}
