// src/db/ticket_repo.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{error::AppError, text},
    db::contracts::{TicketStore, TransitionUpdate},
    models::query::{NextActionCounts, TicketFilter, TicketPage},
    models::ticket::{StageRecord, Ticket, TicketStatus},
};

#[derive(Clone)]
pub struct TicketRepository {
    pool: PgPool,
}

impl TicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_history(&self, ticket_id: Uuid) -> Result<Vec<StageRecord>, AppError> {
        let history = sqlx::query_as::<_, StageRecord>(
            r#"
            SELECT status, completed_at, actor_id, actor_name
            FROM ticket_stage_history
            WHERE ticket_id = $1
            ORDER BY completed_at ASC, seq ASC
            "#,
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(history)
    }
}

#[async_trait]
impl TicketStore for TicketRepository {
    async fn get(&self, ticket_id: Uuid) -> Result<Option<Ticket>, AppError> {
        let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1")
            .bind(ticket_id)
            .fetch_optional(&self.pool)
            .await?;

        match ticket {
            Some(mut t) => {
                t.stage_history = self.load_history(t.id).await?;
                Ok(Some(t))
            }
            None => Ok(None),
        }
    }

    async fn insert(&self, ticket: &Ticket) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO tickets (
                id, tenant_id, store_id, status,
                customer_name, customer_phone, customer_document, sale_number,
                part_description, defect_description,
                supplier_id, supplier_name, sla_days,
                outbound_invoice, sent_to_supplier_at, delivered_to_supplier_at, due_date,
                next_action_at, next_action_note, supplier_response,
                resolution_result, resolution_notes, closed_at, is_closed,
                search_tokens, created_at, updated_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27
            )
            "#,
        )
        .bind(ticket.id)
        .bind(ticket.tenant_id)
        .bind(ticket.store_id)
        .bind(ticket.status)
        .bind(&ticket.customer_name)
        .bind(&ticket.customer_phone)
        .bind(&ticket.customer_document)
        .bind(&ticket.sale_number)
        .bind(&ticket.part_description)
        .bind(&ticket.defect_description)
        .bind(ticket.supplier_id)
        .bind(&ticket.supplier_name)
        .bind(ticket.sla_days)
        .bind(&ticket.outbound_invoice)
        .bind(ticket.sent_to_supplier_at)
        .bind(ticket.delivered_to_supplier_at)
        .bind(ticket.due_date)
        .bind(ticket.next_action_at)
        .bind(&ticket.next_action_note)
        .bind(&ticket.supplier_response)
        .bind(ticket.resolution_result)
        .bind(&ticket.resolution_notes)
        .bind(ticket.closed_at)
        .bind(ticket.is_closed)
        .bind(&ticket.search_tokens)
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .execute(&mut *tx)
        .await?;

        for stage in &ticket.stage_history {
            sqlx::query(
                r#"
                INSERT INTO ticket_stage_history (ticket_id, tenant_id, status, completed_at, actor_id, actor_name)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(ticket.id)
            .bind(ticket.tenant_id)
            .bind(stage.status)
            .bind(stage.completed_at)
            .bind(stage.actor_id)
            .bind(&stage.actor_name)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
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
        let mut tx = self.pool.begin().await?;

        // UPDATE único, condicionado ao status que o chamador leu. Zero
        // linhas afetadas significa que outro operador transicionou antes.
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE tickets SET updated_at = now()");

        qb.push(", status = ").push_bind(update.to_status);
        qb.push(", is_closed = ").push_bind(update.is_closed);

        if let Some(freeze) = &update.freeze_supplier {
            qb.push(", supplier_id = ").push_bind(freeze.supplier_id);
            qb.push(", supplier_name = ").push_bind(freeze.supplier_name.clone());
            qb.push(", sla_days = ").push_bind(freeze.sla_days);
            qb.push(", delivered_to_supplier_at = ").push_bind(freeze.delivered_at);
            qb.push(", due_date = ").push_bind(freeze.due_date);
        }
        if let Some(response) = &update.supplier_response {
            qb.push(", supplier_response = ").push_bind(response.clone());
        }
        if let Some(resolution) = &update.resolution {
            qb.push(", resolution_result = ").push_bind(resolution.result);
            qb.push(", resolution_notes = ").push_bind(resolution.notes.clone());
        }
        if let Some(closed_at) = update.closed_at {
            qb.push(", closed_at = ").push_bind(closed_at);
        }

        if update.clear_supplier_assignment {
            qb.push(
                ", supplier_id = NULL, supplier_name = NULL, sla_days = NULL, \
                 delivered_to_supplier_at = NULL, due_date = NULL",
            );
        }
        if update.clear_supplier_response {
            qb.push(", supplier_response = NULL");
        }
        if update.clear_resolution {
            qb.push(", resolution_result = NULL, resolution_notes = NULL");
        }
        if update.clear_closed {
            qb.push(", closed_at = NULL");
        }

        qb.push(" WHERE id = ").push_bind(ticket_id);
        qb.push(" AND tenant_id = ").push_bind(tenant_id);
        qb.push(" AND status = ").push_bind(expected);

        let result = qb.build().execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        if let Some(stage) = stage {
            sqlx::query(
                r#"
                INSERT INTO ticket_stage_history (ticket_id, tenant_id, status, completed_at, actor_id, actor_name)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(ticket_id)
            .bind(tenant_id)
            .bind(stage.status)
            .bind(stage.completed_at)
            .bind(stage.actor_id)
            .bind(&stage.actor_name)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn update_details(&self, ticket: &Ticket) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE tickets SET
                customer_name = $1,
                customer_phone = $2,
                customer_document = $3,
                sale_number = $4,
                part_description = $5,
                defect_description = $6,
                supplier_id = $7,
                outbound_invoice = $8,
                sent_to_supplier_at = $9,
                search_tokens = $10,
                updated_at = now()
            WHERE id = $11 AND tenant_id = $12
            "#,
        )
        .bind(&ticket.customer_name)
        .bind(&ticket.customer_phone)
        .bind(&ticket.customer_document)
        .bind(&ticket.sale_number)
        .bind(&ticket.part_description)
        .bind(&ticket.defect_description)
        .bind(ticket.supplier_id)
        .bind(&ticket.outbound_invoice)
        .bind(ticket.sent_to_supplier_at)
        .bind(&ticket.search_tokens)
        .bind(ticket.id)
        .bind(ticket.tenant_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_next_action(
        &self,
        ticket_id: Uuid,
        tenant_id: Uuid,
        at: NaiveDate,
        note: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE tickets SET next_action_at = $1, next_action_note = $2, updated_at = now()
            WHERE id = $3 AND tenant_id = $4
            "#,
        )
        .bind(at)
        .bind(note)
        .bind(ticket_id)
        .bind(tenant_id)
        .execute(&self.pool)
        .await?;

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
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM tickets WHERE tenant_id = ");
        qb.push_bind(tenant_id);

        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(store_id) = filter.store_id {
            qb.push(" AND store_id = ").push_bind(store_id);
        }
        if let Some(supplier_id) = filter.supplier_id {
            qb.push(" AND supplier_id = ").push_bind(supplier_id);
        }
        if let Some(search) = filter.search.as_deref() {
            // Comparação contra os tokens normalizados, nunca contra o texto cru
            let candidates = text::search_candidates(search);
            qb.push(" AND search_tokens && ").push_bind(candidates);
        }
        if filter.overdue_only {
            qb.push(" AND is_closed = false AND due_date < ").push_bind(today);
        }
        if filter.action_today_only {
            qb.push(" AND next_action_at = ").push_bind(today);
        }

        // Paginação keyset: a ordenação muda no recorte de atrasados, que o
        // painel consome em ordem crescente de vencimento.
        if let Some(cursor_id) = cursor {
            let anchor = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1")
                .bind(cursor_id)
                .fetch_optional(&self.pool)
                .await?;

            if let Some(anchor) = anchor {
                if filter.overdue_only {
                    if let Some(anchor_due) = anchor.due_date {
                        qb.push(" AND (due_date > ").push_bind(anchor_due);
                        qb.push(" OR (due_date = ").push_bind(anchor_due);
                        qb.push(" AND id > ").push_bind(anchor.id);
                        qb.push("))");
                    }
                } else {
                    qb.push(" AND (created_at < ").push_bind(anchor.created_at);
                    qb.push(" OR (created_at = ").push_bind(anchor.created_at);
                    qb.push(" AND id > ").push_bind(anchor.id);
                    qb.push("))");
                }
            }
        }

        if filter.overdue_only {
            qb.push(" ORDER BY due_date ASC, id ASC");
        } else {
            qb.push(" ORDER BY created_at DESC, id ASC");
        }
        qb.push(" LIMIT ").push_bind(limit + 1);

        let mut items = qb.build_query_as::<Ticket>().fetch_all(&self.pool).await?;

        let next_cursor = if items.len() as i64 > limit {
            items.truncate(limit as usize);
            items.last().map(|t| t.id)
        } else {
            None
        };

        Ok(TicketPage { items, next_cursor })
    }

    async fn list_by_tenant(&self, tenant_id: Uuid) -> Result<Vec<Ticket>, AppError> {
        let tickets = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(tickets)
    }

    async fn count_next_actions(
        &self,
        tenant_id: Uuid,
        today: NaiveDate,
    ) -> Result<NextActionCounts, AppError> {
        let (overdue, today_count, next_seven) = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE next_action_at < $2),
                COUNT(*) FILTER (WHERE next_action_at = $2),
                COUNT(*) FILTER (WHERE next_action_at > $2 AND next_action_at <= $2 + 7)
            FROM tickets
            WHERE tenant_id = $1 AND is_closed = false AND next_action_at IS NOT NULL
            "#,
        )
        .bind(tenant_id)
        .bind(today)
        .fetch_one(&self.pool)
        .await?;

        Ok(NextActionCounts { overdue, today: today_count, next_seven_days: next_seven })
    }
}
