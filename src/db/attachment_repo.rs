// src/db/attachment_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::contracts::AttachmentGate,
    models::events::{Attachment, AttachmentCategory},
};

// Os anexos são gravados pelo subsistema de arquivos; aqui só lemos os
// metadados para o gate do canhoto e para o resumo por etapa.
#[derive(Clone)]
pub struct AttachmentRepository {
    pool: PgPool,
}

impl AttachmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttachmentGate for AttachmentRepository {
    async fn exists(
        &self,
        ticket_id: Uuid,
        category: AttachmentCategory,
    ) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM ticket_attachments WHERE ticket_id = $1 AND category = $2)",
        )
        .bind(ticket_id)
        .bind(category)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn list_for_ticket(&self, ticket_id: Uuid) -> Result<Vec<Attachment>, AppError> {
        let attachments = sqlx::query_as::<_, Attachment>(
            "SELECT * FROM ticket_attachments WHERE ticket_id = $1 ORDER BY created_at ASC",
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(attachments)
    }
}
