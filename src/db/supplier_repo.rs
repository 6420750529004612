// src/db/supplier_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::contracts::SupplierDirectory,
    models::ticket::Supplier,
};

#[derive(Clone)]
pub struct SupplierRepository {
    pool: PgPool,
}

impl SupplierRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SupplierDirectory for SupplierRepository {
    async fn get(&self, supplier_id: Uuid, tenant_id: Uuid) -> Result<Option<Supplier>, AppError> {
        let supplier = sqlx::query_as::<_, Supplier>(
            r#"
            SELECT id, tenant_id, name, sla_days
            FROM suppliers
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(supplier_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(supplier)
    }
}
