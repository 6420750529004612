// src/middleware/tenancy.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::common::error::AppError;

// O nome do nosso cabeçalho HTTP customizado
const TENANT_ID_HEADER: &str = "x-tenant-id";

// Extrator com o UUID do tenant que o utilizador quer aceder. A resolução
// de tenant em si (quem pode ver o quê) é papel do gateway; aqui o valor
// só delimita o escopo de toda consulta e mutação.
#[derive(Debug, Clone)]
pub struct TenantContext(pub Uuid);

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(TENANT_ID_HEADER)
            .ok_or_else(|| {
                AppError::Validation("O cabeçalho x-tenant-id é obrigatório.".to_string())
            })?;

        let value_str = header_value.to_str().map_err(|_| {
            AppError::Validation("Cabeçalho x-tenant-id contém caracteres inválidos.".to_string())
        })?;

        let tenant_id = Uuid::parse_str(value_str).map_err(|_| {
            AppError::Validation("Cabeçalho x-tenant-id inválido (não é um UUID).".to_string())
        })?;

        Ok(TenantContext(tenant_id))
    }
}
