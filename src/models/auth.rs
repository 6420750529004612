// src/models/auth.rs

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

// Perfis operacionais do fluxo de garantias. A autenticação em si acontece
// no gateway; aqui só interpretamos a identidade já validada que ele repassa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    // Balcão da loja: abre chamados e conclui o recebimento
    Loja,
    // Triagem interna: confere a peça e prepara o envio ao fornecedor
    Interno,
    // Logística: entrega ao fornecedor e coleta o canhoto
    Logistica,
    // Cobrança: acompanha o fornecedor até a resolução e o encerramento
    Cobranca,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Loja => "LOJA",
            Role::Interno => "INTERNO",
            Role::Logistica => "LOGISTICA",
            Role::Cobranca => "COBRANCA",
            Role::Admin => "ADMIN",
        }
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOJA" => Ok(Role::Loja),
            "INTERNO" => Ok(Role::Interno),
            "LOGISTICA" => Ok(Role::Logistica),
            "COBRANCA" => Ok(Role::Cobranca),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(()),
        }
    }
}

// Identidade repassada pelo gateway nos cabeçalhos x-user-*.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
}
