use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::ticket::TicketStatus;

// Nosso tipo de erro central, com `thiserror` para melhor ergonomia.
// As variantes de workflow espelham a taxonomia que o front-end conhece:
// NOT_FOUND / FORBIDDEN / INVALID_TRANSITION / MISSING_REQUIREMENT / VALIDATION.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Entrada malformada em nível de domínio (ex.: fornecedor inexistente)
    #[error("{0}")]
    Validation(String),

    #[error("Chamado não encontrado")]
    TicketNotFound,

    // O gateway não repassou (ou repassou malformada) a identidade do usuário
    #[error("Identidade do usuário ausente ou inválida")]
    MissingIdentity,

    #[error("Ação não permitida para o perfil {0}")]
    Forbidden(String),

    #[error("Transição inválida: {0}")]
    InvalidTransition(String),

    // `missing` é o discriminador legível por máquina do requisito não atendido
    #[error("Requisito pendente: {missing}")]
    MissingRequirement { missing: &'static str },

    // Outro operador concluiu uma transição no mesmo chamado antes de nós
    #[error("O chamado foi alterado por outro usuário (status atual: {current:?})")]
    TransitionConflict { current: TicketStatus },

    // Variante para erros de banco de dados (sqlx)
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors.iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }

            // O front usa `missing` para destacar o campo pendente no checklist.
            AppError::MissingRequirement { missing } => {
                let body = Json(json!({
                    "error": format!("Requisito pendente para avançar: {}", missing),
                    "missing": missing,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }

            AppError::Validation(msg) => {
                return (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response();
            }

            AppError::TicketNotFound => {
                (StatusCode::NOT_FOUND, "Chamado não encontrado.".to_string())
            }
            AppError::MissingIdentity => (
                StatusCode::UNAUTHORIZED,
                "Identidade do usuário ausente ou inválida.".to_string(),
            ),
            AppError::Forbidden(role) => (
                StatusCode::FORBIDDEN,
                format!("O perfil {} não pode executar esta etapa.", role),
            ),
            AppError::InvalidTransition(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::TransitionConflict { .. } => (
                StatusCode::CONFLICT,
                "O chamado foi alterado por outro usuário. Recarregue e tente novamente.".to_string(),
            ),

            // Todos os outros erros (DatabaseError, InternalServerError) viram 500.
            // O `tracing` loga a mensagem detalhada que `thiserror` nos deu.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocorreu um erro inesperado.".to_string(),
                )
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
