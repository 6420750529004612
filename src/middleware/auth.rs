// src/middleware/auth.rs

use axum::{
    body::Body,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use crate::{
    common::error::AppError,
    models::auth::{Actor, Role},
};

// A autenticação acontece no gateway, que repassa a identidade já
// validada nestes cabeçalhos. Este serviço confia neles e só os
// interpreta.
const USER_ID_HEADER: &str = "x-user-id";
const USER_NAME_HEADER: &str = "x-user-name";
const USER_ROLE_HEADER: &str = "x-user-role";

// O middleware em si: materializa o Actor e o insere nos "extensions".
pub async fn identity_guard(
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let actor = parse_actor(request.headers()).ok_or(AppError::MissingIdentity)?;

    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

fn parse_actor(headers: &HeaderMap) -> Option<Actor> {
    let id = headers
        .get(USER_ID_HEADER)?
        .to_str()
        .ok()?
        .parse()
        .ok()?;
    let name = headers.get(USER_NAME_HEADER)?.to_str().ok()?.to_string();
    let role: Role = headers.get(USER_ROLE_HEADER)?.to_str().ok()?.parse().ok()?;

    Some(Actor { id, name, role })
}

// Extrator para obter o ator autenticado diretamente nos handlers
pub struct AuthenticatedUser(pub Actor);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .cloned()
            .map(AuthenticatedUser)
            .ok_or(AppError::MissingIdentity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use uuid::Uuid;

    #[test]
    fn identidade_completa_e_interpretada() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());
        headers.insert(USER_NAME_HEADER, HeaderValue::from_static("Ana"));
        headers.insert(USER_ROLE_HEADER, HeaderValue::from_static("cobranca"));

        let actor = parse_actor(&headers).unwrap();
        assert_eq!(actor.id, id);
        assert_eq!(actor.role, Role::Cobranca);
    }

    #[test]
    fn perfil_desconhecido_e_rejeitado() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_str(&Uuid::new_v4().to_string()).unwrap());
        headers.insert(USER_NAME_HEADER, HeaderValue::from_static("Ana"));
        headers.insert(USER_ROLE_HEADER, HeaderValue::from_static("estagiario"));

        assert!(parse_actor(&headers).is_none());
    }
}
