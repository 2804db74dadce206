// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, State},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::{common::error::AppError, config::AppState, models::agents::Agent};

// Valida o Bearer token e injeta o agente autenticado nos extensions
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let agent = authenticate(&app_state, request.headers()).await?;
    request.extensions_mut().insert(agent);
    Ok(next.run(request).await)
}

// Igual ao auth_guard, mas só deixa passar administradores. Protege os
// gatilhos manuais de jobs e a administração de agentes.
pub async fn admin_guard(
    State(app_state): State<AppState>,
    mut request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let agent = authenticate(&app_state, request.headers()).await?;
    if !agent.is_admin() {
        return Err(AppError::AdminOnly);
    }
    request.extensions_mut().insert(agent);
    Ok(next.run(request).await)
}

async fn authenticate(
    app_state: &AppState,
    headers: &HeaderMap,
) -> Result<Agent, AppError> {
    let auth_header = headers
        .get("Authorization")
        .and_then(|value| value.to_str().ok());

    if let Some(auth_header) = auth_header {
        if let Some(token) = auth_header.strip_prefix("Bearer ") {
            return app_state.auth_service.validate_token(token).await;
        }
    }

    Err(AppError::InvalidToken)
}

// Extrator para obter o agente autenticado diretamente nos handlers
pub struct AuthenticatedAgent(pub Agent);

impl<S> FromRequestParts<S> for AuthenticatedAgent
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Agent>()
            .cloned()
            .map(AuthenticatedAgent)
            .ok_or(AppError::InvalidToken)
    }
}
