// src/handlers/notifications.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedAgent,
    models::notifications::Notification,
};

// GET /api/crm/notifications — notificações do agente logado
#[utoipa::path(
    get,
    path = "/api/crm/notifications",
    tag = "Notifications",
    responses(
        (status = 200, description = "Notificações do agente, não lidas primeiro", body = Vec<Notification>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_notifications(
    State(app_state): State<AppState>,
    AuthenticatedAgent(agent): AuthenticatedAgent,
) -> Result<impl IntoResponse, AppError> {
    let notifications = app_state.notification_repo.list_for_agent(agent.id).await?;
    Ok((StatusCode::OK, Json(notifications)))
}

// POST /api/crm/notifications/{id}/read
#[utoipa::path(
    post,
    path = "/api/crm/notifications/{id}/read",
    tag = "Notifications",
    params(("id" = Uuid, Path, description = "ID da notificação")),
    responses(
        (status = 200, description = "Notificação marcada como lida")
    ),
    security(("api_jwt" = []))
)]
pub async fn mark_notification_read(
    State(app_state): State<AppState>,
    AuthenticatedAgent(agent): AuthenticatedAgent,
    Path(notification_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let updated = app_state
        .notification_repo
        .mark_read(notification_id, agent.id)
        .await?;

    Ok((StatusCode::OK, Json(json!({ "success": true, "updated": updated }))))
}
