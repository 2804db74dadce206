// src/handlers/activities.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedAgent,
    models::activities::{Activity, ActivityType},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogActivityPayload {
    pub activity_type: ActivityType,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Ligação feita, cliente pediu retorno amanhã")]
    pub notes: String,
}

// POST /api/crm/leads/{id}/activities
// Registrar uma ligação/e-mail/whatsapp/reunião conta como primeira ação
// e tira o lead da varredura de SLA.
#[utoipa::path(
    post,
    path = "/api/crm/leads/{id}/activities",
    tag = "Activities",
    params(("id" = Uuid, Path, description = "ID do lead")),
    request_body = LogActivityPayload,
    responses(
        (status = 201, description = "Atividade registrada", body = Activity),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn log_activity(
    State(app_state): State<AppState>,
    AuthenticatedAgent(agent): AuthenticatedAgent,
    Path(lead_id): Path<Uuid>,
    Json(payload): Json<LogActivityPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let activity = app_state
        .assignment_service
        .log_activity(lead_id, &agent, payload.activity_type, &payload.notes)
        .await?;

    Ok((StatusCode::CREATED, Json(activity)))
}

// GET /api/crm/leads/{id}/activities
#[utoipa::path(
    get,
    path = "/api/crm/leads/{id}/activities",
    tag = "Activities",
    params(("id" = Uuid, Path, description = "ID do lead")),
    responses(
        (status = 200, description = "Trilha de auditoria do lead", body = Vec<Activity>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_activities(
    State(app_state): State<AppState>,
    Path(lead_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let activities = app_state
        .activity_repo
        .list_for_lead(&app_state.db_pool, lead_id)
        .await?;

    Ok((StatusCode::OK, Json(activities)))
}
