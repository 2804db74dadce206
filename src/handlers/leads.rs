// src/handlers/leads.rs

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
    models::leads::{Lead, ReassignReason, RegisterLeadPayload},
    services::{assignment_service::ReassignResult, intake_service::IntakeResult},
};

// POST /api/leads — entrada pública do formulário/chatbot do site
#[utoipa::path(
    post,
    path = "/api/leads",
    tag = "Leads",
    request_body = RegisterLeadPayload,
    responses(
        (status = 201, description = "Lead registrado e roteado", body = IntakeResult),
        (status = 400, description = "Dados inválidos")
    )
)]
pub async fn register_lead(
    State(app_state): State<AppState>,
    Json(payload): Json<RegisterLeadPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let result = app_state.intake_service.register_lead(payload).await?;

    Ok((StatusCode::CREATED, Json(result)))
}

// GET /api/crm/leads/{id}
#[utoipa::path(
    get,
    path = "/api/crm/leads/{id}",
    tag = "Leads",
    params(("id" = Uuid, Path, description = "ID do lead")),
    responses(
        (status = 200, description = "Detalhe do lead", body = Lead),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_lead(
    State(app_state): State<AppState>,
    Path(lead_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let lead = app_state
        .lead_repo
        .find_by_id(&app_state.db_pool, lead_id)
        .await?
        .ok_or(AppError::LeadNotFound)?;

    Ok((StatusCode::OK, Json(lead)))
}

// POST /api/crm/leads/{id}/claim
#[utoipa::path(
    post,
    path = "/api/crm/leads/{id}/claim",
    tag = "Leads",
    params(("id" = Uuid, Path, description = "ID do lead")),
    responses(
        (status = 200, description = "Lead reivindicado", body = Lead),
        (status = 409, description = "Lead já reivindicado ou agente sem capacidade")
    ),
    security(("api_jwt" = []))
)]
pub async fn claim_lead(
    State(app_state): State<AppState>,
    AuthenticatedAgent(agent): AuthenticatedAgent,
    Path(lead_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let lead = app_state.assignment_service.claim_lead(lead_id, &agent).await?;

    Ok((StatusCode::OK, Json(lead)))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReassignLeadPayload {
    pub to_agent_id: Uuid,
    pub reason: ReassignReason,
    pub notes: Option<String>,
}

// POST /api/crm/admin/leads/{id}/reassign — transferência forçada,
// passa por cima do motor de regras
#[utoipa::path(
    post,
    path = "/api/crm/admin/leads/{id}/reassign",
    tag = "Leads",
    params(("id" = Uuid, Path, description = "ID do lead")),
    request_body = ReassignLeadPayload,
    responses(
        (status = 200, description = "Lead transferido", body = ReassignResult),
        (status = 404, description = "Lead ou agente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn reassign_lead(
    State(app_state): State<AppState>,
    AuthenticatedAgent(admin): AuthenticatedAgent,
    Path(lead_id): Path<Uuid>,
    Json(payload): Json<ReassignLeadPayload>,
) -> Result<impl IntoResponse, AppError> {
    let result = app_state
        .assignment_service
        .reassign_lead(
            lead_id,
            payload.to_agent_id,
            payload.reason,
            payload.notes.as_deref(),
            &admin,
        )
        .await?;

    Ok((StatusCode::OK, Json(result)))
}
