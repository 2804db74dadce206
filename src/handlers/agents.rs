// src/handlers/agents.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::agents::{Agent, AgentRole},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAgentPayload {
    #[validate(email(message = "invalid_email"))]
    #[schema(example = "eva@example.com")]
    pub email: String,

    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Eva")]
    pub first_name: String,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Berg")]
    pub last_name: String,

    pub role: Option<AgentRole>,

    #[schema(example = json!(["en", "nl"]))]
    pub languages: Vec<String>,

    #[schema(example = 10)]
    pub max_active_leads: Option<i32>,
}

// POST /api/crm/admin/agents
#[utoipa::path(
    post,
    path = "/api/crm/admin/agents",
    tag = "Agents",
    request_body = CreateAgentPayload,
    responses(
        (status = 201, description = "Agente criado", body = Agent),
        (status = 409, description = "E-mail já em uso")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_agent(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateAgentPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let agent = app_state
        .auth_service
        .create_agent(
            &payload.email,
            &payload.password,
            &payload.first_name,
            &payload.last_name,
            payload.role.unwrap_or(AgentRole::Agent),
            &payload.languages,
            payload.max_active_leads.unwrap_or(10),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(agent)))
}

// GET /api/crm/admin/agents
#[utoipa::path(
    get,
    path = "/api/crm/admin/agents",
    tag = "Agents",
    responses(
        (status = 200, description = "Lista de agentes", body = Vec<Agent>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_agents(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let agents = app_state.agent_repo.list_all(&app_state.db_pool).await?;
    Ok((StatusCode::OK, Json(agents)))
}
