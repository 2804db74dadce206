// src/handlers/jobs.rs

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    common::error::AppError,
    config::AppState,
    services::{
        assignment_service::ReconcileSummary,
        escalation_service::ClaimWindowSummary,
        release_service::ReleaseSummary,
        sla_service::SlaSummary,
    },
};

// Os jobs são disparados por um agendador externo em intervalo fixo, mas
// o painel do admin tem botões que chamam os mesmos handlers na hora.
// `triggered_by` só distingue os dois casos nos logs.
#[derive(Debug, Deserialize, IntoParams)]
pub struct JobTrigger {
    pub triggered_by: Option<String>,
}

impl JobTrigger {
    fn label(&self) -> &str {
        self.triggered_by.as_deref().unwrap_or("scheduler")
    }
}

// POST /api/jobs/check-claim-windows
#[utoipa::path(
    post,
    path = "/api/jobs/check-claim-windows",
    tag = "Jobs",
    params(JobTrigger),
    responses(
        (status = 200, description = "Resumo do ciclo do monitor", body = ClaimWindowSummary)
    ),
    security(("api_jwt" = []))
)]
pub async fn check_claim_windows(
    State(app_state): State<AppState>,
    Query(trigger): Query<JobTrigger>,
) -> Result<impl IntoResponse, AppError> {
    let summary = app_state
        .escalation_service
        .run_claim_window_check(trigger.label())
        .await?;

    Ok((StatusCode::OK, Json(summary)))
}

// POST /api/jobs/check-sla-breaches
#[utoipa::path(
    post,
    path = "/api/jobs/check-sla-breaches",
    tag = "Jobs",
    params(JobTrigger),
    responses(
        (status = 200, description = "Resumo da varredura de SLA", body = SlaSummary)
    ),
    security(("api_jwt" = []))
)]
pub async fn check_sla_breaches(
    State(app_state): State<AppState>,
    Query(trigger): Query<JobTrigger>,
) -> Result<impl IntoResponse, AppError> {
    let summary = app_state.sla_service.run_sla_check(trigger.label()).await?;

    Ok((StatusCode::OK, Json(summary)))
}

// POST /api/jobs/release-night-held — "Release Night Leads Now"
#[utoipa::path(
    post,
    path = "/api/jobs/release-night-held",
    tag = "Jobs",
    params(JobTrigger),
    responses(
        (status = 200, description = "Resumo da liberação matinal", body = ReleaseSummary)
    ),
    security(("api_jwt" = []))
)]
pub async fn release_night_held(
    State(app_state): State<AppState>,
    Query(trigger): Query<JobTrigger>,
) -> Result<impl IntoResponse, AppError> {
    let summary = app_state.release_service.run_release(trigger.label()).await?;

    Ok((StatusCode::OK, Json(summary)))
}

// POST /api/jobs/reconcile-lead-counts — recontagem dos contadores de
// capacidade a partir dos leads ativos
#[utoipa::path(
    post,
    path = "/api/jobs/reconcile-lead-counts",
    tag = "Jobs",
    responses(
        (status = 200, description = "Resumo da reconciliação", body = ReconcileSummary)
    ),
    security(("api_jwt" = []))
)]
pub async fn reconcile_lead_counts(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let summary = app_state.assignment_service.reconcile_lead_counts().await?;

    Ok((StatusCode::OK, Json(summary)))
}
