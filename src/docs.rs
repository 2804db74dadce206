// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};

use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,
        handlers::auth::get_me,

        // --- Leads ---
        handlers::leads::register_lead,
        handlers::leads::get_lead,
        handlers::leads::claim_lead,
        handlers::leads::reassign_lead,

        // --- Activities ---
        handlers::activities::log_activity,
        handlers::activities::list_activities,

        // --- Notifications ---
        handlers::notifications::list_notifications,
        handlers::notifications::mark_notification_read,

        // --- Agents ---
        handlers::agents::create_agent,
        handlers::agents::list_agents,

        // --- Jobs ---
        handlers::jobs::check_claim_windows,
        handlers::jobs::check_sla_breaches,
        handlers::jobs::release_night_held,
        handlers::jobs::reconcile_lead_counts,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::LoginPayload,
            models::auth::AuthResponse,

            // --- Agents ---
            models::agents::Agent,
            models::agents::AgentRole,
            handlers::agents::CreateAgentPayload,

            // --- Leads ---
            models::leads::Lead,
            models::leads::LeadSegment,
            models::leads::LeadPriority,
            models::leads::LeadStatus,
            models::leads::AssignmentMethod,
            models::leads::ReassignReason,
            models::leads::RegisterLeadPayload,
            handlers::leads::ReassignLeadPayload,

            // --- Activities ---
            models::activities::Activity,
            models::activities::ActivityType,
            handlers::activities::LogActivityPayload,

            // --- Notifications ---
            models::notifications::Notification,
            models::notifications::NotificationType,

            // --- Resumos dos jobs ---
            services::intake_service::IntakeResult,
            services::assignment_service::ReassignResult,
            services::assignment_service::ReconcileSummary,
            services::escalation_service::ClaimWindowSummary,
            services::sla_service::SlaSummary,
            services::release_service::ReleaseSummary,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação dos agentes"),
        (name = "Leads", description = "Intake, claim e transferência de leads"),
        (name = "Activities", description = "Trilha de auditoria dos leads"),
        (name = "Notifications", description = "Notificações in-app dos agentes"),
        (name = "Agents", description = "Administração de agentes"),
        (name = "Jobs", description = "Jobs periódicos (monitor de claim, SLA, liberação noturna)")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
