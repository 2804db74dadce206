// src/models/leads.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// --- ENUMS ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, ToSchema)]
#[sqlx(type_name = "lead_segment", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeadSegment {
    Hot,
    Warm,
    Cool,
    Cold,
}

impl LeadSegment {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadSegment::Hot => "hot",
            LeadSegment::Warm => "warm",
            LeadSegment::Cool => "cool",
            LeadSegment::Cold => "cold",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, ToSchema)]
#[sqlx(type_name = "lead_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeadPriority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, ToSchema)]
#[sqlx(type_name = "lead_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Converted,
    Lost,
}

// Como o lead chegou ao agente atual
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, ToSchema)]
#[sqlx(type_name = "assignment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AssignmentMethod {
    Claimed,
    RuleBased,
    AdminFallback,
    AdminReassignment,
}

// --- O LEAD ---

// Uma linha de crm_leads. Nunca é apagada no fluxo normal: `archived`
// tira o lead de todas as varreduras.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,

    // Identidade do contato
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub language: String,

    // Rastreamento de origem
    pub lead_source: String,
    pub lead_source_detail: Option<String>,
    pub page_type: Option<String>,
    pub page_slug: Option<String>,
    pub referrer: Option<String>,

    // Qualificação
    pub budget_range: Option<String>,
    pub location_preference: Option<Vec<String>>,
    pub property_type: Option<Vec<String>>,
    pub property_purpose: Option<String>,
    pub bedrooms_desired: Option<String>,
    pub sea_view_importance: Option<String>,
    pub timeframe: Option<String>,
    pub message: Option<String>,

    // Intake conversacional (chatbot)
    pub questions_answered: i32,
    pub intake_complete: bool,

    // Pontuação derivada no intake
    pub initial_lead_score: i32,
    pub current_lead_score: i32,
    pub lead_segment: LeadSegment,
    pub lead_priority: LeadPriority,
    pub lead_status: LeadStatus,

    // Ciclo de vida do claim
    pub lead_claimed: bool,
    pub claimed_by: Option<String>,
    pub claim_window_expires_at: Option<DateTime<Utc>>,
    pub current_round: i32,
    pub round_broadcast_at: Option<DateTime<Utc>>,

    // Atribuição
    pub assigned_agent_id: Option<Uuid>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub assignment_method: Option<AssignmentMethod>,
    pub routing_rule_id: Option<Uuid>,
    pub previous_agent_id: Option<Uuid>,
    pub reassignment_count: i32,
    pub reassignment_reason: Option<String>,
    pub reassigned_at: Option<DateTime<Utc>>,

    // SLA de primeira ação
    pub first_action_completed: bool,
    pub sla_breached: bool,
    pub breach_timestamp: Option<DateTime<Utc>>,

    // Retenção noturna
    pub is_night_held: bool,
    pub scheduled_release_at: Option<DateTime<Utc>>,

    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// Motivo de uma transferência forçada feita pelo admin. O motivo decide
// quais timers são reiniciados (ver AssignmentService::reassign_lead).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReassignReason {
    Unclaimed,
    NoContact,
    Manual,
}

impl ReassignReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReassignReason::Unclaimed => "unclaimed",
            ReassignReason::NoContact => "no_contact",
            ReassignReason::Manual => "manual",
        }
    }

    // Transferências por SLA reiniciam o timer de primeira ação;
    // a manual não mexe em timer nenhum.
    pub fn resets_action_timer(&self) -> bool {
        !matches!(self, ReassignReason::Manual)
    }

    pub fn description(&self) -> &'static str {
        match self {
            ReassignReason::Unclaimed => "Lead was unclaimed within the claim window",
            ReassignReason::NoContact => "Previous agent did not make contact within the SLA window",
            ReassignReason::Manual => "Manual reassignment by admin",
        }
    }
}

// Dados de um lead recém-chegado, já com a pontuação computada pelo
// serviço de intake. Separado do payload HTTP para o repo não depender
// da camada de handlers.
#[derive(Debug, Clone)]
pub struct NewLead {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub language: String,

    pub lead_source: String,
    pub lead_source_detail: Option<String>,
    pub page_type: Option<String>,
    pub page_slug: Option<String>,
    pub referrer: Option<String>,

    pub budget_range: Option<String>,
    pub location_preference: Option<Vec<String>>,
    pub property_type: Option<Vec<String>>,
    pub property_purpose: Option<String>,
    pub bedrooms_desired: Option<String>,
    pub sea_view_importance: Option<String>,
    pub timeframe: Option<String>,
    pub message: Option<String>,

    pub questions_answered: i32,
    pub intake_complete: bool,

    pub score: i32,
    pub segment: LeadSegment,
    pub priority: LeadPriority,

    pub claim_window_expires_at: Option<DateTime<Utc>>,
    pub is_night_held: bool,
    pub scheduled_release_at: Option<DateTime<Utc>>,
}

// Payload público do formulário/chatbot do site
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterLeadPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Maria")]
    pub first_name: String,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Jansen")]
    pub last_name: String,

    #[validate(length(min = 5, message = "required"))]
    #[schema(example = "+31612345678")]
    pub phone: String,

    #[validate(email(message = "invalid_email"))]
    #[schema(example = "maria@email.com")]
    pub email: Option<String>,

    #[schema(example = "nl")]
    pub language: Option<String>,

    #[schema(example = "website")]
    pub lead_source: Option<String>,
    pub lead_source_detail: Option<String>,
    pub page_type: Option<String>,
    pub page_slug: Option<String>,
    pub referrer: Option<String>,

    #[schema(example = "500k-1m")]
    pub budget_range: Option<String>,
    pub location_preference: Option<Vec<String>>,
    pub property_type: Option<Vec<String>>,
    pub property_purpose: Option<String>,
    pub bedrooms_desired: Option<String>,
    pub sea_view_importance: Option<String>,
    #[schema(example = "6_months")]
    pub timeframe: Option<String>,
    pub message: Option<String>,

    // Quantas perguntas o chatbot conseguiu responder antes do envio
    #[serde(default)]
    pub questions_answered: i32,
    #[serde(default)]
    pub intake_complete: bool,
}
