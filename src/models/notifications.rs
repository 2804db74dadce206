// src/models/notifications.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::agents::Agent;
use crate::models::leads::{Lead, ReassignReason};

// Mapeia o CREATE TYPE notification_type do banco
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, ToSchema)]
#[sqlx(type_name = "notification_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    NewLeadAvailable,
    RuleAssigned,
    AdminFallback,
    SlaWarning,
    SlaReminder,
    LeadReassigned,
}

// Notificação in-app de um agente sobre um lead
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub lead_id: Uuid,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub action_url: String,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub agent_id: Uuid,
    pub lead_id: Uuid,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub action_url: String,
}

// --- DESPACHO EXTERNO (e-mail/push) ---

// Só os campos de contato; nunca serializamos o Agent inteiro para fora
// (password_hash é skip_serializing, mas contato é tudo que o dispatcher usa)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentContact {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&Agent> for AgentContact {
    fn from(agent: &Agent) -> Self {
        Self {
            id: agent.id,
            email: agent.email.clone(),
            first_name: agent.first_name.clone(),
            last_name: agent.last_name.clone(),
        }
    }
}

// Payload enviado ao endpoint externo de despacho. Conjunto FECHADO de
// variantes: cada tipo de notificação tem os campos que o dispatcher
// precisa, verificados em compilação — nada de JSON de forma livre.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum DispatchPayload {
    Broadcast {
        lead: Lead,
        agents: Vec<AgentContact>,
        claim_window_minutes: i64,
    },
    Escalation {
        lead: Lead,
        agents: Vec<AgentContact>,
        claim_window_minutes: i64,
        current_round: i32,
    },
    AdminFallback {
        lead: Lead,
        admin: AgentContact,
        rounds_attempted: i32,
    },
    SlaWarning {
        lead: Lead,
        admin: AgentContact,
        assigned_agent_name: String,
        minutes_since_assignment: i64,
        sla_minutes: i64,
    },
    RuleAssigned {
        lead: Lead,
        agent: AgentContact,
        rule_name: String,
    },
    Reassigned {
        lead: Lead,
        agent: AgentContact,
        from_agent_name: String,
        reason: ReassignReason,
    },
}

impl DispatchPayload {
    // Nome curto para logs
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchPayload::Broadcast { .. } => "broadcast",
            DispatchPayload::Escalation { .. } => "escalation",
            DispatchPayload::AdminFallback { .. } => "admin_fallback",
            DispatchPayload::SlaWarning { .. } => "sla_warning",
            DispatchPayload::RuleAssigned { .. } => "rule_assigned",
            DispatchPayload::Reassigned { .. } => "reassigned",
        }
    }
}
