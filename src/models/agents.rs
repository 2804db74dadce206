// src/models/agents.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Mapeia o CREATE TYPE agent_role do banco
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, ToSchema)]
#[sqlx(type_name = "agent_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Agent,
    Admin,
}

// Um agente de vendas (ou administrador) do CRM
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: Uuid,
    pub email: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    pub password_hash: String,

    pub first_name: String,
    pub last_name: String,
    pub role: AgentRole,

    // Idiomas que o agente atende (ex: ["en", "nl"])
    pub languages: Vec<String>,

    pub is_active: bool,
    pub accepts_new_leads: bool,

    // Contador desnormalizado de leads ativos; reconciliado sob demanda
    // pelo job de recontagem
    pub current_lead_count: i32,
    pub max_active_leads: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    pub fn has_capacity(&self) -> bool {
        self.current_lead_count < self.max_active_leads
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_admin(&self) -> bool {
        self.role == AgentRole::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(count: i32, max: i32) -> Agent {
        Agent {
            id: Uuid::new_v4(),
            email: "a@b.c".into(),
            password_hash: "x".into(),
            first_name: "Ana".into(),
            last_name: "Prins".into(),
            role: AgentRole::Agent,
            languages: vec!["en".into()],
            is_active: true,
            accepts_new_leads: true,
            current_lead_count: count,
            max_active_leads: max,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn capacity_is_strictly_below_max() {
        assert!(agent(0, 10).has_capacity());
        assert!(agent(9, 10).has_capacity());
        assert!(!agent(10, 10).has_capacity());
        assert!(!agent(11, 10).has_capacity());
    }
}
