// src/models/activities.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, ToSchema)]
#[sqlx(type_name = "activity_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Call,
    Email,
    Whatsapp,
    Meeting,
    Note,
}

impl ActivityType {
    // Só contato real com o cliente conta como "primeira ação" para o SLA;
    // uma nota interna não tira o lead da varredura de breach.
    pub fn completes_first_action(&self) -> bool {
        matches!(
            self,
            ActivityType::Call | ActivityType::Email | ActivityType::Whatsapp | ActivityType::Meeting
        )
    }
}

// Entrada da trilha de auditoria de um lead. Append-only.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub agent_id: Option<Uuid>,
    pub activity_type: ActivityType,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_contact_activities_complete_first_action() {
        assert!(ActivityType::Call.completes_first_action());
        assert!(ActivityType::Email.completes_first_action());
        assert!(ActivityType::Whatsapp.completes_first_action());
        assert!(ActivityType::Meeting.completes_first_action());
        assert!(!ActivityType::Note.completes_first_action());
    }
}
