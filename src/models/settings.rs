// src/models/settings.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// Configuração de round-robin por (idioma, rodada). Diz quais agentes
// recebem o broadcast da rodada e quanto dura a janela de claim.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RoundRobinConfig {
    pub id: Uuid,
    pub language: String,
    pub round_number: i32,
    pub agent_ids: Vec<Uuid>,
    pub claim_window_minutes: i32,
    pub fallback_admin_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// Regra de atribuição instantânea (Tier 1 do intake). Um array de match
// vazio/nulo significa "não restringe".
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RoutingRule {
    pub id: Uuid,
    pub rule_name: String,
    pub priority: i32,
    pub is_active: bool,
    pub match_language: Option<Vec<String>>,
    pub match_page_type: Option<Vec<String>>,
    pub match_page_slug: Option<Vec<String>>,
    pub match_lead_source: Option<Vec<String>>,
    pub match_lead_segment: Option<Vec<String>>,
    pub match_budget_range: Option<Vec<String>>,
    pub match_property_type: Option<Vec<String>>,
    pub match_timeframe: Option<Vec<String>>,
    pub assign_to_agent_id: Uuid,
    pub fallback_to_broadcast: bool,
    pub total_matches: i32,
    pub last_matched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// --- Ajustes chave/valor (crm_system_settings) ---
// Cada chave é um JSONB com defaults embutidos no código, para o sistema
// funcionar mesmo com a tabela vazia.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaSettings {
    #[serde(default = "default_first_action_minutes")]
    pub first_action_minutes: i64,
}

fn default_first_action_minutes() -> i64 {
    10
}

impl Default for SlaSettings {
    fn default() -> Self {
        Self {
            first_action_minutes: default_first_action_minutes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationSettings {
    #[serde(default = "default_max_rounds")]
    pub max_rounds: i32,
    #[serde(default = "default_claim_window_minutes")]
    pub default_claim_window_minutes: i64,
}

fn default_max_rounds() -> i32 {
    3
}

fn default_claim_window_minutes() -> i64 {
    15
}

impl Default for EscalationSettings {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            default_claim_window_minutes: default_claim_window_minutes(),
        }
    }
}

// Janela de retenção noturna em horas UTC. Com start > end a janela
// cruza a meia-noite (ex: 22h às 8h).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NightHoldSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_night_start")]
    pub start_hour: u32,
    #[serde(default = "default_night_end")]
    pub end_hour: u32,
}

fn default_night_start() -> u32 {
    22
}

fn default_night_end() -> u32 {
    8
}

impl Default for NightHoldSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            start_hour: default_night_start(),
            end_hour: default_night_end(),
        }
    }
}
