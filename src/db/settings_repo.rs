// src/db/settings_repo.rs

use serde::de::DeserializeOwned;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::settings::{
        EscalationSettings, NightHoldSettings, RoundRobinConfig, RoutingRule, SlaSettings,
    },
};

// Ajustes de domínio e configuração de roteamento. Tudo leitura de
// pool direto: nada aqui participa de transação.
#[derive(Clone)]
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lê uma chave JSONB de crm_system_settings. Chave ausente ou JSON
    /// malformado caem no Default do tipo — o sistema nunca para por
    /// causa de um ajuste quebrado, só loga.
    async fn load_key<T>(&self, key: &str) -> Result<T, AppError>
    where
        T: DeserializeOwned + Default,
    {
        let value: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT value FROM crm_system_settings WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        match value {
            Some(raw) => match serde_json::from_value(raw) {
                Ok(parsed) => Ok(parsed),
                Err(e) => {
                    tracing::warn!("Ajuste '{}' malformado, usando defaults: {}", key, e);
                    Ok(T::default())
                }
            },
            None => Ok(T::default()),
        }
    }

    pub async fn sla_settings(&self) -> Result<SlaSettings, AppError> {
        self.load_key("sla_settings").await
    }

    pub async fn escalation_settings(&self) -> Result<EscalationSettings, AppError> {
        self.load_key("escalation_settings").await
    }

    pub async fn night_hold_settings(&self) -> Result<NightHoldSettings, AppError> {
        self.load_key("night_hold_settings").await
    }

    pub async fn round_config(
        &self,
        language: &str,
        round_number: i32,
    ) -> Result<Option<RoundRobinConfig>, AppError> {
        let config = sqlx::query_as::<_, RoundRobinConfig>(
            r#"
            SELECT * FROM crm_round_robin_config
            WHERE language = $1
              AND round_number = $2
              AND is_active = TRUE
            "#,
        )
        .bind(language)
        .bind(round_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(config)
    }

    /// Admin de fallback configurado para o idioma (rodada mais alta primeiro)
    pub async fn fallback_admin_for_language(&self, language: &str) -> Result<Option<Uuid>, AppError> {
        let admin_id: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT fallback_admin_id FROM crm_round_robin_config
            WHERE language = $1
              AND is_active = TRUE
              AND fallback_admin_id IS NOT NULL
            ORDER BY round_number DESC
            LIMIT 1
            "#,
        )
        .bind(language)
        .fetch_optional(&self.pool)
        .await?;

        Ok(admin_id)
    }

    /// Regras ativas na ordem de avaliação: prioridade alta primeiro,
    /// desempate pela mais antiga
    pub async fn active_routing_rules(&self) -> Result<Vec<RoutingRule>, AppError> {
        let rules = sqlx::query_as::<_, RoutingRule>(
            r#"
            SELECT * FROM crm_routing_rules
            WHERE is_active = TRUE
            ORDER BY priority DESC, created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rules)
    }

    pub async fn record_rule_match(&self, rule_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE crm_routing_rules
            SET total_matches = total_matches + 1,
                last_matched_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(rule_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
