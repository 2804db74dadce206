// src/services/release_service.rs

use chrono::{Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;
use utoipa::ToSchema;

use crate::{
    common::error::AppError,
    db::{ActivityRepository, AgentRepository, LeadRepository, SettingsRepository},
    models::{activities::ActivityType, agents::Agent, leads::Lead},
    services::notification_service::NotificationService,
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseSummary {
    pub success: bool,
    pub released: usize,
    pub errors: usize,
}

// Broadcast matinal prefere agentes comuns; admins só entram quando
// nenhum agente comum tem capacidade.
pub(crate) fn prefer_non_admins(agents: Vec<Agent>) -> Vec<Agent> {
    let (admins, regular): (Vec<Agent>, Vec<Agent>) =
        agents.into_iter().partition(|a| a.is_admin());
    if regular.iter().any(|a| a.has_capacity()) {
        regular
    } else {
        regular.into_iter().chain(admins).collect()
    }
}

// Liberação dos leads retidos durante a noite: devolve cada um à rodada 1
// com uma janela de claim nova e refaz o broadcast.
#[derive(Clone)]
pub struct ReleaseService {
    pool: PgPool,
    lead_repo: LeadRepository,
    agent_repo: AgentRepository,
    activity_repo: ActivityRepository,
    settings_repo: SettingsRepository,
    notifier: NotificationService,
}

impl ReleaseService {
    pub fn new(
        pool: PgPool,
        lead_repo: LeadRepository,
        agent_repo: AgentRepository,
        activity_repo: ActivityRepository,
        settings_repo: SettingsRepository,
        notifier: NotificationService,
    ) -> Self {
        Self {
            pool,
            lead_repo,
            agent_repo,
            activity_repo,
            settings_repo,
            notifier,
        }
    }

    pub async fn run_release(&self, triggered_by: &str) -> Result<ReleaseSummary, AppError> {
        tracing::info!("[release-night-held] Iniciando (triggered_by={})", triggered_by);

        let held = self.lead_repo.find_night_held_due(&self.pool).await?;
        if held.is_empty() {
            tracing::info!("[release-night-held] Nenhum lead pronto para liberação");
            return Ok(ReleaseSummary {
                success: true,
                released: 0,
                errors: 0,
            });
        }

        tracing::info!("[release-night-held] {} leads para liberar", held.len());

        let mut released = 0;
        let mut errors = 0;

        for lead in &held {
            match self.release_lead(lead).await {
                Ok(true) => released += 1,
                Ok(false) => {} // liberado/reivindicado por outro caminho
                Err(e) => {
                    tracing::error!("[release-night-held] Erro no lead {}: {}", lead.id, e);
                    errors += 1;
                }
            }
        }

        tracing::info!("[release-night-held] Concluído. {} leads liberados", released);

        Ok(ReleaseSummary {
            success: true,
            released,
            errors,
        })
    }

    async fn release_lead(&self, lead: &Lead) -> Result<bool, AppError> {
        let escalation = self.settings_repo.escalation_settings().await?;
        let config = self.settings_repo.round_config(&lead.language, 1).await?;
        let window_minutes = config
            .as_ref()
            .map(|c| c.claim_window_minutes as i64)
            .unwrap_or(escalation.default_claim_window_minutes);

        let expires_at = Utc::now() + Duration::minutes(window_minutes);
        let updated = self.lead_repo.release_from_night_hold(&self.pool, lead.id, expires_at).await?;
        if updated == 0 {
            return Ok(false);
        }

        let candidates = match &config {
            Some(cfg) if !cfg.agent_ids.is_empty() => {
                self.agent_repo.find_eligible_by_ids(&self.pool, &cfg.agent_ids).await?
            }
            _ => self.agent_repo.find_eligible_by_language(&self.pool, &lead.language).await?,
        };
        let candidates = prefer_non_admins(candidates);

        // O broadcast usa o estado já liberado do lead
        let released = self
            .lead_repo
            .find_by_id(&self.pool, lead.id)
            .await?
            .ok_or(AppError::LeadNotFound)?;

        let notified = self
            .notifier
            .notify_morning_release(&released, &candidates, window_minutes)
            .await?;
        if notified == 0 {
            tracing::warn!(
                "[release-night-held] Lead {} liberado sem agentes disponíveis para {}",
                lead.id,
                lead.language
            );
        }

        self.activity_repo
            .insert(
                &self.pool,
                lead.id,
                None,
                ActivityType::Note,
                &format!(
                    "🌅 Lead released from overnight hold at business hours opening. \
                     Originally received at {}. Now available for claiming.",
                    lead.created_at
                ),
            )
            .await?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::agents::AgentRole;
    use uuid::Uuid;

    fn agent(role: AgentRole, count: i32, max: i32) -> Agent {
        Agent {
            id: Uuid::new_v4(),
            email: "a@b.c".into(),
            password_hash: "x".into(),
            first_name: "Sam".into(),
            last_name: "Iversen".into(),
            role,
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
    fn admins_are_dropped_when_regular_agents_have_capacity() {
        let agents = vec![
            agent(AgentRole::Agent, 0, 5),
            agent(AgentRole::Admin, 0, 5),
        ];
        let preferred = prefer_non_admins(agents);
        assert_eq!(preferred.len(), 1);
        assert!(!preferred[0].is_admin());
    }

    #[test]
    fn admins_stay_when_regular_agents_are_full() {
        let agents = vec![
            agent(AgentRole::Agent, 5, 5),
            agent(AgentRole::Admin, 0, 5),
        ];
        let preferred = prefer_non_admins(agents);
        assert_eq!(preferred.len(), 2);
    }
}
