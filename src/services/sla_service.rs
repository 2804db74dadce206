// src/services/sla_service.rs

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
pub struct SlaSummary {
    pub success: bool,
    pub processed: usize,
    pub errors: usize,
    pub sla_minutes: i64,
}

// Verificador de SLA de primeira ação, em modo somente-notificação: o
// lead continua com o agente original; admin e agente são avisados e o
// breach fica registrado para relatório.
#[derive(Clone)]
pub struct SlaService {
    pool: PgPool,
    lead_repo: LeadRepository,
    agent_repo: AgentRepository,
    activity_repo: ActivityRepository,
    settings_repo: SettingsRepository,
    notifier: NotificationService,
}

impl SlaService {
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

    pub async fn run_sla_check(&self, triggered_by: &str) -> Result<SlaSummary, AppError> {
        let settings = self.settings_repo.sla_settings().await?;
        let sla_minutes = settings.first_action_minutes;
        let cutoff = Utc::now() - Duration::minutes(sla_minutes);

        tracing::info!(
            "[check-sla-breaches] Iniciando (triggered_by={}, SLA {}min, corte {})",
            triggered_by,
            sla_minutes,
            cutoff
        );

        let breached = self.lead_repo.find_sla_breach_candidates(&self.pool, cutoff).await?;
        if breached.is_empty() {
            tracing::info!("[check-sla-breaches] Nenhum SLA estourado");
            return Ok(SlaSummary {
                success: true,
                processed: 0,
                errors: 0,
                sla_minutes,
            });
        }

        tracing::info!("[check-sla-breaches] {} leads com SLA estourado", breached.len());

        let mut processed = 0;
        let mut errors = 0;

        for lead in &breached {
            match self.process_breach(lead, sla_minutes).await {
                Ok(true) => processed += 1,
                Ok(false) => {} // marcado por outro ciclo no meio do caminho
                Err(e) => {
                    tracing::error!("[check-sla-breaches] Erro no lead {}: {}", lead.id, e);
                    errors += 1;
                }
            }
        }

        tracing::info!(
            "[check-sla-breaches] Concluído. {} avisos de SLA enviados, {} erros",
            processed,
            errors
        );

        Ok(SlaSummary {
            success: true,
            processed,
            errors,
            sla_minutes,
        })
    }

    async fn process_breach(&self, lead: &Lead, sla_minutes: i64) -> Result<bool, AppError> {
        // Guarda de idempotência: só um ciclo marca o breach
        let marked = self.lead_repo.mark_sla_breached(&self.pool, lead.id).await?;
        if marked == 0 {
            return Ok(false);
        }

        let assigned_agent = match lead.assigned_agent_id {
            Some(id) => self.agent_repo.find_by_id(&self.pool, id).await?,
            None => None,
        };
        let assigned_agent_name = assigned_agent
            .as_ref()
            .map(Agent::full_name)
            .unwrap_or_else(|| "Unknown Agent".to_string());

        let minutes_since_assignment = lead
            .assigned_at
            .map(|t| (Utc::now() - t).num_minutes())
            .unwrap_or(0);

        let Some(admin) = self.find_language_admin(&lead.language).await? else {
            tracing::error!(
                "[check-sla-breaches] Nenhum admin para avisar sobre o lead {}",
                lead.id
            );
            return Err(AppError::NoAdminAvailable);
        };

        self.notifier
            .notify_sla_breach(lead, &admin, &assigned_agent_name, minutes_since_assignment, sla_minutes)
            .await?;

        self.activity_repo
            .insert(
                &self.pool,
                lead.id,
                lead.assigned_agent_id,
                ActivityType::Note,
                &format!(
                    "⚠️ SLA WARNING: No first action logged within the {}-minute SLA window. \
                     Admin ({}) has been notified. Lead remains assigned to {}.",
                    sla_minutes,
                    admin.first_name,
                    assigned_agent_name
                ),
            )
            .await?;

        tracing::info!(
            "[check-sla-breaches] Lead {} - aviso enviado ao admin {} (sem reatribuição)",
            lead.id,
            admin.first_name
        );

        Ok(true)
    }

    // Admin configurado para o idioma do lead, senão qualquer admin ativo
    async fn find_language_admin(&self, language: &str) -> Result<Option<Agent>, AppError> {
        if let Some(admin_id) = self.settings_repo.fallback_admin_for_language(language).await? {
            if let Some(admin) = self.agent_repo.find_by_id(&self.pool, admin_id).await? {
                if admin.is_active {
                    return Ok(Some(admin));
                }
            }
        }
        self.agent_repo.find_fallback_admin(&self.pool).await
    }
}
