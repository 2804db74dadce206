// src/services/escalation_service.rs

use chrono::{Duration, Utc};
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ActivityRepository, AgentRepository, LeadRepository, SettingsRepository},
    models::{activities::ActivityType, leads::Lead},
    services::notification_service::NotificationService,
};

// Quantos leads vencidos um ciclo do monitor processa no máximo
const BATCH_SIZE: i64 = 50;

// Resumo devolvido ao agendador (ou ao botão do admin)
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClaimWindowSummary {
    pub success: bool,
    pub processed: usize,
    pub escalated: usize,
    pub assigned_to_admin: usize,
    // Leads escalados sem nenhum agente com capacidade: ninguém foi
    // notificado e o próximo ciclo reavalia
    pub stalled: usize,
    pub errors: usize,
}

// O que aconteceu com um lead vencido
#[derive(Debug)]
pub enum EscalationOutcome {
    Escalated { new_round: i32, notified: usize },
    AdminFallback { admin_id: Uuid },
    // O lead saiu do conjunto reivindicável entre a varredura e o update
    // condicional (um agente venceu a corrida, ou foi arquivado)
    Skipped,
    // Rodadas esgotadas e nenhum admin ativo: estado terminal que exige
    // intervenção manual
    Unassignable,
}

#[derive(Debug, PartialEq)]
pub(crate) enum RoundDecision {
    Escalate,
    AdminFallback,
}

// A regra de decisão do resolver, separada do banco: estourou o máximo
// de rodadas ou não sobrou agente elegível, vai para o admin.
pub(crate) fn decide_round(new_round: i32, max_rounds: i32, no_eligible_agents: bool) -> RoundDecision {
    if new_round > max_rounds || no_eligible_agents {
        RoundDecision::AdminFallback
    } else {
        RoundDecision::Escalate
    }
}

// Monitor de janelas de claim + resolver de escalação. A transição de
// estado (ainda reivindicável?) é sempre um UPDATE condicional no banco,
// nunca um read-then-write da aplicação: é isso que garante que claim e
// escalação nunca vencem os dois.
#[derive(Clone)]
pub struct EscalationService {
    pool: PgPool,
    lead_repo: LeadRepository,
    agent_repo: AgentRepository,
    activity_repo: ActivityRepository,
    settings_repo: SettingsRepository,
    notifier: NotificationService,
}

impl EscalationService {
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

    /// Um ciclo do monitor: varre leads com janela vencida e resolve cada
    /// um dentro da própria fronteira de erro. Um lead problemático nunca
    /// derruba o lote.
    pub async fn run_claim_window_check(&self, triggered_by: &str) -> Result<ClaimWindowSummary, AppError> {
        tracing::info!("[check-claim-windows] Iniciando ciclo (triggered_by={})", triggered_by);

        let expired = self.lead_repo.find_expired_unclaimed(&self.pool, BATCH_SIZE).await?;
        if expired.is_empty() {
            tracing::info!("[check-claim-windows] Nenhuma janela vencida");
            return Ok(ClaimWindowSummary {
                success: true,
                processed: 0,
                escalated: 0,
                assigned_to_admin: 0,
                stalled: 0,
                errors: 0,
            });
        }

        tracing::info!("[check-claim-windows] {} leads com janela vencida", expired.len());

        let mut escalated = 0;
        let mut assigned_to_admin = 0;
        let mut stalled = 0;
        let mut errors = 0;

        for lead in &expired {
            match self.escalate_lead(lead).await {
                Ok(EscalationOutcome::Escalated { new_round, notified }) => {
                    escalated += 1;
                    if notified == 0 {
                        stalled += 1;
                    }
                    tracing::info!(
                        "[check-claim-windows] Lead {} escalado para a rodada {} ({} notificados)",
                        lead.id,
                        new_round,
                        notified
                    );
                }
                Ok(EscalationOutcome::AdminFallback { admin_id }) => {
                    assigned_to_admin += 1;
                    tracing::info!(
                        "[check-claim-windows] Lead {} atribuído ao admin {}",
                        lead.id,
                        admin_id
                    );
                }
                Ok(EscalationOutcome::Skipped) => {
                    tracing::info!(
                        "[check-claim-windows] Lead {} saiu do conjunto (claim concorrente), pulando",
                        lead.id
                    );
                }
                Ok(EscalationOutcome::Unassignable) => {
                    // Já logado como erro dentro do resolver
                    errors += 1;
                }
                Err(e) => {
                    tracing::error!("[check-claim-windows] Erro no lead {}: {}", lead.id, e);
                    errors += 1;
                }
            }
        }

        tracing::info!(
            "[check-claim-windows] Ciclo concluído. Escalados: {}, admin: {}, estagnados: {}, erros: {}",
            escalated,
            assigned_to_admin,
            stalled,
            errors
        );

        Ok(ClaimWindowSummary {
            success: true,
            processed: expired.len(),
            escalated,
            assigned_to_admin,
            stalled,
            errors,
        })
    }

    /// Resolve um único lead vencido: avança a rodada atomicamente e
    /// decide entre nova rodada de broadcast ou fallback para o admin.
    pub async fn escalate_lead(&self, lead: &Lead) -> Result<EscalationOutcome, AppError> {
        let settings = self.settings_repo.escalation_settings().await?;

        let mut tx = self.pool.begin().await?;

        // Portão atômico: se um agente reivindicou nesse meio tempo, o
        // update condicional não encontra a linha e paramos aqui.
        let Some(updated) = self.lead_repo.advance_round(&mut *tx, lead.id).await? else {
            return Ok(EscalationOutcome::Skipped);
        };
        let new_round = updated.current_round;

        // Conjunto elegível da nova rodada: configuração de round-robin
        // se existir, agentes do idioma caso contrário
        let config = self.settings_repo.round_config(&updated.language, new_round).await?;
        let (candidates, window_minutes) = match &config {
            Some(cfg) if !cfg.agent_ids.is_empty() => {
                let agents = self.agent_repo.find_eligible_by_ids(&mut *tx, &cfg.agent_ids).await?;
                (agents, cfg.claim_window_minutes as i64)
            }
            _ => {
                let agents = self
                    .agent_repo
                    .find_eligible_by_language(&mut *tx, &updated.language)
                    .await?;
                (agents, settings.default_claim_window_minutes)
            }
        };

        match decide_round(new_round, settings.max_rounds, candidates.is_empty()) {
            RoundDecision::Escalate => {
                let expires_at = Utc::now() + Duration::minutes(window_minutes);
                self.lead_repo.set_claim_window(&mut *tx, updated.id, expires_at).await?;
                tx.commit().await?;

                // Fan-out pós-commit: o estado já está seguro no banco
                let notified = self
                    .notifier
                    .notify_escalation(&updated, &candidates, new_round, window_minutes)
                    .await?;

                Ok(EscalationOutcome::Escalated { new_round, notified })
            }
            RoundDecision::AdminFallback => {
                let candidate = config.as_ref().and_then(|c| c.fallback_admin_id);
                self.assign_to_admin(tx, &updated, candidate).await
            }
        }
    }

    // Fallback terminal: primeiro o admin configurado para o idioma,
    // depois qualquer admin ativo.
    async fn assign_to_admin(
        &self,
        mut tx: Transaction<'_, Postgres>,
        lead: &Lead,
        candidate: Option<Uuid>,
    ) -> Result<EscalationOutcome, AppError> {
        let candidate = match candidate {
            Some(id) => Some(id),
            None => self.settings_repo.fallback_admin_for_language(&lead.language).await?,
        };

        let admin = match candidate {
            Some(id) => self.agent_repo.find_by_id(&mut *tx, id).await?.filter(|a| a.is_active),
            None => None,
        };
        let admin = match admin {
            Some(a) => Some(a),
            None => self.agent_repo.find_fallback_admin(&mut *tx).await?,
        };

        let Some(admin) = admin else {
            // O incremento de rodada ainda vale: o lead fica vencido e o
            // próximo ciclo tenta o fallback de novo, mas sem admin no
            // cadastro só um operador resolve.
            tx.commit().await?;
            tracing::error!(
                "🔥 [escalation] Nenhum admin ativo para o lead {}; lead segue sem dono",
                lead.id
            );
            return Ok(EscalationOutcome::Unassignable);
        };

        let rounds_attempted = lead.current_round - 1;

        self.lead_repo.assign_admin_fallback(&mut *tx, lead.id, admin.id).await?;
        self.agent_repo.increment_lead_count(&mut *tx, admin.id).await?;
        tx.commit().await?;

        // Notificação urgente + auditoria, em melhor esforço pós-commit
        self.notifier.notify_admin_fallback(lead, &admin, rounds_attempted).await?;
        self.activity_repo
            .insert(
                &self.pool,
                lead.id,
                Some(admin.id),
                ActivityType::Note,
                &format!(
                    "Lead went unclaimed after {} round(s). Auto-assigned to admin for manual handling.",
                    rounds_attempted
                ),
            )
            .await?;

        Ok(EscalationOutcome::AdminFallback { admin_id: admin.id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_in_rotation_until_max_round() {
        assert_eq!(decide_round(2, 3, false), RoundDecision::Escalate);
        assert_eq!(decide_round(3, 3, false), RoundDecision::Escalate);
    }

    #[test]
    fn exhausted_rounds_fall_back_to_admin() {
        // current_round == max na varredura → new_round = max + 1
        assert_eq!(decide_round(4, 3, false), RoundDecision::AdminFallback);
    }

    #[test]
    fn empty_eligible_set_falls_back_early() {
        // Mesmo dentro do limite de rodadas, sem agente elegível não há
        // para quem fazer broadcast
        assert_eq!(decide_round(2, 3, true), RoundDecision::AdminFallback);
    }
}
