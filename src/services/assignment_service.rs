// src/services/assignment_service.rs

use serde::Serialize;
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ActivityRepository, AgentRepository, LeadRepository, NotificationRepository},
    models::{
        activities::ActivityType,
        agents::Agent,
        leads::{Lead, ReassignReason},
    },
    services::notification_service::NotificationService,
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReassignResult {
    pub success: bool,
    pub message: String,
    pub lead_id: Uuid,
    pub from_agent: String,
    pub to_agent: String,
    pub reason: ReassignReason,
    pub timer_reset: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileSummary {
    pub success: bool,
    pub corrected_agents: u64,
}

// Claim pelo agente e transferência forçada pelo admin. Os dois caminhos
// mudam lead e contador de capacidade na mesma transação.
#[derive(Clone)]
pub struct AssignmentService {
    pool: PgPool,
    lead_repo: LeadRepository,
    agent_repo: AgentRepository,
    activity_repo: ActivityRepository,
    notification_repo: NotificationRepository,
    notifier: NotificationService,
}

impl AssignmentService {
    pub fn new(
        pool: PgPool,
        lead_repo: LeadRepository,
        agent_repo: AgentRepository,
        activity_repo: ActivityRepository,
        notification_repo: NotificationRepository,
        notifier: NotificationService,
    ) -> Self {
        Self {
            pool,
            lead_repo,
            agent_repo,
            activity_repo,
            notification_repo,
            notifier,
        }
    }

    /// O lado do agente na corrida claim-vs-escalação. O UPDATE
    /// condicional garante que exatamente um vencedor existe; a guarda de
    /// capacidade desfaz tudo se o agente já estiver cheio.
    pub async fn claim_lead(&self, lead_id: Uuid, agent: &Agent) -> Result<Lead, AppError> {
        let mut tx = self.pool.begin().await?;

        let claimed = self
            .lead_repo
            .try_claim(&mut *tx, lead_id, agent.id, &agent.full_name())
            .await?;
        let Some(lead) = claimed else {
            drop(tx);
            // Distingue "não existe" de "perdeu a corrida" para a resposta
            return match self.lead_repo.find_by_id(&self.pool, lead_id).await? {
                Some(_) => Err(AppError::LeadAlreadyClaimed),
                None => Err(AppError::LeadNotFound),
            };
        };

        let incremented = self.agent_repo.increment_lead_count_guarded(&mut *tx, agent.id).await?;
        if incremented == 0 {
            // Rollback implícito no drop da transação
            return Err(AppError::AgentAtCapacity);
        }

        tx.commit().await?;
        tracing::info!("✋ Lead {} reivindicado por {}", lead.id, agent.full_name());

        // Limpa os convites pendentes do agente para este lead
        self.notification_repo.mark_lead_read_for_agent(lead.id, agent.id).await?;

        self.activity_repo
            .insert(
                &self.pool,
                lead.id,
                Some(agent.id),
                ActivityType::Note,
                &format!("Lead claimed by {}", agent.full_name()),
            )
            .await?;

        Ok(lead)
    }

    /// Transferência forçada pelo admin: ignora o motor de regras e
    /// reatribui direto, com auditoria completa.
    pub async fn reassign_lead(
        &self,
        lead_id: Uuid,
        to_agent_id: Uuid,
        reason: ReassignReason,
        notes: Option<&str>,
        reassigned_by: &Agent,
    ) -> Result<ReassignResult, AppError> {
        let lead = self
            .lead_repo
            .find_by_id(&self.pool, lead_id)
            .await?
            .ok_or(AppError::LeadNotFound)?;

        let to_agent = self
            .agent_repo
            .find_by_id(&self.pool, to_agent_id)
            .await?
            .ok_or(AppError::AgentNotFound)?;

        let from_agent_id = lead.assigned_agent_id;
        let from_agent_name = match from_agent_id {
            Some(id) => self
                .agent_repo
                .find_by_id(&self.pool, id)
                .await?
                .map(|a| a.full_name())
                .unwrap_or_else(|| "Unknown".to_string()),
            None => "Unassigned".to_string(),
        };

        let mut tx = self.pool.begin().await?;

        let updated = self
            .lead_repo
            .apply_reassignment(
                &mut *tx,
                lead.id,
                to_agent.id,
                from_agent_id,
                reason.as_str(),
                &to_agent.full_name(),
                reason.resets_action_timer(),
            )
            .await?;
        if updated == 0 {
            return Err(AppError::LeadNotFound);
        }

        if let Some(from_id) = from_agent_id {
            self.agent_repo.decrement_lead_count(&mut *tx, from_id).await?;
        }
        self.agent_repo.increment_lead_count(&mut *tx, to_agent.id).await?;

        tx.commit().await?;

        tracing::info!(
            "🔄 Lead {} transferido de {} para {} ({})",
            lead.id,
            from_agent_name,
            to_agent.full_name(),
            reason.as_str()
        );

        // O agente antigo não precisa mais ver os convites deste lead
        if let Some(from_id) = from_agent_id {
            self.notification_repo.mark_lead_read_for_agent(lead.id, from_id).await?;
        }

        self.notifier
            .notify_reassigned(&lead, &to_agent, &from_agent_name, reason)
            .await?;

        let mut audit = format!(
            "Lead reassigned from {} to {}. Reason: {}",
            from_agent_name,
            to_agent.full_name(),
            reason.description()
        );
        if let Some(notes) = notes {
            audit.push_str(". Admin notes: ");
            audit.push_str(notes);
        }
        self.activity_repo
            .insert(&self.pool, lead.id, Some(to_agent.id), ActivityType::Note, &audit)
            .await?;

        tracing::info!(
            "[reassign-lead] {} concluiu a transferência do lead {}",
            reassigned_by.full_name(),
            lead.id
        );

        Ok(ReassignResult {
            success: true,
            message: format!("Lead reassigned to {}", to_agent.full_name()),
            lead_id: lead.id,
            from_agent: from_agent_name,
            to_agent: to_agent.full_name(),
            reason,
            timer_reset: reason.resets_action_timer(),
        })
    }

    /// Recontagem dos contadores de capacidade a partir dos leads ativos.
    /// Mantém a deriva do contador desnormalizado dentro de um ciclo.
    pub async fn reconcile_lead_counts(&self) -> Result<ReconcileSummary, AppError> {
        let corrected = self.agent_repo.reconcile_lead_counts(&self.pool).await?;
        if corrected > 0 {
            tracing::warn!("♻️ {} agentes com contador de leads divergente, corrigidos", corrected);
        }
        Ok(ReconcileSummary {
            success: true,
            corrected_agents: corrected,
        })
    }

    /// Registra uma atividade e, quando for contato real, marca a
    /// primeira ação na mesma transação — isso tira o lead das varreduras
    /// de SLA dali em diante.
    pub async fn log_activity(
        &self,
        lead_id: Uuid,
        agent: &Agent,
        activity_type: ActivityType,
        notes: &str,
    ) -> Result<crate::models::activities::Activity, AppError> {
        let lead = self
            .lead_repo
            .find_by_id(&self.pool, lead_id)
            .await?
            .ok_or(AppError::LeadNotFound)?;

        let mut tx = self.pool.begin().await?;
        let activity = self
            .activity_repo
            .insert(&mut *tx, lead.id, Some(agent.id), activity_type, notes)
            .await?;

        if activity_type.completes_first_action() && !lead.first_action_completed {
            self.lead_repo.set_first_action_completed(&mut *tx, lead.id).await?;
        }
        tx.commit().await?;

        Ok(activity)
    }
}
