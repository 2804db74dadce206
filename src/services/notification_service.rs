// src/services/notification_service.rs

use crate::{
    common::error::AppError,
    db::NotificationRepository,
    models::{
        agents::Agent,
        leads::{Lead, ReassignReason},
        notifications::{AgentContact, DispatchPayload, NewNotification, NotificationType},
    },
};

// Fan-out de notificações: persiste as notificações in-app e dispara o
// despacho externo (e-mail/push) em melhor esforço. Uma falha no
// despacho NUNCA desfaz o que já foi gravado no banco — política de
// no máximo uma tentativa.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    http: reqwest::Client,
    dispatch_url: Option<String>,
}

// Bandeira do idioma para os títulos, como o time de vendas está
// acostumado a ver no painel
fn language_flag(language: &str) -> &'static str {
    match language.to_lowercase().as_str() {
        "fr" => "🇫🇷",
        "fi" => "🇫🇮",
        "pl" => "🇵🇱",
        "en" => "🇬🇧",
        "nl" => "🇳🇱",
        "de" => "🇩🇪",
        "es" => "🇪🇸",
        "sv" => "🇸🇪",
        "da" => "🇩🇰",
        "hu" => "🇭🇺",
        _ => "🌍",
    }
}

// Só agentes com folga de capacidade entram no fan-out
pub(crate) fn with_capacity(agents: &[Agent]) -> Vec<&Agent> {
    agents.iter().filter(|a| a.has_capacity()).collect()
}

impl NotificationService {
    pub fn new(notification_repo: NotificationRepository, dispatch_url: Option<String>) -> Self {
        Self {
            notification_repo,
            http: reqwest::Client::new(),
            dispatch_url,
        }
    }

    /// Broadcast inicial do intake. Retorna quantos agentes foram avisados.
    pub async fn notify_broadcast(
        &self,
        lead: &Lead,
        candidates: &[Agent],
        claim_window_minutes: i64,
    ) -> Result<usize, AppError> {
        let available = with_capacity(candidates);
        if available.is_empty() {
            tracing::warn!(
                "Nenhum agente com capacidade para o broadcast do lead {} ({})",
                lead.id,
                lead.language
            );
            return Ok(0);
        }

        let title = format!(
            "{} New {} Lead Available",
            language_flag(&lead.language),
            lead.language.to_uppercase()
        );
        self.insert_claim_invites(lead, &available, &title).await?;

        self.dispatch(DispatchPayload::Broadcast {
            lead: lead.clone(),
            agents: available.iter().map(|a| AgentContact::from(*a)).collect(),
            claim_window_minutes,
        })
        .await;

        Ok(available.len())
    }

    /// Broadcast de uma rodada escalada. Zero agentes com capacidade é o
    /// "stall" do fluxo: não criamos notificação nenhuma e o chamador
    /// reporta o lead como estagnado no resumo do job.
    pub async fn notify_escalation(
        &self,
        lead: &Lead,
        candidates: &[Agent],
        new_round: i32,
        claim_window_minutes: i64,
    ) -> Result<usize, AppError> {
        let available = with_capacity(candidates);
        if available.is_empty() {
            tracing::warn!(
                "⚠️ Rodada {} do lead {} sem agente com capacidade; lead estagnado até o próximo ciclo",
                new_round,
                lead.id
            );
            return Ok(0);
        }

        let title = format!(
            "{} ROUND {}: {} Lead",
            language_flag(&lead.language),
            new_round,
            lead.language.to_uppercase()
        );
        let message = format!(
            "{} - {} - Escalated from Round {}",
            lead.full_name(),
            lead.lead_segment.as_str(),
            new_round - 1
        );

        let notifications: Vec<NewNotification> = available
            .iter()
            .map(|agent| NewNotification {
                agent_id: agent.id,
                lead_id: lead.id,
                notification_type: NotificationType::NewLeadAvailable,
                title: title.clone(),
                message: message.clone(),
                action_url: format!("/crm/agent/leads/{}/claim", lead.id),
            })
            .collect();
        self.notification_repo.insert_batch(&notifications).await?;

        self.dispatch(DispatchPayload::Escalation {
            lead: lead.clone(),
            agents: available.iter().map(|a| AgentContact::from(*a)).collect(),
            claim_window_minutes,
            current_round: new_round,
        })
        .await;

        Ok(available.len())
    }

    /// Liberação matinal dos leads retidos à noite
    pub async fn notify_morning_release(
        &self,
        lead: &Lead,
        candidates: &[Agent],
        claim_window_minutes: i64,
    ) -> Result<usize, AppError> {
        let available = with_capacity(candidates);
        if available.is_empty() {
            tracing::warn!("Lead {} liberado da retenção noturna sem agentes disponíveis", lead.id);
            return Ok(0);
        }

        let title = format!(
            "{} 🌅 Morning Lead Release: {}",
            language_flag(&lead.language),
            lead.language.to_uppercase()
        );
        self.insert_claim_invites(lead, &available, &title).await?;

        self.dispatch(DispatchPayload::Broadcast {
            lead: lead.clone(),
            agents: available.iter().map(|a| AgentContact::from(*a)).collect(),
            claim_window_minutes,
        })
        .await;

        Ok(available.len())
    }

    /// Notificação urgente do fallback: o admin precisa agir manualmente
    pub async fn notify_admin_fallback(
        &self,
        lead: &Lead,
        admin: &Agent,
        rounds_attempted: i32,
    ) -> Result<(), AppError> {
        self.notification_repo
            .insert(&NewNotification {
                agent_id: admin.id,
                lead_id: lead.id,
                notification_type: NotificationType::AdminFallback,
                title: format!("🚨 UNCLAIMED: {}", lead.full_name()),
                message: format!(
                    "{} lead went unclaimed after {} round(s). Manual action required.",
                    lead.language.to_uppercase(),
                    rounds_attempted
                ),
                action_url: format!("/crm/agent/leads/{}", lead.id),
            })
            .await?;

        self.dispatch(DispatchPayload::AdminFallback {
            lead: lead.clone(),
            admin: AgentContact::from(admin),
            rounds_attempted,
        })
        .await;

        Ok(())
    }

    /// Aviso de SLA estourado: alerta para o admin e lembrete mais suave
    /// para o agente responsável. O lead NÃO muda de mãos.
    pub async fn notify_sla_breach(
        &self,
        lead: &Lead,
        admin: &Agent,
        assigned_agent_name: &str,
        minutes_since_assignment: i64,
        sla_minutes: i64,
    ) -> Result<(), AppError> {
        self.notification_repo
            .insert(&NewNotification {
                agent_id: admin.id,
                lead_id: lead.id,
                notification_type: NotificationType::SlaWarning,
                title: "⚠️ SLA Warning: Lead Not Worked".to_string(),
                message: format!(
                    "{} {} has not been worked by {} after {} minutes. Lead remains assigned to agent.",
                    language_flag(&lead.language),
                    lead.full_name(),
                    assigned_agent_name,
                    minutes_since_assignment
                ),
                action_url: format!("/crm/agent/leads/{}", lead.id),
            })
            .await?;

        if let Some(agent_id) = lead.assigned_agent_id {
            self.notification_repo
                .insert(&NewNotification {
                    agent_id,
                    lead_id: lead.id,
                    notification_type: NotificationType::SlaReminder,
                    title: "⏰ SLA Reminder: Action Required".to_string(),
                    message: format!(
                        "{} You have exceeded the {}-minute first action window for {}. Please take action soon.",
                        language_flag(&lead.language),
                        sla_minutes,
                        lead.full_name()
                    ),
                    action_url: format!("/crm/agent/leads/{}", lead.id),
                })
                .await?;
        }

        self.dispatch(DispatchPayload::SlaWarning {
            lead: lead.clone(),
            admin: AgentContact::from(admin),
            assigned_agent_name: assigned_agent_name.to_string(),
            minutes_since_assignment,
            sla_minutes,
        })
        .await;

        Ok(())
    }

    pub async fn notify_rule_assigned(
        &self,
        lead: &Lead,
        agent: &Agent,
        rule_name: &str,
    ) -> Result<(), AppError> {
        self.notification_repo
            .insert(&NewNotification {
                agent_id: agent.id,
                lead_id: lead.id,
                notification_type: NotificationType::RuleAssigned,
                title: format!("⚡ Lead Auto-Assigned: {}", rule_name),
                message: format!(
                    "{} - {} - {}",
                    lead.full_name(),
                    lead.lead_segment.as_str(),
                    lead.budget_range.as_deref().unwrap_or("Budget TBD")
                ),
                action_url: format!("/crm/agent/leads/{}", lead.id),
            })
            .await?;

        self.dispatch(DispatchPayload::RuleAssigned {
            lead: lead.clone(),
            agent: AgentContact::from(agent),
            rule_name: rule_name.to_string(),
        })
        .await;

        Ok(())
    }

    pub async fn notify_reassigned(
        &self,
        lead: &Lead,
        to_agent: &Agent,
        from_agent_name: &str,
        reason: ReassignReason,
    ) -> Result<(), AppError> {
        self.notification_repo
            .insert(&NewNotification {
                agent_id: to_agent.id,
                lead_id: lead.id,
                notification_type: NotificationType::LeadReassigned,
                title: "🔄 Lead Reassigned to You".to_string(),
                message: format!("Admin reassigned {} to you - {}", lead.full_name(), reason.as_str()),
                action_url: format!("/crm/agent/leads/{}", lead.id),
            })
            .await?;

        self.dispatch(DispatchPayload::Reassigned {
            lead: lead.clone(),
            agent: AgentContact::from(to_agent),
            from_agent_name: from_agent_name.to_string(),
            reason,
        })
        .await;

        Ok(())
    }

    // Convite de claim padrão, compartilhado pelo broadcast do intake e
    // pela liberação matinal
    async fn insert_claim_invites(
        &self,
        lead: &Lead,
        available: &[&Agent],
        title: &str,
    ) -> Result<(), AppError> {
        let message = format!(
            "{} - {} - {}",
            lead.full_name(),
            lead.lead_segment.as_str(),
            lead.budget_range.as_deref().unwrap_or("Budget TBD")
        );

        let notifications: Vec<NewNotification> = available
            .iter()
            .map(|agent| NewNotification {
                agent_id: agent.id,
                lead_id: lead.id,
                notification_type: NotificationType::NewLeadAvailable,
                title: title.to_string(),
                message: message.clone(),
                action_url: format!("/crm/agent/leads/{}/claim", lead.id),
            })
            .collect();

        self.notification_repo.insert_batch(&notifications).await
    }

    /// POST no endpoint externo de despacho. Melhor esforço: falha é
    /// logada e esquecida, o estado no banco já foi gravado.
    async fn dispatch(&self, payload: DispatchPayload) {
        let Some(url) = &self.dispatch_url else {
            tracing::debug!("Despacho externo desativado (NOTIFY_DISPATCH_URL ausente)");
            return;
        };

        match self.http.post(url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!("📨 Despacho '{}' enviado", payload.kind());
            }
            Ok(response) => {
                tracing::error!(
                    "Despacho '{}' recusado pelo endpoint externo: {}",
                    payload.kind(),
                    response.status()
                );
            }
            Err(e) => {
                tracing::error!("Falha no despacho '{}': {}", payload.kind(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::agents::AgentRole;
    use chrono::Utc;
    use uuid::Uuid;

    fn agent(count: i32, max: i32) -> Agent {
        Agent {
            id: Uuid::new_v4(),
            email: "a@b.c".into(),
            password_hash: "x".into(),
            first_name: "Eva".into(),
            last_name: "Berg".into(),
            role: AgentRole::Agent,
            languages: vec!["nl".into()],
            is_active: true,
            accepts_new_leads: true,
            current_lead_count: count,
            max_active_leads: max,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn capacity_filter_drops_full_agents() {
        let agents = vec![agent(2, 10), agent(10, 10), agent(0, 1)];
        let available = with_capacity(&agents);
        assert_eq!(available.len(), 2);
        assert!(available.iter().all(|a| a.has_capacity()));
    }

    #[test]
    fn capacity_filter_can_empty_out() {
        // O cenário de "silent stall": todos na capacidade máxima
        let agents = vec![agent(10, 10), agent(5, 5)];
        assert!(with_capacity(&agents).is_empty());
    }

    #[test]
    fn unknown_language_gets_generic_flag() {
        assert_eq!(language_flag("nl"), "🇳🇱");
        assert_eq!(language_flag("NL"), "🇳🇱");
        assert_eq!(language_flag("xx"), "🌍");
    }
}
