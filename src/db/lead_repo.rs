// src/db/lead_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::leads::{Lead, NewLead},
};

// Repositório de leads. Os métodos recebem um executor genérico para
// poderem compor transações na camada de serviço (`&pool` ou `&mut *tx`).
#[derive(Clone)]
pub struct LeadRepository;

impl LeadRepository {
    pub fn new() -> Self {
        Self
    }

    /// Insere um lead recém-chegado, já pontuado pelo intake
    pub async fn insert<'e, E>(&self, executor: E, new_lead: &NewLead) -> Result<Lead, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lead = sqlx::query_as::<_, Lead>(
            r#"
            INSERT INTO crm_leads (
                first_name, last_name, phone_number, email, language,
                lead_source, lead_source_detail, page_type, page_slug, referrer,
                budget_range, location_preference, property_type, property_purpose,
                bedrooms_desired, sea_view_importance, timeframe, message,
                questions_answered, intake_complete,
                initial_lead_score, current_lead_score, lead_segment, lead_priority,
                claim_window_expires_at, is_night_held, scheduled_release_at
            )
            VALUES (
                $1, $2, $3, $4, $5,
                $6, $7, $8, $9, $10,
                $11, $12, $13, $14,
                $15, $16, $17, $18,
                $19, $20,
                $21, $22, $23, $24,
                $25, $26, $27
            )
            RETURNING *
            "#,
        )
        .bind(&new_lead.first_name)
        .bind(&new_lead.last_name)
        .bind(&new_lead.phone_number)
        .bind(&new_lead.email)
        .bind(&new_lead.language)
        .bind(&new_lead.lead_source)
        .bind(&new_lead.lead_source_detail)
        .bind(&new_lead.page_type)
        .bind(&new_lead.page_slug)
        .bind(&new_lead.referrer)
        .bind(&new_lead.budget_range)
        .bind(&new_lead.location_preference)
        .bind(&new_lead.property_type)
        .bind(&new_lead.property_purpose)
        .bind(&new_lead.bedrooms_desired)
        .bind(&new_lead.sea_view_importance)
        .bind(&new_lead.timeframe)
        .bind(&new_lead.message)
        .bind(new_lead.questions_answered)
        .bind(new_lead.intake_complete)
        .bind(new_lead.score)
        .bind(new_lead.score)
        .bind(new_lead.segment)
        .bind(new_lead.priority)
        .bind(new_lead.claim_window_expires_at)
        .bind(new_lead.is_night_held)
        .bind(new_lead.scheduled_release_at)
        .fetch_one(executor)
        .await?;

        Ok(lead)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, lead_id: Uuid) -> Result<Option<Lead>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lead = sqlx::query_as::<_, Lead>("SELECT * FROM crm_leads WHERE id = $1")
            .bind(lead_id)
            .fetch_optional(executor)
            .await?;

        Ok(lead)
    }

    /// Leads com janela de claim vencida, do mais antigo para o mais novo.
    /// Leads em retenção noturna ficam fora até o release.
    pub async fn find_expired_unclaimed<'e, E>(
        &self,
        executor: E,
        limit: i64,
    ) -> Result<Vec<Lead>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let leads = sqlx::query_as::<_, Lead>(
            r#"
            SELECT * FROM crm_leads
            WHERE lead_claimed = FALSE
              AND archived = FALSE
              AND is_night_held = FALSE
              AND claim_window_expires_at < NOW()
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(executor)
        .await?;

        Ok(leads)
    }

    /// O portão atômico da escalação: só avança a rodada se o lead ainda
    /// estiver reivindicável. Zero linhas = um agente chegou antes (ou o
    /// lead foi arquivado); o chamador deve pular o lead.
    pub async fn advance_round<'e, E>(&self, executor: E, lead_id: Uuid) -> Result<Option<Lead>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lead = sqlx::query_as::<_, Lead>(
            r#"
            UPDATE crm_leads
            SET current_round = current_round + 1,
                round_broadcast_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
              AND lead_claimed = FALSE
              AND archived = FALSE
            RETURNING *
            "#,
        )
        .bind(lead_id)
        .fetch_optional(executor)
        .await?;

        Ok(lead)
    }

    pub async fn set_claim_window<'e, E>(
        &self,
        executor: E,
        lead_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "UPDATE crm_leads SET claim_window_expires_at = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(lead_id)
        .bind(expires_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Atribuição terminal ao admin quando as rodadas se esgotam
    pub async fn assign_admin_fallback<'e, E>(
        &self,
        executor: E,
        lead_id: Uuid,
        admin_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE crm_leads
            SET assigned_agent_id = $2,
                assigned_at = NOW(),
                assignment_method = 'admin_fallback',
                lead_claimed = TRUE,
                claimed_by = 'Unclaimed - Admin Fallback',
                claim_window_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1
              AND lead_claimed = FALSE
              AND archived = FALSE
            "#,
        )
        .bind(lead_id)
        .bind(admin_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Claim condicional pelo agente. Mesma disputa de linha que o
    /// advance_round: exatamente um dos dois vence.
    pub async fn try_claim<'e, E>(
        &self,
        executor: E,
        lead_id: Uuid,
        agent_id: Uuid,
        claimed_by: &str,
    ) -> Result<Option<Lead>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lead = sqlx::query_as::<_, Lead>(
            r#"
            UPDATE crm_leads
            SET lead_claimed = TRUE,
                claimed_by = $3,
                assigned_agent_id = $2,
                assigned_at = NOW(),
                assignment_method = 'claimed',
                claim_window_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1
              AND lead_claimed = FALSE
              AND archived = FALSE
            RETURNING *
            "#,
        )
        .bind(lead_id)
        .bind(agent_id)
        .bind(claimed_by)
        .fetch_optional(executor)
        .await?;

        Ok(lead)
    }

    /// Atribuição instantânea via regra de roteamento (Tier 1 do intake)
    pub async fn assign_via_rule<'e, E>(
        &self,
        executor: E,
        lead_id: Uuid,
        agent_id: Uuid,
        rule_id: Uuid,
        rule_name: &str,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE crm_leads
            SET assigned_agent_id = $2,
                assigned_at = NOW(),
                assignment_method = 'rule_based',
                lead_claimed = TRUE,
                claimed_by = 'Rule: ' || $4,
                routing_rule_id = $3,
                claim_window_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1
              AND lead_claimed = FALSE
            "#,
        )
        .bind(lead_id)
        .bind(agent_id)
        .bind(rule_id)
        .bind(rule_name)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Leads atribuídos sem primeira ação dentro do prazo de SLA.
    /// Fallbacks de admin ficam fora: já são o último recurso.
    pub async fn find_sla_breach_candidates<'e, E>(
        &self,
        executor: E,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Lead>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let leads = sqlx::query_as::<_, Lead>(
            r#"
            SELECT * FROM crm_leads
            WHERE lead_claimed = TRUE
              AND first_action_completed = FALSE
              AND sla_breached = FALSE
              AND archived = FALSE
              AND (assignment_method IS NULL OR assignment_method <> 'admin_fallback')
              AND assigned_at < $1
            ORDER BY assigned_at ASC
            "#,
        )
        .bind(cutoff)
        .fetch_all(executor)
        .await?;

        Ok(leads)
    }

    pub async fn mark_sla_breached<'e, E>(&self, executor: E, lead_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE crm_leads
            SET sla_breached = TRUE,
                breach_timestamp = NOW(),
                updated_at = NOW()
            WHERE id = $1
              AND sla_breached = FALSE
            "#,
        )
        .bind(lead_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Marca a primeira ação concluída; tira o lead das varreduras de SLA
    pub async fn set_first_action_completed<'e, E>(
        &self,
        executor: E,
        lead_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE crm_leads
            SET first_action_completed = TRUE,
                lead_status = CASE
                    WHEN lead_status = 'new' THEN 'contacted'::lead_status
                    ELSE lead_status
                END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(lead_id)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn find_night_held_due<'e, E>(&self, executor: E) -> Result<Vec<Lead>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let leads = sqlx::query_as::<_, Lead>(
            r#"
            SELECT * FROM crm_leads
            WHERE is_night_held = TRUE
              AND lead_claimed = FALSE
              AND archived = FALSE
              AND scheduled_release_at <= NOW()
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(executor)
        .await?;

        Ok(leads)
    }

    /// Libera um lead da retenção noturna e o devolve à rodada 1
    pub async fn release_from_night_hold<'e, E>(
        &self,
        executor: E,
        lead_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE crm_leads
            SET is_night_held = FALSE,
                scheduled_release_at = NULL,
                lead_status = 'new',
                current_round = 1,
                round_broadcast_at = NOW(),
                claim_window_expires_at = $2,
                updated_at = NOW()
            WHERE id = $1
              AND is_night_held = TRUE
              AND lead_claimed = FALSE
            "#,
        )
        .bind(lead_id)
        .bind(expires_at)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Transferência forçada pelo admin. `reset_action_timer` zera o
    /// estado de SLA para o novo agente começar com o relógio limpo.
    pub async fn apply_reassignment<'e, E>(
        &self,
        executor: E,
        lead_id: Uuid,
        to_agent_id: Uuid,
        from_agent_id: Option<Uuid>,
        reason: &str,
        claimed_by: &str,
        reset_action_timer: bool,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE crm_leads
            SET assigned_agent_id = $2,
                previous_agent_id = $3,
                reassignment_count = reassignment_count + 1,
                reassignment_reason = $4,
                reassigned_at = NOW(),
                assigned_at = NOW(),
                assignment_method = 'admin_reassignment',
                lead_claimed = TRUE,
                claimed_by = $5,
                claim_window_expires_at = NULL,
                first_action_completed = CASE WHEN $6 THEN FALSE ELSE first_action_completed END,
                sla_breached = CASE WHEN $6 THEN FALSE ELSE sla_breached END,
                breach_timestamp = CASE WHEN $6 THEN NULL ELSE breach_timestamp END,
                updated_at = NOW()
            WHERE id = $1
              AND archived = FALSE
            "#,
        )
        .bind(lead_id)
        .bind(to_agent_id)
        .bind(from_agent_id)
        .bind(reason)
        .bind(claimed_by)
        .bind(reset_action_timer)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}
