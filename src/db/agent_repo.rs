// src/db/agent_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::agents::{Agent, AgentRole},
};

// Repositório de agentes. Executor genérico pelo mesmo motivo do
// LeadRepository: claim e fallback mexem em leads e agentes na mesma
// transação.
#[derive(Clone)]
pub struct AgentRepository;

impl AgentRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Agent>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let agent = sqlx::query_as::<_, Agent>("SELECT * FROM crm_agents WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(agent)
    }

    pub async fn find_by_email<'e, E>(&self, executor: E, email: &str) -> Result<Option<Agent>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let agent = sqlx::query_as::<_, Agent>("SELECT * FROM crm_agents WHERE email = $1")
            .bind(email)
            .fetch_optional(executor)
            .await?;

        Ok(agent)
    }

    pub async fn list_all<'e, E>(&self, executor: E) -> Result<Vec<Agent>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let agents = sqlx::query_as::<_, Agent>(
            "SELECT * FROM crm_agents ORDER BY first_name ASC, last_name ASC",
        )
        .fetch_all(executor)
        .await?;

        Ok(agents)
    }

    /// Agentes elegíveis para broadcast: falam o idioma do lead, estão
    /// ativos e aceitando leads novos. Capacidade é filtrada depois, em
    /// memória, porque o notificador precisa saber que o conjunto era
    /// não-vazio mesmo quando todos estão cheios.
    pub async fn find_eligible_by_language<'e, E>(
        &self,
        executor: E,
        language: &str,
    ) -> Result<Vec<Agent>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let agents = sqlx::query_as::<_, Agent>(
            r#"
            SELECT * FROM crm_agents
            WHERE $1 = ANY(languages)
              AND is_active = TRUE
              AND accepts_new_leads = TRUE
            ORDER BY created_at ASC
            "#,
        )
        .bind(language)
        .fetch_all(executor)
        .await?;

        Ok(agents)
    }

    /// Mesma elegibilidade, mas restrita aos ids de uma rodada configurada
    pub async fn find_eligible_by_ids<'e, E>(
        &self,
        executor: E,
        ids: &[Uuid],
    ) -> Result<Vec<Agent>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let agents = sqlx::query_as::<_, Agent>(
            r#"
            SELECT * FROM crm_agents
            WHERE id = ANY($1)
              AND is_active = TRUE
              AND accepts_new_leads = TRUE
            ORDER BY created_at ASC
            "#,
        )
        .bind(ids)
        .fetch_all(executor)
        .await?;

        Ok(agents)
    }

    pub async fn find_fallback_admin<'e, E>(&self, executor: E) -> Result<Option<Agent>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let admin = sqlx::query_as::<_, Agent>(
            r#"
            SELECT * FROM crm_agents
            WHERE role = 'admin'
              AND is_active = TRUE
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(executor)
        .await?;

        Ok(admin)
    }

    pub async fn increment_lead_count<'e, E>(&self, executor: E, agent_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE crm_agents
            SET current_lead_count = current_lead_count + 1,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(agent_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Incremento com guarda de capacidade, usado no claim: zero linhas
    /// significa agente cheio e o chamador desfaz a transação
    pub async fn increment_lead_count_guarded<'e, E>(
        &self,
        executor: E,
        agent_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE crm_agents
            SET current_lead_count = current_lead_count + 1,
                updated_at = NOW()
            WHERE id = $1
              AND current_lead_count < max_active_leads
            "#,
        )
        .bind(agent_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn decrement_lead_count<'e, E>(&self, executor: E, agent_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE crm_agents
            SET current_lead_count = GREATEST(current_lead_count - 1, 0),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(agent_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Recontagem completa: o contador desnormalizado volta a bater com
    /// os leads ativos de cada agente. Retorna quantos estavam errados.
    pub async fn reconcile_lead_counts<'e, E>(&self, executor: E) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE crm_agents a
            SET current_lead_count = sub.cnt,
                updated_at = NOW()
            FROM (
                SELECT ag.id, COUNT(l.id)::int AS cnt
                FROM crm_agents ag
                LEFT JOIN crm_leads l
                  ON l.assigned_agent_id = ag.id
                 AND l.archived = FALSE
                GROUP BY ag.id
            ) sub
            WHERE sub.id = a.id
              AND a.current_lead_count <> sub.cnt
            "#,
        )
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        email: &str,
        password_hash: &str,
        first_name: &str,
        last_name: &str,
        role: AgentRole,
        languages: &[String],
        max_active_leads: i32,
    ) -> Result<Agent, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Agent>(
            r#"
            INSERT INTO crm_agents (
                email, password_hash, first_name, last_name, role, languages, max_active_leads
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(first_name)
        .bind(last_name)
        .bind(role)
        .bind(languages)
        .bind(max_active_leads)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            // Converte erro de violação de chave única em um erro mais amigável
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::EmailAlreadyExists;
                }
            }
            e.into()
        })
    }
}
