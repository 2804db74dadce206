// src/db/activity_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::activities::{Activity, ActivityType},
};

// Trilha de auditoria. Executor genérico porque o registro de atividade
// e a marcação de primeira ação no lead acontecem na mesma transação.
#[derive(Clone)]
pub struct ActivityRepository;

impl ActivityRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        lead_id: Uuid,
        agent_id: Option<Uuid>,
        activity_type: ActivityType,
        notes: &str,
    ) -> Result<Activity, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let activity = sqlx::query_as::<_, Activity>(
            r#"
            INSERT INTO crm_activities (lead_id, agent_id, activity_type, notes)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(lead_id)
        .bind(agent_id)
        .bind(activity_type)
        .bind(notes)
        .fetch_one(executor)
        .await?;

        Ok(activity)
    }

    pub async fn list_for_lead<'e, E>(&self, executor: E, lead_id: Uuid) -> Result<Vec<Activity>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let activities = sqlx::query_as::<_, Activity>(
            "SELECT * FROM crm_activities WHERE lead_id = $1 ORDER BY created_at ASC",
        )
        .bind(lead_id)
        .fetch_all(executor)
        .await?;

        Ok(activities)
    }
}
