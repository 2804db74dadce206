// src/db/notification_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::notifications::{NewNotification, Notification},
};

#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, notification: &NewNotification) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO crm_notifications (
                agent_id, lead_id, notification_type, title, message, action_url
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(notification.agent_id)
        .bind(notification.lead_id)
        .bind(notification.notification_type)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.action_url)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fan-out de um broadcast: uma notificação por agente elegível
    pub async fn insert_batch(&self, notifications: &[NewNotification]) -> Result<(), AppError> {
        for notification in notifications {
            self.insert(notification).await?;
        }
        Ok(())
    }

    /// Notificações do agente, não lidas primeiro
    pub async fn list_for_agent(&self, agent_id: Uuid) -> Result<Vec<Notification>, AppError> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM crm_notifications
            WHERE agent_id = $1
            ORDER BY read ASC, created_at DESC
            LIMIT 100
            "#,
        )
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    pub async fn mark_read(&self, id: Uuid, agent_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE crm_notifications
            SET read = TRUE, read_at = NOW()
            WHERE id = $1
              AND agent_id = $2
              AND read = FALSE
            "#,
        )
        .bind(id)
        .bind(agent_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Marca como lidas as notificações pendentes de um agente sobre um
    /// lead. Usado quando o lead sai das mãos dele (claim de outro,
    /// transferência forçada).
    pub async fn mark_lead_read_for_agent(&self, lead_id: Uuid, agent_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE crm_notifications
            SET read = TRUE, read_at = NOW()
            WHERE lead_id = $1
              AND agent_id = $2
              AND read = FALSE
            "#,
        )
        .bind(lead_id)
        .bind(agent_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
