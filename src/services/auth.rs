// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::AgentRepository,
    models::{
        agents::{Agent, AgentRole},
        auth::Claims,
    },
};

#[derive(Clone)]
pub struct AuthService {
    agent_repo: AgentRepository,
    pool: PgPool,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(agent_repo: AgentRepository, pool: PgPool, jwt_secret: String) -> Self {
        Self {
            agent_repo,
            pool,
            jwt_secret,
        }
    }

    pub async fn login_agent(&self, email: &str, password: &str) -> Result<String, AppError> {
        let agent = self
            .agent_repo
            .find_by_email(&self.pool, email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !agent.is_active {
            return Err(AppError::InvalidCredentials);
        }

        let password_clone = password.to_owned();
        let password_hash_clone = agent.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || {
            verify(&password_clone, &password_hash_clone)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        self.create_token(agent.id)
    }

    pub async fn validate_token(&self, token: &str) -> Result<Agent, AppError> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|_| AppError::InvalidToken)?;

        self.agent_repo
            .find_by_id(&self.pool, token_data.claims.sub)
            .await?
            .filter(|agent| agent.is_active)
            .ok_or(AppError::InvalidToken)
    }

    /// Cadastro de agente feito pelo admin
    pub async fn create_agent(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
        role: AgentRole,
        languages: &[String],
        max_active_leads: i32,
    ) -> Result<Agent, AppError> {
        let password_clone = password.to_owned();
        let hashed_password =
            tokio::task::spawn_blocking(move || hash(&password_clone, bcrypt::DEFAULT_COST))
                .await
                .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        let agent = self
            .agent_repo
            .create(
                &self.pool,
                email,
                &hashed_password,
                first_name,
                last_name,
                role,
                languages,
                max_active_leads,
            )
            .await?;

        tracing::info!("👤 Agente {} criado ({:?})", agent.email, agent.role);
        Ok(agent)
    }

    fn create_token(&self, agent_id: Uuid) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(7);

        let claims = Claims {
            sub: agent_id,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}
