// src/config.rs

use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{env, time::Duration};

use crate::{
    db::{
        ActivityRepository, AgentRepository, LeadRepository, NotificationRepository,
        SettingsRepository,
    },
    services::{
        assignment_service::AssignmentService, auth::AuthService,
        escalation_service::EscalationService, intake_service::IntakeService,
        notification_service::NotificationService, release_service::ReleaseService,
        sla_service::SlaService,
    },
};

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_secret: String,

    pub auth_service: AuthService,
    pub intake_service: IntakeService,
    pub escalation_service: EscalationService,
    pub sla_service: SlaService,
    pub release_service: ReleaseService,
    pub assignment_service: AssignmentService,

    pub lead_repo: LeadRepository,
    pub agent_repo: AgentRepository,
    pub activity_repo: ActivityRepository,
    pub notification_repo: NotificationRepository,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");
        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET deve ser definido");
        // Endpoint externo de e-mail/push; sem ele o despacho vira no-op logado
        let dispatch_url = env::var("NOTIFY_DISPATCH_URL").ok();

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let lead_repo = LeadRepository::new();
        let agent_repo = AgentRepository::new();
        let activity_repo = ActivityRepository::new();
        let notification_repo = NotificationRepository::new(db_pool.clone());
        let settings_repo = SettingsRepository::new(db_pool.clone());

        let notifier = NotificationService::new(notification_repo.clone(), dispatch_url);

        let auth_service = AuthService::new(agent_repo.clone(), db_pool.clone(), jwt_secret.clone());
        let intake_service = IntakeService::new(
            db_pool.clone(),
            lead_repo.clone(),
            agent_repo.clone(),
            activity_repo.clone(),
            settings_repo.clone(),
            notifier.clone(),
        );
        let escalation_service = EscalationService::new(
            db_pool.clone(),
            lead_repo.clone(),
            agent_repo.clone(),
            activity_repo.clone(),
            settings_repo.clone(),
            notifier.clone(),
        );
        let sla_service = SlaService::new(
            db_pool.clone(),
            lead_repo.clone(),
            agent_repo.clone(),
            activity_repo.clone(),
            settings_repo.clone(),
            notifier.clone(),
        );
        let release_service = ReleaseService::new(
            db_pool.clone(),
            lead_repo.clone(),
            agent_repo.clone(),
            activity_repo.clone(),
            settings_repo.clone(),
            notifier.clone(),
        );
        let assignment_service = AssignmentService::new(
            db_pool.clone(),
            lead_repo.clone(),
            agent_repo.clone(),
            activity_repo.clone(),
            notification_repo.clone(),
            notifier,
        );

        Ok(Self {
            db_pool,
            jwt_secret,
            auth_service,
            intake_service,
            escalation_service,
            sla_service,
            release_service,
            assignment_service,
            lead_repo,
            agent_repo,
            activity_repo,
            notification_repo,
        })
    }
}
