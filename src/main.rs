//src/main.rs

use axum::{
    Router,
    middleware as axum_middleware,
    routing::{get, post},
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::middleware::auth::{admin_guard, auth_guard};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).compact().init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    // Roda as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Rotas públicas: login e o formulário/chatbot do site
    let auth_routes = Router::new().route("/login", post(handlers::auth::login));

    let public_lead_routes = Router::new().route("/", post(handlers::leads::register_lead));

    let user_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Rotas do agente logado: claim, auditoria e notificações
    let crm_routes = Router::new()
        .route("/leads/{id}", get(handlers::leads::get_lead))
        .route("/leads/{id}/claim", post(handlers::leads::claim_lead))
        .route(
            "/leads/{id}/activities",
            post(handlers::activities::log_activity).get(handlers::activities::list_activities),
        )
        .route("/notifications", get(handlers::notifications::list_notifications))
        .route(
            "/notifications/{id}/read",
            post(handlers::notifications::mark_notification_read),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Rotas restritas ao admin: transferência forçada e cadastro de agentes
    let admin_routes = Router::new()
        .route("/leads/{id}/reassign", post(handlers::leads::reassign_lead))
        .route(
            "/agents",
            post(handlers::agents::create_agent).get(handlers::agents::list_agents),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            admin_guard,
        ));

    // Jobs periódicos: o agendador externo (e os botões do painel admin)
    // chamam estes handlers
    let job_routes = Router::new()
        .route("/check-claim-windows", post(handlers::jobs::check_claim_windows))
        .route("/check-sla-breaches", post(handlers::jobs::check_sla_breaches))
        .route("/release-night-held", post(handlers::jobs::release_night_held))
        .route("/reconcile-lead-counts", post(handlers::jobs::reconcile_lead_counts))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            admin_guard,
        ));

    // Combina tudo no router principal
    let app = Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/leads", public_lead_routes)
        .nest("/api/crm", crm_routes)
        .nest("/api/crm/admin", admin_routes)
        .nest("/api/jobs", job_routes)
        .with_state(app_state);

    // Inicia o servidor
    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}
