use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

// Nosso tipo de erro central, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Acesso restrito a administradores")]
    AdminOnly,

    #[error("Lead não encontrado")]
    LeadNotFound,

    #[error("Agente não encontrado")]
    AgentNotFound,

    // O claim perdeu a corrida: outro agente (ou a escalação) chegou antes
    #[error("Lead já reivindicado")]
    LeadAlreadyClaimed,

    #[error("Agente sem capacidade para novos leads")]
    AgentAtCapacity,

    #[error("Nenhum administrador ativo para fallback")]
    NoAdminAvailable,

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "E-mail ou senha inválidos."),
            AppError::InvalidToken => {
                (StatusCode::UNAUTHORIZED, "Token de autenticação inválido ou ausente.")
            }
            AppError::AdminOnly => (StatusCode::FORBIDDEN, "Apenas administradores podem fazer isso."),
            AppError::LeadNotFound => (StatusCode::NOT_FOUND, "Lead não encontrado."),
            AppError::AgentNotFound => (StatusCode::NOT_FOUND, "Agente não encontrado."),
            AppError::LeadAlreadyClaimed => {
                (StatusCode::CONFLICT, "Este lead já foi reivindicado por outro agente.")
            }
            AppError::AgentAtCapacity => {
                (StatusCode::CONFLICT, "Agente atingiu o limite de leads ativos.")
            }
            AppError::NoAdminAvailable => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Nenhum administrador ativo disponível para receber o lead.",
            ),
            AppError::EmailAlreadyExists => (StatusCode::CONFLICT, "Este e-mail já está em uso."),

            // Todos os outros erros (DatabaseError, InternalServerError) viram 500.
            // O `tracing` loga a mensagem detalhada que o `thiserror` nos deu.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Ocorreu um erro inesperado.")
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
