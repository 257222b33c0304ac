// src/common/error.rs

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::{common::i18n::I18nStore, middleware::i18n::Locale};

// Erro interno da aplicação. Os handlers convertem para `ApiError`
// (já traduzido) com `to_api_error`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Requisição inválida: {0}")]
    BadRequest(String),

    #[error("Credenciais não configuradas: {0}")]
    CredentialsNotConfigured(&'static str),

    #[error("token request failed with status {status}")]
    TokenRequestFailed { status: u16, body: String },

    #[error("{service} respondeu com status {status}: {body}")]
    UpstreamError {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Falha de comunicação HTTP: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("A aba '{sheet}' não possui a coluna obrigatória '{header}'")]
    MissingSheetHeader { sheet: String, header: &'static str },

    #[error("Aluno não encontrado")]
    StudentNotFound,

    #[error("Pagamento não encontrado")]
    PaymentNotFound,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("CPF já cadastrado")]
    CpfAlreadyRegistered,

    #[error("Usuário ou e-mail já existe")]
    UserAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Usuário inativo")]
    InactiveUser,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Sessão expirada")]
    SessionExpired,

    #[error("Assinatura do webhook inválida")]
    InvalidWebhookSignature,

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

// O erro que sai pela API: status + mensagem já traduzida.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "success": false, "error": self.error, "details": details }),
            None => json!({ "success": false, "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    // Status HTTP e chave de tradução de cada variante
    fn status_and_key(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "validation.invalid_fields"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "request.bad_request"),
            AppError::CredentialsNotConfigured(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "config.credentials_not_configured")
            }
            AppError::TokenRequestFailed { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "google.token_request_failed")
            }
            AppError::UpstreamError { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "upstream.failed"),
            AppError::HttpError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "upstream.unreachable"),
            AppError::MissingSheetHeader { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "sheets.missing_header")
            }
            AppError::StudentNotFound => (StatusCode::NOT_FOUND, "students.not_found"),
            AppError::PaymentNotFound => (StatusCode::NOT_FOUND, "payments.not_found"),
            AppError::UserNotFound => (StatusCode::NOT_FOUND, "users.not_found"),
            AppError::CpfAlreadyRegistered => (StatusCode::CONFLICT, "students.cpf_already_registered"),
            AppError::UserAlreadyExists => (StatusCode::CONFLICT, "users.already_exists"),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "auth.invalid_credentials"),
            AppError::InactiveUser => (StatusCode::FORBIDDEN, "auth.inactive_user"),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "auth.invalid_token"),
            AppError::SessionExpired => (StatusCode::UNAUTHORIZED, "auth.session_expired"),
            AppError::InvalidWebhookSignature => {
                (StatusCode::UNAUTHORIZED, "payments.invalid_webhook_signature")
            }
            AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal.unexpected"),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status_and_key().0
    }

    /// Converte o erro interno na resposta da API, no idioma do cliente.
    pub fn to_api_error(self, locale: &Locale, store: &I18nStore) -> ApiError {
        let (status, key) = self.status_and_key();
        let lang = locale.0.as_str();

        if status.is_server_error() {
            // A mensagem completa (com o corpo do upstream) só vai para o log
            tracing::error!("Erro Interno do Servidor: {}", self);
        }

        match self {
            AppError::ValidationError(errors) => {
                let mut details = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                ApiError {
                    status,
                    error: store.message(lang, key),
                    details: Some(json!(details)),
                }
            }
            AppError::BadRequest(detail) => ApiError {
                status,
                error: store.format(lang, key, &[("detail", detail)]),
                details: None,
            },
            AppError::CredentialsNotConfigured(what) => ApiError {
                status,
                error: store.format(lang, key, &[("what", what.to_string())]),
                details: None,
            },
            AppError::TokenRequestFailed { status: upstream, .. } => ApiError {
                status,
                error: store.format(lang, key, &[("status", upstream.to_string())]),
                details: None,
            },
            AppError::UpstreamError { service, status: upstream, .. } => ApiError {
                status,
                error: store.format(
                    lang,
                    key,
                    &[("service", service.to_string()), ("status", upstream.to_string())],
                ),
                details: None,
            },
            AppError::MissingSheetHeader { sheet, header } => ApiError {
                status,
                error: store.format(lang, key, &[("sheet", sheet), ("header", header.to_string())]),
                details: None,
            },
            _ => ApiError {
                status,
                error: store.message(lang, key),
                details: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt() -> Locale {
        Locale("pt".to_string())
    }

    #[test]
    fn token_failure_embeds_upstream_status() {
        let store = I18nStore::new();
        let err = AppError::TokenRequestFailed { status: 401, body: "denied".into() };
        let api = err.to_api_error(&Locale("en".into()), &store);

        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.error, "token request failed with status 401");
    }

    #[test]
    fn missing_header_names_sheet_and_column() {
        let store = I18nStore::new();
        let err = AppError::MissingSheetHeader { sheet: "matriculas".into(), header: "CPF" };
        let api = err.to_api_error(&pt(), &store);

        assert!(api.error.contains("matriculas"));
        assert!(api.error.contains("CPF"));
    }

    #[test]
    fn not_found_and_conflict_statuses() {
        assert_eq!(AppError::StudentNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::PaymentNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::CpfAlreadyRegistered.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
    }
}
