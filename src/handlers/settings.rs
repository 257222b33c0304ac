// src/handlers/settings.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::settings::{EnvConfigStatus, UpdateEnvConfigPayload},
};

// GET /functions/v1/update-env-config
#[utoipa::path(
    get,
    path = "/functions/v1/update-env-config",
    tag = "Settings",
    responses(
        (status = 200, description = "Variáveis configuradas (segredos mascarados)", body = EnvConfigStatus),
        (status = 401, description = "Não autorizado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_env_config(State(app_state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(app_state.config_service.status()))
}

// POST /functions/v1/update-env-config
#[utoipa::path(
    post,
    path = "/functions/v1/update-env-config",
    tag = "Settings",
    request_body = UpdateEnvConfigPayload,
    responses(
        (status = 200, description = "Valores trocados em tempo de execução", body = EnvConfigStatus),
        (status = 401, description = "Não autorizado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn update_env_config(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Json(payload): Json<UpdateEnvConfigPayload>,
) -> impl IntoResponse {
    tracing::info!("🔧 '{}' alterou a configuração", session.user.username);
    (StatusCode::OK, Json(app_state.config_service.update(payload)))
}
