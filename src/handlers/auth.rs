// src/handlers/auth.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        auth::{AuthenticatedUser, MaybeAuthenticated},
        i18n::Locale,
    },
    models::secretary::{
        AuthResponse, LoginPayload, LogoutResponse, ManageUsersRequest, ManageUsersResponse,
        MeResponse,
    },
};

// POST /functions/v1/secretary-login
#[utoipa::path(
    post,
    path = "/functions/v1/secretary-login",
    tag = "Secretary",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Login bem-sucedido", body = AuthResponse),
        (status = 401, description = "Usuário ou senha inválidos"),
        (status = 403, description = "Usuário inativo")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let response = app_state
        .auth_service
        .login(payload.username.trim(), &payload.password)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(response)))
}

// POST /functions/v1/secretary-logout
#[utoipa::path(
    post,
    path = "/functions/v1/secretary-logout",
    tag = "Secretary",
    responses(
        (status = 200, description = "Sessão encerrada", body = LogoutResponse),
        (status = 401, description = "Não autorizado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn logout(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
) -> impl IntoResponse {
    app_state.auth_service.logout(&session.sid).await;
    tracing::info!("👋 Logout de '{}'", session.user.username);
    (StatusCode::OK, Json(LogoutResponse { success: true }))
}

// GET /functions/v1/secretary-me
#[utoipa::path(
    get,
    path = "/functions/v1/secretary-me",
    tag = "Secretary",
    responses(
        (status = 200, description = "Usuário da sessão atual", body = MeResponse),
        (status = 401, description = "Não autorizado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_me(AuthenticatedUser(session): AuthenticatedUser) -> Json<MeResponse> {
    Json(MeResponse {
        success: true,
        user: session.user,
    })
}

// POST /functions/v1/manage-secretary-users
#[utoipa::path(
    post,
    path = "/functions/v1/manage-secretary-users",
    tag = "Secretary",
    request_body = ManageUsersRequest,
    responses(
        (status = 200, description = "Resultado da ação", body = ManageUsersResponse),
        (status = 401, description = "Sessão exigida (exceto no primeiro cadastro)"),
        (status = 404, description = "Usuário não encontrado"),
        (status = 409, description = "Usuário ou e-mail já existe")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn manage_users(
    State(app_state): State<AppState>,
    locale: Locale,
    MaybeAuthenticated(session): MaybeAuthenticated,
    Json(request): Json<ManageUsersRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = app_state
        .auth_service
        .manage_users(request, session.as_ref())
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(response)))
}
