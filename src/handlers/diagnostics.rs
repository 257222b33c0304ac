// src/handlers/diagnostics.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    common::error::ApiError, config::AppState, middleware::i18n::Locale,
    models::diagnostics::DebugSheetsResponse,
};

// GET|POST /functions/v1/debug-sheets
#[utoipa::path(
    get,
    path = "/functions/v1/debug-sheets",
    tag = "Diagnostics",
    responses(
        (status = 200, description = "Cabeçalhos e colunas reconhecidas de cada aba", body = DebugSheetsResponse),
        (status = 401, description = "Não autorizado"),
        (status = 500, description = "Planilha inacessível")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn debug_sheets(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let report = app_state
        .diagnostics_service
        .debug_sheets()
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(report)))
}
