// src/handlers/students.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::{
        payment::{SaveBookOrderPayload, SaveBookOrderResponse},
        student::{SavePersonalDataPayload, SavePersonalDataResponse},
    },
};

// POST /functions/v1/save-student-personal-data (público: formulário do aluno)
#[utoipa::path(
    post,
    path = "/functions/v1/save-student-personal-data",
    tag = "Students",
    request_body = SavePersonalDataPayload,
    responses(
        (status = 201, description = "Cadastro gravado com status Pendente", body = SavePersonalDataResponse),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "CPF já cadastrado")
    )
)]
pub async fn save_student_personal_data(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<SavePersonalDataPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let response = app_state
        .student_service
        .save_personal_data(&payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(response)))
}

// POST /functions/v1/save-book-order
#[utoipa::path(
    post,
    path = "/functions/v1/save-book-order",
    tag = "Students",
    request_body = SaveBookOrderPayload,
    responses(
        (status = 201, description = "Pedido de livro registrado", body = SaveBookOrderResponse),
        (status = 400, description = "Dados inválidos")
    )
)]
pub async fn save_book_order(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<SaveBookOrderPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let order = app_state
        .student_service
        .save_book_order(&payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((
        StatusCode::CREATED,
        Json(SaveBookOrderResponse { success: true, order }),
    ))
}
