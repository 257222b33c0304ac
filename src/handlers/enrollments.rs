// src/handlers/enrollments.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::{
        enrollment::{
            EnrollmentListResponse, EnrollmentQuery, FinalizeEnrollmentPayload,
            FinalizeEnrollmentResponse, ReconcilePayload, ReconcileReport,
        },
        student::PendingStudentsResponse,
    },
};

// GET|POST /functions/v1/get-pending-enrollments (alias get-pending-students)
#[utoipa::path(
    post,
    path = "/functions/v1/get-pending-enrollments",
    tag = "Enrollments",
    responses(
        (status = 200, description = "Cadastros ainda sem matrícula", body = PendingStudentsResponse),
        (status = 401, description = "Não autorizado"),
        (status = 500, description = "Falha ao ler a planilha")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_pending_enrollments(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let students = app_state
        .enrollment_service
        .pending_students()
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((
        StatusCode::OK,
        Json(PendingStudentsResponse {
            success: true,
            total: students.len(),
            students,
        }),
    ))
}

// POST /functions/v1/finalize-enrollment
#[utoipa::path(
    post,
    path = "/functions/v1/finalize-enrollment",
    tag = "Enrollments",
    request_body = FinalizeEnrollmentPayload,
    responses(
        (status = 200, description = "Matrícula efetivada", body = FinalizeEnrollmentResponse),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Aluno não encontrado"),
        (status = 500, description = "Falha na planilha")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn finalize_enrollment(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<FinalizeEnrollmentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let response = app_state
        .enrollment_service
        .finalize(&payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(response)))
}

// GET|POST /functions/v1/get-enrollments?cpf=&ciclo=&status=
#[utoipa::path(
    get,
    path = "/functions/v1/get-enrollments",
    tag = "Enrollments",
    params(EnrollmentQuery),
    responses(
        (status = 200, description = "Matrículas registradas", body = EnrollmentListResponse),
        (status = 401, description = "Não autorizado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_enrollments(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<EnrollmentQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let enrollments = app_state
        .enrollment_service
        .list_enrollments(&query)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((
        StatusCode::OK,
        Json(EnrollmentListResponse {
            success: true,
            total: enrollments.len(),
            enrollments,
        }),
    ))
}

// POST /functions/v1/reconcile-enrollments
#[utoipa::path(
    post,
    path = "/functions/v1/reconcile-enrollments",
    tag = "Enrollments",
    request_body(content = ReconcilePayload, description = "Corpo opcional; dryRun só relata"),
    responses(
        (status = 200, description = "Status reparados e matrículas duplicadas", body = ReconcileReport),
        (status = 401, description = "Não autorizado")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn reconcile_enrollments(
    State(app_state): State<AppState>,
    locale: Locale,
    payload: Option<Json<ReconcilePayload>>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.unwrap_or_default();

    let report = app_state
        .enrollment_service
        .reconcile(payload.dry_run)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(report)))
}
