// src/handlers/payments.rs

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::payment::{
        CheckPaymentStatusPayload, CreatePixPaymentPayload, PaymentStatusResponse,
        PixPaymentResponse, SavePendingPaymentPayload, SavePendingPaymentResponse,
        UpdatePaymentStatusPayload, WebhookAck, WebhookNotification, WebhookQuery,
    },
    services::payment_service::WebhookHeaders,
};

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

// POST /functions/v1/create-pix-payment
#[utoipa::path(
    post,
    path = "/functions/v1/create-pix-payment",
    tag = "Payments",
    request_body = CreatePixPaymentPayload,
    responses(
        (status = 200, description = "Cobrança PIX criada", body = PixPaymentResponse),
        (status = 400, description = "Dados inválidos"),
        (status = 500, description = "Falha no MercadoPago ou token não configurado")
    )
)]
pub async fn create_pix_payment(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<CreatePixPaymentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let response = app_state
        .payment_service
        .create_pix_payment(&payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(response)))
}

// POST /functions/v1/save-pending-payment
#[utoipa::path(
    post,
    path = "/functions/v1/save-pending-payment",
    tag = "Payments",
    request_body = SavePendingPaymentPayload,
    responses(
        (status = 201, description = "Pagamento registrado na aba pagamentos", body = SavePendingPaymentResponse),
        (status = 400, description = "Dados inválidos")
    )
)]
pub async fn save_pending_payment(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<SavePendingPaymentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let payment = app_state
        .payment_service
        .save_pending_payment(&payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((
        StatusCode::CREATED,
        Json(SavePendingPaymentResponse { success: true, payment }),
    ))
}

// POST /functions/v1/check-payment-status
#[utoipa::path(
    post,
    path = "/functions/v1/check-payment-status",
    tag = "Payments",
    request_body = CheckPaymentStatusPayload,
    responses(
        (status = 200, description = "Status no gateway; planilha atualizada se definitivo", body = PaymentStatusResponse),
        (status = 404, description = "Pagamento não encontrado no gateway")
    )
)]
pub async fn check_payment_status(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<CheckPaymentStatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let response = app_state
        .payment_service
        .check_payment_status(payload.payment_id.trim())
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(response)))
}

// POST /functions/v1/update-payment-status (secretaria)
#[utoipa::path(
    post,
    path = "/functions/v1/update-payment-status",
    tag = "Payments",
    request_body = UpdatePaymentStatusPayload,
    responses(
        (status = 200, description = "Status gravado", body = PaymentStatusResponse),
        (status = 400, description = "Status desconhecido"),
        (status = 404, description = "Pagamento não está na planilha")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn update_payment_status(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<UpdatePaymentStatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let response = app_state
        .payment_service
        .update_payment_status(&payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(response)))
}

// POST /functions/v1/mercadopago-webhook
#[utoipa::path(
    post,
    path = "/functions/v1/mercadopago-webhook",
    tag = "Payments",
    params(WebhookQuery),
    request_body = WebhookNotification,
    responses(
        (status = 200, description = "Notificação recebida", body = WebhookAck),
        (status = 400, description = "Notificação sem id de pagamento"),
        (status = 401, description = "Assinatura inválida")
    )
)]
pub async fn mercadopago_webhook(
    State(app_state): State<AppState>,
    locale: Locale,
    headers: HeaderMap,
    Query(query): Query<WebhookQuery>,
    body: Option<Json<WebhookNotification>>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(mut notification) = body.unwrap_or_default();
    if notification.kind.is_none() {
        notification.kind = query.kind.clone();
    }

    let webhook_headers = WebhookHeaders {
        signature: header_text(&headers, "x-signature"),
        request_id: header_text(&headers, "x-request-id"),
    };

    let ack = app_state
        .payment_service
        .handle_webhook(&notification, query.payment_id(), &webhook_headers)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(ack)))
}
