// src/services/mercadopago.rs

//! Cliente do MercadoPago (API de pagamentos v1).
//!
//! `PaymentGateway` é a fronteira usada pelo `PaymentService`; os testes do
//! serviço usam um gateway roteirizado em vez da API real.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;

use crate::{common::error::AppError, config::RuntimeSettings};

pub const MERCADOPAGO_API_BASE: &str = "https://api.mercadopago.com";
const SERVICE_NAME: &str = "MercadoPago";

// --- Cobrança PIX enviada ao gateway ---

#[derive(Debug, Clone, Serialize)]
pub struct PixCharge {
    pub transaction_amount: Decimal,
    pub description: String,
    pub payment_method_id: &'static str,
    pub external_reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_url: Option<String>,
    pub payer: Payer,
}

#[derive(Debug, Clone, Serialize)]
pub struct Payer {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub identification: Identification,
}

#[derive(Debug, Clone, Serialize)]
pub struct Identification {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub number: String,
}

impl PixCharge {
    pub fn new(
        amount: Decimal,
        description: String,
        external_reference: String,
        notification_url: Option<String>,
        email: &str,
        nome: &str,
        cpf: &str,
    ) -> Self {
        let nome = nome.trim();
        let (first_name, last_name) = nome.split_once(' ').unwrap_or((nome, ""));
        Self {
            transaction_amount: amount.round_dp(2),
            description,
            payment_method_id: "pix",
            external_reference,
            notification_url,
            payer: Payer {
                email: email.trim().to_string(),
                first_name: first_name.to_string(),
                last_name: last_name.trim().to_string(),
                identification: Identification {
                    kind: "CPF",
                    number: cpf.to_string(),
                },
            },
        }
    }
}

// --- Pagamento devolvido pelo gateway ---

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GatewayPayment {
    pub id: String,
    pub status: String,
    pub status_detail: Option<String>,
    pub external_reference: Option<String>,
    pub transaction_amount: Option<Decimal>,
    pub date_approved: Option<String>,
    pub date_of_expiration: Option<String>,
    pub qr_code: Option<String>,
    pub qr_code_base64: Option<String>,
    pub ticket_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPayment {
    id: Value,
    status: String,
    #[serde(default)]
    status_detail: Option<String>,
    #[serde(default)]
    external_reference: Option<String>,
    #[serde(default)]
    transaction_amount: Option<Decimal>,
    #[serde(default)]
    date_approved: Option<String>,
    #[serde(default)]
    date_of_expiration: Option<String>,
    #[serde(default)]
    point_of_interaction: Option<PointOfInteraction>,
}

#[derive(Debug, Deserialize)]
struct PointOfInteraction {
    #[serde(default)]
    transaction_data: Option<TransactionData>,
}

#[derive(Debug, Deserialize)]
struct TransactionData {
    #[serde(default)]
    qr_code: Option<String>,
    #[serde(default)]
    qr_code_base64: Option<String>,
    #[serde(default)]
    ticket_url: Option<String>,
}

impl From<RawPayment> for GatewayPayment {
    fn from(raw: RawPayment) -> Self {
        let id = match raw.id {
            Value::String(s) => s,
            other => other.to_string(),
        };
        let data = raw.point_of_interaction.and_then(|p| p.transaction_data);
        let (qr_code, qr_code_base64, ticket_url) = match data {
            Some(d) => (d.qr_code, d.qr_code_base64, d.ticket_url),
            None => (None, None, None),
        };
        Self {
            id,
            status: raw.status,
            status_detail: raw.status_detail,
            external_reference: raw.external_reference,
            transaction_amount: raw.transaction_amount,
            date_approved: raw.date_approved,
            date_of_expiration: raw.date_of_expiration,
            qr_code,
            qr_code_base64,
            ticket_url,
        }
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_pix_payment(
        &self,
        charge: &PixCharge,
        idempotency_key: &str,
    ) -> Result<GatewayPayment, AppError>;

    async fn get_payment(&self, payment_id: &str) -> Result<GatewayPayment, AppError>;
}

#[derive(Clone)]
pub struct MercadoPagoClient {
    http_client: reqwest::Client,
    base_url: String,
    runtime: RuntimeSettings,
}

impl MercadoPagoClient {
    pub fn new(http_client: reqwest::Client, runtime: RuntimeSettings) -> Self {
        Self {
            http_client,
            base_url: MERCADOPAGO_API_BASE.to_string(),
            runtime,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn access_token(&self) -> Result<String, AppError> {
        self.runtime
            .snapshot()
            .mercadopago_access_token
            .ok_or(AppError::CredentialsNotConfigured("MERCADOPAGO_ACCESS_TOKEN"))
    }

    async fn read_payment(response: reqwest::Response) -> Result<GatewayPayment, AppError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("❌ MercadoPago respondeu {}", status.as_u16());
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(AppError::PaymentNotFound);
            }
            return Err(AppError::UpstreamError {
                service: SERVICE_NAME,
                status: status.as_u16(),
                body,
            });
        }
        let raw: RawPayment = response.json().await?;
        Ok(raw.into())
    }
}

#[async_trait]
impl PaymentGateway for MercadoPagoClient {
    async fn create_pix_payment(
        &self,
        charge: &PixCharge,
        idempotency_key: &str,
    ) -> Result<GatewayPayment, AppError> {
        let token = self.access_token()?;
        let response = self
            .http_client
            .post(format!("{}/v1/payments", self.base_url))
            .bearer_auth(token)
            .header("X-Idempotency-Key", idempotency_key)
            .json(charge)
            .send()
            .await?;
        Self::read_payment(response).await
    }

    async fn get_payment(&self, payment_id: &str) -> Result<GatewayPayment, AppError> {
        let token = self.access_token()?;
        let response = self
            .http_client
            .get(format!(
                "{}/v1/payments/{}",
                self.base_url,
                urlencoding::encode(payment_id.trim())
            ))
            .bearer_auth(token)
            .send()
            .await?;
        Self::read_payment(response).await
    }
}

/// Confere o cabeçalho `x-signature` (`ts=...,v1=...`) de uma notificação.
///
/// O HMAC-SHA256 é calculado sobre `id:<id>;request-id:<x-request-id>;ts:<ts>;`,
/// omitindo as partes que não vieram na requisição.
pub fn verify_webhook_signature(
    secret: &str,
    signature_header: &str,
    request_id: Option<&str>,
    data_id: Option<&str>,
) -> bool {
    let mut ts = None;
    let mut v1 = None;
    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("ts", value)) => ts = Some(value.trim()),
            Some(("v1", value)) => v1 = Some(value.trim()),
            _ => {}
        }
    }
    let (Some(ts), Some(v1)) = (ts, v1) else {
        return false;
    };
    let Ok(expected) = hex::decode(v1) else {
        return false;
    };

    let mut manifest = String::new();
    if let Some(id) = data_id.filter(|id| !id.is_empty()) {
        manifest.push_str(&format!("id:{};", id.to_lowercase()));
    }
    if let Some(request_id) = request_id.filter(|r| !r.is_empty()) {
        manifest.push_str(&format!("request-id:{};", request_id));
    }
    manifest.push_str(&format!("ts:{};", ts));

    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(manifest.as_bytes());
    mac.verify_slice(&expected).is_ok()
}
