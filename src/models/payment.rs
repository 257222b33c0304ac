// src/models/payment.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::common::cpf::{normalize_cpf, validate_cpf};

// --- Status do MercadoPago ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    InProcess,
    Authorized,
    InMediation,
    Approved,
    Rejected,
    Cancelled,
    Refunded,
    ChargedBack,
    Unknown,
}

impl PaymentStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "pending" => Self::Pending,
            "in_process" => Self::InProcess,
            "authorized" => Self::Authorized,
            "in_mediation" => Self::InMediation,
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            "cancelled" => Self::Cancelled,
            "refunded" => Self::Refunded,
            "charged_back" => Self::ChargedBack,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProcess => "in_process",
            Self::Authorized => "authorized",
            Self::InMediation => "in_mediation",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
            Self::ChargedBack => "charged_back",
            Self::Unknown => "unknown",
        }
    }

    /// Status definitivo: vale gravar na planilha
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            Self::Approved | Self::Rejected | Self::Cancelled | Self::Refunded | Self::ChargedBack
        )
    }
}

// --- Referência externa: "<cpf>_<livro>_<ciclo>" ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalReference {
    pub cpf: String,
    pub livro: String,
    pub ciclo: String,
}

impl ExternalReference {
    pub fn new(cpf: &str, livro: &str, ciclo: &str) -> Self {
        // Sublinhado é o separador; dentro dos campos vira espaço
        Self {
            cpf: normalize_cpf(cpf),
            livro: livro.trim().replace('_', " "),
            ciclo: ciclo.trim().replace('_', " "),
        }
    }

    pub fn encode(&self) -> String {
        format!("{}_{}_{}", self.cpf, self.livro, self.ciclo)
    }

    /// CPF até o primeiro `_`, ciclo depois do último, livro no meio.
    pub fn parse(raw: &str) -> Option<Self> {
        let (cpf, rest) = raw.split_once('_')?;
        let (livro, ciclo) = rest.rsplit_once('_')?;
        if cpf.is_empty() || livro.is_empty() || ciclo.is_empty() {
            return None;
        }
        Some(Self {
            cpf: normalize_cpf(cpf),
            livro: livro.to_string(),
            ciclo: ciclo.to_string(),
        })
    }
}

fn validate_positive(value: &Decimal) -> Result<(), ValidationError> {
    if *value > Decimal::ZERO {
        Ok(())
    } else {
        let mut err = ValidationError::new("valor");
        err.message = Some("O valor deve ser maior que zero.".into());
        Err(err)
    }
}

// --- Registros das planilhas ---

// Uma linha da aba "pedidos"
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookOrderRecord {
    pub row_index: usize,
    pub data: String,
    #[schema(example = "61767735120")]
    pub cpf: String,
    pub nome: String,
    pub email: String,
    pub telefone: String,
    #[schema(example = "Livro 3 - Teologia Sistemática")]
    pub livro: String,
    #[schema(example = "Ciclo 2025")]
    pub ciclo: String,
    #[schema(example = "45.00")]
    pub valor: String,
    #[schema(example = "pix")]
    pub forma_pagamento: String,
    pub payment_id: String,
    #[schema(example = "pendente")]
    pub status: String,
}

// Uma linha da aba "pagamentos"
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingPaymentRecord {
    pub row_index: usize,
    pub data: String,
    #[schema(example = "1319876543")]
    pub payment_id: String,
    pub cpf: String,
    pub nome: String,
    pub email: String,
    pub livro: String,
    pub ciclo: String,
    #[schema(example = "45.00")]
    pub valor: String,
    #[schema(example = "pending")]
    pub status: String,
    pub external_reference: String,
    pub ticket_url: String,
    pub qr_code: String,
    pub qr_code_base64: String,
    pub data_confirmacao: String,
}

// --- Payloads ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveBookOrderPayload {
    #[validate(custom(function = "validate_cpf"))]
    #[schema(example = "617.677.351-20")]
    pub cpf: String,

    #[validate(length(min = 3, message = "O nome deve ter no mínimo 3 caracteres."))]
    pub nome: String,

    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,

    #[serde(default)]
    pub telefone: Option<String>,

    #[validate(length(min = 1, message = "O livro é obrigatório."))]
    #[schema(example = "Livro 3 - Teologia Sistemática")]
    pub livro: String,

    #[validate(length(min = 1, message = "O ciclo é obrigatório."))]
    #[schema(example = "Ciclo 2025")]
    pub ciclo: String,

    #[validate(custom(function = "validate_positive"))]
    #[schema(value_type = f64, example = 45.0)]
    pub valor: Decimal,

    #[serde(default)]
    #[schema(example = "pix")]
    pub forma_pagamento: Option<String>,

    #[serde(default)]
    pub payment_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePixPaymentPayload {
    #[validate(custom(function = "validate_cpf"))]
    #[schema(example = "617.677.351-20")]
    pub cpf: String,

    #[validate(length(min = 3, message = "O nome deve ter no mínimo 3 caracteres."))]
    #[schema(example = "Ana Paula Souza")]
    pub nome: String,

    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,

    #[serde(default)]
    pub telefone: Option<String>,

    #[validate(length(min = 1, message = "O livro é obrigatório."))]
    pub livro: String,

    #[validate(length(min = 1, message = "O ciclo é obrigatório."))]
    pub ciclo: String,

    #[validate(custom(function = "validate_positive"))]
    #[schema(value_type = f64, example = 45.0)]
    pub valor: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PixPaymentResponse {
    pub success: bool,
    #[schema(example = "1319876543")]
    pub payment_id: String,
    #[schema(example = "pending")]
    pub status: String,
    pub external_reference: String,
    pub ticket_url: Option<String>,
    /// PIX copia-e-cola
    pub qr_code: Option<String>,
    /// PNG em base64
    pub qr_code_base64: Option<String>,
    pub expires_at: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SavePendingPaymentPayload {
    #[validate(length(min = 1, message = "O ID do pagamento é obrigatório."))]
    pub payment_id: String,
    #[serde(default)]
    #[validate(custom(function = "validate_cpf"))]
    pub cpf: Option<String>,
    #[serde(default)]
    pub nome: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub livro: Option<String>,
    #[serde(default)]
    pub ciclo: Option<String>,
    #[schema(value_type = f64, example = 45.0)]
    #[validate(custom(function = "validate_positive"))]
    pub valor: Decimal,
    #[serde(default)]
    pub external_reference: Option<String>,
    #[serde(default)]
    pub ticket_url: Option<String>,
    #[serde(default)]
    pub qr_code: Option<String>,
    #[serde(default)]
    pub qr_code_base64: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckPaymentStatusPayload {
    #[validate(length(min = 1, message = "O ID do pagamento é obrigatório."))]
    #[schema(example = "1319876543")]
    pub payment_id: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentStatusPayload {
    #[validate(length(min = 1, message = "O ID do pagamento é obrigatório."))]
    pub payment_id: String,
    #[validate(length(min = 1, message = "O status é obrigatório."))]
    #[schema(example = "approved")]
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusResponse {
    pub success: bool,
    pub payment_id: String,
    #[schema(example = "approved")]
    pub status: String,
    pub status_detail: Option<String>,
    /// Se a linha da aba "pagamentos" foi atualizada nesta chamada
    pub sheet_updated: bool,
    pub confirmed_at: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SaveBookOrderResponse {
    pub success: bool,
    pub order: BookOrderRecord,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SavePendingPaymentResponse {
    pub success: bool,
    pub payment: PendingPaymentRecord,
}

// Resposta ao webhook: sempre 200 para o gateway não reenviar
#[derive(Debug, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub success: bool,
    pub payment_id: Option<String>,
    pub status: Option<String>,
    pub sheet_updated: bool,
}

// Id que pode vir na query string: ?data.id=123 ou ?id=123
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WebhookQuery {
    #[serde(default, rename = "data.id")]
    pub data_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl WebhookQuery {
    pub fn payment_id(&self) -> Option<String> {
        self.data_id
            .clone()
            .or_else(|| self.id.clone())
            .filter(|id| !id.trim().is_empty())
    }
}

// Notificação enviada pelo MercadoPago
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct WebhookNotification {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub data: Option<WebhookData>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct WebhookData {
    // Vem como texto ou número, dependendo da versão do webhook
    #[schema(value_type = String)]
    pub id: Value,
}

impl WebhookNotification {
    pub fn payment_id(&self) -> Option<String> {
        let id = self.data.as_ref()?;
        match &id.id {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Só notificações de pagamento interessam
    pub fn is_payment(&self) -> bool {
        let kind_ok = self.kind.as_deref().map(|k| k == "payment").unwrap_or(true);
        let action_ok = self
            .action
            .as_deref()
            .map(|a| a.starts_with("payment."))
            .unwrap_or(true);
        kind_ok && action_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn external_reference_survives_underscores_in_fields() {
        let reference = ExternalReference::new("617.677.351-20", "Livro_3 Teologia", "Ciclo_2025");
        let encoded = reference.encode();
        assert_eq!(encoded, "61767735120_Livro 3 Teologia_Ciclo 2025");
        assert_eq!(ExternalReference::parse(&encoded), Some(reference));
    }

    #[test]
    fn external_reference_with_underscore_in_book_name() {
        let parsed = ExternalReference::parse("61767735120_Livro_3_Ciclo 2025").unwrap();
        assert_eq!(parsed.cpf, "61767735120");
        assert_eq!(parsed.livro, "Livro_3");
        assert_eq!(parsed.ciclo, "Ciclo 2025");
    }

    #[test]
    fn malformed_external_reference() {
        assert_eq!(ExternalReference::parse("sem-separador"), None);
        assert_eq!(ExternalReference::parse("61767735120_Livro"), None);
        assert_eq!(ExternalReference::parse("_Livro_Ciclo"), None);
    }

    #[test]
    fn status_classification() {
        assert_eq!(PaymentStatus::parse("APPROVED"), PaymentStatus::Approved);
        assert!(PaymentStatus::parse("approved").is_final());
        assert!(PaymentStatus::parse("rejected").is_final());
        assert!(!PaymentStatus::parse("pending").is_final());
        assert!(!PaymentStatus::parse("in_process").is_final());
        assert_eq!(PaymentStatus::parse("whatever"), PaymentStatus::Unknown);
    }

    #[test]
    fn pending_payment_rejects_non_positive_amount_and_bad_cpf() {
        let zero: SavePendingPaymentPayload =
            serde_json::from_value(json!({ "paymentId": "1", "valor": 0 })).unwrap();
        assert!(zero.validate().unwrap_err().field_errors().contains_key("valor"));

        let negative: SavePendingPaymentPayload =
            serde_json::from_value(json!({ "paymentId": "1", "valor": -500 })).unwrap();
        assert!(negative.validate().is_err());

        let bad_cpf: SavePendingPaymentPayload =
            serde_json::from_value(json!({ "paymentId": "1", "valor": 45, "cpf": "111.111.111-11" })).unwrap();
        assert!(bad_cpf.validate().unwrap_err().field_errors().contains_key("cpf"));

        let ok: SavePendingPaymentPayload =
            serde_json::from_value(json!({ "paymentId": "1", "valor": 45, "cpf": "617.677.351-20" })).unwrap();
        assert!(ok.validate().is_ok());

        let without_cpf: SavePendingPaymentPayload =
            serde_json::from_value(json!({ "paymentId": "1", "valor": 45 })).unwrap();
        assert!(without_cpf.validate().is_ok());
    }

    #[test]
    fn webhook_payment_id_accepts_number_or_text() {
        let n: WebhookNotification =
            serde_json::from_value(json!({ "type": "payment", "data": { "id": 1319876543u64 } })).unwrap();
        assert_eq!(n.payment_id().as_deref(), Some("1319876543"));
        assert!(n.is_payment());

        let s: WebhookNotification =
            serde_json::from_value(json!({ "action": "payment.updated", "data": { "id": "42" } })).unwrap();
        assert_eq!(s.payment_id().as_deref(), Some("42"));
        assert!(s.is_payment());

        let other: WebhookNotification =
            serde_json::from_value(json!({ "type": "merchant_order", "data": { "id": "1" } })).unwrap();
        assert!(!other.is_payment());
    }
}
