// src/models/settings.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnvVarStatus {
    #[schema(example = "MERCADOPAGO_ACCESS_TOKEN")]
    pub name: String,
    pub configured: bool,
    /// Valor mascarado (segredos) ou completo (identificadores)
    #[schema(example = "APP_***4321")]
    pub preview: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnvConfigStatus {
    pub success: bool,
    pub variables: Vec<EnvVarStatus>,
}

// Valores que podem ser trocados sem reiniciar o serviço
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEnvConfigPayload {
    #[serde(default, alias = "GOOGLE_SHEETS_SPREADSHEET_ID")]
    pub google_sheets_spreadsheet_id: Option<String>,

    #[serde(default, alias = "MERCADOPAGO_ACCESS_TOKEN")]
    pub mercadopago_access_token: Option<String>,

    #[serde(default, alias = "MERCADOPAGO_WEBHOOK_SECRET")]
    pub mercadopago_webhook_secret: Option<String>,
}
