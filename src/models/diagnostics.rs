// src/models/diagnostics.rs

use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

// Raio-X de uma aba: o que o serviço enxerga no cabeçalho
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SheetDiagnostics {
    #[schema(example = "dados pessoais")]
    pub sheet: String,
    pub exists: bool,
    pub header: Vec<String>,
    /// chave -> letra da coluna (ex.: "cpf" -> "D")
    pub columns: BTreeMap<String, String>,
    pub missing_required: Vec<String>,
    pub unmapped_headers: Vec<String>,
    pub data_rows: usize,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DebugSheetsResponse {
    pub success: bool,
    pub service_account: Option<String>,
    pub sheets: Vec<SheetDiagnostics>,
}
