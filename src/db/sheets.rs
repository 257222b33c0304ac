// src/db/sheets.rs

//! O "banco de dados" do sistema: as abas de uma planilha Google.
//!
//! `SheetStore` é a fronteira usada pelos repositórios. A implementação real
//! (`GoogleSheetsClient`) fala com a API v4 do Sheets; os testes usam uma
//! planilha em memória.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    common::{error::AppError, sheet_table::column_letter},
    config::RuntimeSettings,
    google::ServiceAccountAuth,
};

pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SERVICE_NAME: &str = "Google Sheets";

#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Todos os valores da aba, cabeçalho incluído, como texto.
    async fn read_sheet(&self, sheet: &str) -> Result<Vec<Vec<String>>, AppError>;

    /// Acrescenta uma linha depois da última linha preenchida.
    async fn append_row(&self, sheet: &str, row: Vec<String>) -> Result<(), AppError>;

    /// Sobrescreve células da linha `row_index` (1-based) a partir da coluna `column` (0-based).
    async fn update_cells(
        &self,
        sheet: &str,
        row_index: usize,
        column: usize,
        values: Vec<String>,
    ) -> Result<(), AppError>;

    /// Limpa o conteúdo da linha inteira (a linha continua existindo).
    async fn clear_row(&self, sheet: &str, row_index: usize) -> Result<(), AppError>;

    async fn add_sheet(&self, title: &str) -> Result<(), AppError>;

    async fn list_sheets(&self) -> Result<Vec<String>, AppError>;
}

/// Nome da aba entre aspas simples, como a notação A1 exige para nomes com espaço.
pub fn quote_sheet(sheet: &str) -> String {
    format!("'{}'", sheet.replace('\'', "''"))
}

pub fn cell_range(sheet: &str, row_index: usize, column: usize, width: usize) -> String {
    let start = format!("{}{}", column_letter(column), row_index);
    if width <= 1 {
        format!("{}!{}", quote_sheet(sheet), start)
    } else {
        let end = format!("{}{}", column_letter(column + width - 1), row_index);
        format!("{}!{}:{}", quote_sheet(sheet), start, end)
    }
}

fn cell_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetInfo {
    #[serde(default)]
    sheets: Vec<SheetInfo>,
}

#[derive(Debug, Deserialize)]
struct SheetInfo {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Clone)]
pub struct GoogleSheetsClient {
    auth: ServiceAccountAuth,
    http_client: reqwest::Client,
    base_url: String,
    runtime: RuntimeSettings,
}

impl GoogleSheetsClient {
    pub fn new(auth: ServiceAccountAuth, http_client: reqwest::Client, runtime: RuntimeSettings) -> Self {
        Self {
            auth,
            http_client,
            base_url: SHEETS_API_BASE.to_string(),
            runtime,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    // O ID pode ser trocado em tempo de execução (update-env-config)
    fn spreadsheet_url(&self) -> Result<String, AppError> {
        let id = self
            .runtime
            .snapshot()
            .spreadsheet_id
            .ok_or(AppError::CredentialsNotConfigured("GOOGLE_SHEETS_SPREADSHEET_ID"))?;
        Ok(format!("{}/{}", self.base_url, id))
    }

    fn values_url(&self, range: &str) -> Result<String, AppError> {
        Ok(format!("{}/values/{}", self.spreadsheet_url()?, urlencoding::encode(range)))
    }

    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response, AppError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.auth.invalidate().await;
        }
        let body = response.text().await.unwrap_or_default();
        tracing::warn!("❌ Google Sheets respondeu {}: {}", status.as_u16(), body);
        Err(AppError::UpstreamError {
            service: SERVICE_NAME,
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl SheetStore for GoogleSheetsClient {
    async fn read_sheet(&self, sheet: &str) -> Result<Vec<Vec<String>>, AppError> {
        let url = self.values_url(&quote_sheet(sheet))?;
        let token = self.auth.access_token().await?;

        let response = self
            .http_client
            .get(url)
            .bearer_auth(token)
            .query(&[("majorDimension", "ROWS")])
            .send()
            .await?;
        let range: ValueRange = self.check(response).await?.json().await?;

        tracing::debug!("📄 Aba '{}' lida: {} linhas", sheet, range.values.len());
        Ok(range
            .values
            .iter()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect())
    }

    async fn append_row(&self, sheet: &str, row: Vec<String>) -> Result<(), AppError> {
        let url = format!("{}:append", self.values_url(&format!("{}!A1", quote_sheet(sheet)))?);
        let token = self.auth.access_token().await?;

        // RAW: CPF com zero à esquerda continua texto
        let response = self
            .http_client
            .post(url)
            .bearer_auth(token)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&json!({ "majorDimension": "ROWS", "values": [row] }))
            .send()
            .await?;
        self.check(response).await?;

        tracing::debug!("➕ Linha adicionada na aba '{}'", sheet);
        Ok(())
    }

    async fn update_cells(
        &self,
        sheet: &str,
        row_index: usize,
        column: usize,
        values: Vec<String>,
    ) -> Result<(), AppError> {
        let range = cell_range(sheet, row_index, column, values.len());
        let url = self.values_url(&range)?;
        let token = self.auth.access_token().await?;

        let response = self
            .http_client
            .put(url)
            .bearer_auth(token)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "range": range, "majorDimension": "ROWS", "values": [values] }))
            .send()
            .await?;
        self.check(response).await?;

        tracing::debug!("✏️ Células atualizadas em {}", range);
        Ok(())
    }

    async fn clear_row(&self, sheet: &str, row_index: usize) -> Result<(), AppError> {
        let range = format!("{}!{}:{}", quote_sheet(sheet), row_index, row_index);
        let url = format!("{}:clear", self.values_url(&range)?);
        let token = self.auth.access_token().await?;

        let response = self
            .http_client
            .post(url)
            .bearer_auth(token)
            .json(&json!({}))
            .send()
            .await?;
        self.check(response).await?;
        Ok(())
    }

    async fn add_sheet(&self, title: &str) -> Result<(), AppError> {
        let url = format!("{}:batchUpdate", self.spreadsheet_url()?);
        let token = self.auth.access_token().await?;

        let response = self
            .http_client
            .post(url)
            .bearer_auth(token)
            .json(&json!({
                "requests": [{ "addSheet": { "properties": { "title": title } } }]
            }))
            .send()
            .await?;
        self.check(response).await?;

        tracing::info!("🆕 Aba '{}' criada na planilha", title);
        Ok(())
    }

    async fn list_sheets(&self) -> Result<Vec<String>, AppError> {
        let url = self.spreadsheet_url()?;
        let token = self.auth.access_token().await?;

        let response = self
            .http_client
            .get(url)
            .bearer_auth(token)
            .query(&[("fields", "sheets.properties.title")])
            .send()
            .await?;
        let info: SpreadsheetInfo = self.check(response).await?.json().await?;

        Ok(info.sheets.into_iter().map(|s| s.properties.title).collect())
    }
}
