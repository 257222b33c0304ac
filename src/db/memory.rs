// src/db/memory.rs

// Planilha em memória para os testes dos repositórios e serviços.
// Imita o comportamento da API: aba inexistente responde 400, linhas
// curtas não são completadas, `clear_row` deixa a linha vazia.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::{common::error::AppError, db::sheets::SheetStore};

#[derive(Debug, Clone, PartialEq)]
pub enum SheetCall {
    Append { sheet: String, row: Vec<String> },
    Update { sheet: String, row_index: usize, column: usize, values: Vec<String> },
    Clear { sheet: String, row_index: usize },
    AddSheet { title: String },
}

#[derive(Default)]
struct Inner {
    sheets: BTreeMap<String, Vec<Vec<String>>>,
    calls: Vec<SheetCall>,
    fail_updates: bool,
}

#[derive(Clone, Default)]
pub struct InMemorySheets {
    inner: Arc<Mutex<Inner>>,
}

impl InMemorySheets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(self, name: &str, rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect();
        self.inner.lock().unwrap().sheets.insert(name.to_string(), rows);
        self
    }

    pub fn rows(&self, name: &str) -> Vec<Vec<String>> {
        self.inner.lock().unwrap().sheets.get(name).cloned().unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<SheetCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn writes_to(&self, name: &str) -> Vec<SheetCall> {
        self.calls()
            .into_iter()
            .filter(|c| match c {
                SheetCall::Append { sheet, .. }
                | SheetCall::Update { sheet, .. }
                | SheetCall::Clear { sheet, .. } => sheet == name,
                SheetCall::AddSheet { .. } => false,
            })
            .collect()
    }

    /// Faz toda chamada de `update_cells` falhar com 503.
    pub fn fail_updates(&self) {
        self.inner.lock().unwrap().fail_updates = true;
    }

    fn missing(sheet: &str) -> AppError {
        AppError::UpstreamError {
            service: "Google Sheets",
            status: 400,
            body: format!("Unable to parse range: {}", sheet),
        }
    }
}

#[async_trait]
impl SheetStore for InMemorySheets {
    async fn read_sheet(&self, sheet: &str) -> Result<Vec<Vec<String>>, AppError> {
        let inner = self.inner.lock().unwrap();
        inner.sheets.get(sheet).cloned().ok_or_else(|| Self::missing(sheet))
    }

    async fn append_row(&self, sheet: &str, row: Vec<String>) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        let rows = inner.sheets.get_mut(sheet).ok_or_else(|| Self::missing(sheet))?;
        // Como a API: entra depois da última linha com conteúdo
        while rows.last().map(|r| r.iter().all(|c| c.is_empty())).unwrap_or(false) {
            rows.pop();
        }
        rows.push(row.clone());
        inner.calls.push(SheetCall::Append { sheet: sheet.to_string(), row });
        Ok(())
    }

    async fn update_cells(
        &self,
        sheet: &str,
        row_index: usize,
        column: usize,
        values: Vec<String>,
    ) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_updates {
            return Err(AppError::UpstreamError {
                service: "Google Sheets",
                status: 503,
                body: "backendError".into(),
            });
        }
        let rows = inner.sheets.get_mut(sheet).ok_or_else(|| Self::missing(sheet))?;
        while rows.len() < row_index {
            rows.push(Vec::new());
        }
        let row = &mut rows[row_index - 1];
        while row.len() < column + values.len() {
            row.push(String::new());
        }
        for (i, value) in values.iter().enumerate() {
            row[column + i] = value.clone();
        }
        inner.calls.push(SheetCall::Update {
            sheet: sheet.to_string(),
            row_index,
            column,
            values,
        });
        Ok(())
    }

    async fn clear_row(&self, sheet: &str, row_index: usize) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        let rows = inner.sheets.get_mut(sheet).ok_or_else(|| Self::missing(sheet))?;
        if let Some(row) = rows.get_mut(row_index - 1) {
            row.iter_mut().for_each(|c| c.clear());
        }
        inner.calls.push(SheetCall::Clear { sheet: sheet.to_string(), row_index });
        Ok(())
    }

    async fn add_sheet(&self, title: &str) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        inner.sheets.entry(title.to_string()).or_default();
        inner.calls.push(SheetCall::AddSheet { title: title.to_string() });
        Ok(())
    }

    async fn list_sheets(&self) -> Result<Vec<String>, AppError> {
        Ok(self.inner.lock().unwrap().sheets.keys().cloned().collect())
    }
}
