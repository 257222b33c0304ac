// src/services/diagnostics_service.rs

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::{
    common::{
        error::AppError,
        sheet_table::{column_letter, header_position, SheetSchema},
    },
    config::SheetNames,
    db::{
        enrollment_repo::ENROLLMENT_SCHEMA, order_repo::BOOK_ORDER_SCHEMA,
        payment_repo::PAYMENT_SCHEMA, student_repo::PERSONAL_DATA_SCHEMA, user_repo::USER_SCHEMA,
        SheetStore,
    },
    models::diagnostics::{DebugSheetsResponse, SheetDiagnostics},
};

/// Compara um cabeçalho com o schema da aba.
pub fn inspect(sheet: &str, schema: &SheetSchema, values: &[Vec<String>]) -> SheetDiagnostics {
    let position = header_position(values);
    let header: Vec<String> = position.map(|p| values[p].clone()).unwrap_or_default();

    let mapped = schema.map_headers(&header);
    let used: HashSet<usize> = mapped.values().copied().collect();

    let columns = mapped
        .iter()
        .map(|(key, idx)| (key.to_string(), column_letter(*idx)))
        .collect::<BTreeMap<_, _>>();

    // Aba vazia recebe o cabeçalho padrão na primeira gravação
    let missing_required = if header.is_empty() {
        Vec::new()
    } else {
        schema
            .required
            .iter()
            .filter(|key| !mapped.contains_key(*key))
            .map(|key| schema.spec(key).map(|c| c.header).unwrap_or(*key).to_string())
            .collect()
    };

    let unmapped_headers = header
        .iter()
        .enumerate()
        .filter(|(idx, h)| !h.trim().is_empty() && !used.contains(idx))
        .map(|(_, h)| h.clone())
        .collect();

    let data_rows = values
        .iter()
        .skip(position.map_or(values.len(), |p| p + 1))
        .filter(|row| row.iter().any(|c| !c.trim().is_empty()))
        .count();

    SheetDiagnostics {
        sheet: sheet.to_string(),
        exists: true,
        header,
        columns,
        missing_required,
        unmapped_headers,
        data_rows,
        error: None,
    }
}

#[derive(Clone)]
pub struct DiagnosticsService {
    store: Arc<dyn SheetStore>,
    names: SheetNames,
    service_account: Option<String>,
}

impl DiagnosticsService {
    pub fn new(store: Arc<dyn SheetStore>, names: SheetNames, service_account: Option<String>) -> Self {
        Self {
            store,
            names,
            service_account,
        }
    }

    fn tabs(&self) -> [(&str, &'static SheetSchema); 5] {
        [
            (self.names.personal_data.as_str(), &PERSONAL_DATA_SCHEMA),
            (self.names.enrollments.as_str(), &ENROLLMENT_SCHEMA),
            (self.names.orders.as_str(), &BOOK_ORDER_SCHEMA),
            (self.names.payments.as_str(), &PAYMENT_SCHEMA),
            (self.names.users.as_str(), &USER_SCHEMA),
        ]
    }

    pub async fn debug_sheets(&self) -> Result<DebugSheetsResponse, AppError> {
        let titles = self.store.list_sheets().await?;
        tracing::debug!("Abas encontradas: {:?}", titles);

        let mut sheets = Vec::new();
        for (name, schema) in self.tabs() {
            if !titles.iter().any(|t| t == name) {
                sheets.push(SheetDiagnostics {
                    sheet: name.to_string(),
                    exists: false,
                    header: Vec::new(),
                    columns: BTreeMap::new(),
                    missing_required: Vec::new(),
                    unmapped_headers: Vec::new(),
                    data_rows: 0,
                    error: None,
                });
                continue;
            }

            match self.store.read_sheet(name).await {
                Ok(values) => sheets.push(inspect(name, schema, &values)),
                Err(e) => {
                    tracing::warn!("⚠️ Falha ao ler a aba '{}': {}", name, e);
                    let mut diag = inspect(name, schema, &[]);
                    diag.error = Some(e.to_string());
                    sheets.push(diag);
                }
            }
        }

        Ok(DebugSheetsResponse {
            success: true,
            service_account: self.service_account.clone(),
            sheets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::InMemorySheets;

    fn rows(raw: &[&[&str]]) -> Vec<Vec<String>> {
        raw.iter().map(|r| r.iter().map(|c| c.to_string()).collect()).collect()
    }

    #[test]
    fn reports_columns_and_missing_headers() {
        let values = rows(&[
            &["Carimbo de data/hora", "Nome completo", "E-mail", "Observação"],
            &["18/10/2026", "Ana", "ana@x.org", ""],
            &["", "", "", ""],
        ]);
        let diag = inspect("dados pessoais", &PERSONAL_DATA_SCHEMA, &values);

        assert_eq!(diag.columns.get("timestamp").map(String::as_str), Some("A"));
        assert_eq!(diag.columns.get("email").map(String::as_str), Some("C"));
        assert_eq!(diag.missing_required, vec!["CPF"]);
        assert_eq!(diag.unmapped_headers, vec!["Observação"]);
        assert_eq!(diag.data_rows, 1);
    }

    #[test]
    fn header_below_blank_rows_is_found() {
        let values = rows(&[&[], &["Matrícula", "CPF"], &["EETAD1", "61767735120"]]);
        let diag = inspect("matriculas", &ENROLLMENT_SCHEMA, &values);

        assert_eq!(diag.header, vec!["Matrícula", "CPF"]);
        assert_eq!(diag.columns.get("cpf").map(String::as_str), Some("B"));
        assert_eq!(diag.data_rows, 1);
    }

    #[test]
    fn empty_tab_has_nothing_missing() {
        let diag = inspect("matriculas", &ENROLLMENT_SCHEMA, &[]);
        assert!(diag.header.is_empty());
        assert!(diag.missing_required.is_empty());
        assert_eq!(diag.data_rows, 0);
    }

    #[tokio::test]
    async fn lists_every_configured_tab() {
        let sheets = InMemorySheets::new()
            .with_sheet("dados pessoais", &[&["Nome", "CPF"], &["Ana", "61767735120"]])
            .with_sheet("matriculas", &[&["Nome"]]);
        let service = DiagnosticsService::new(
            Arc::new(sheets),
            SheetNames::default(),
            Some("sa@eetad.iam.gserviceaccount.com".into()),
        );

        let report = service.debug_sheets().await.unwrap();

        assert_eq!(report.sheets.len(), 5);
        assert!(report.sheets[0].exists);
        assert_eq!(report.sheets[0].data_rows, 1);
        assert_eq!(report.sheets[1].missing_required, vec!["CPF"]);
        assert!(!report.sheets[2].exists);
        assert!(!report.sheets[4].exists);
        assert_eq!(report.service_account.as_deref(), Some("sa@eetad.iam.gserviceaccount.com"));
    }
}
