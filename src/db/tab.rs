// src/db/tab.rs

use std::sync::Arc;

use crate::{
    common::{
        error::AppError,
        sheet_table::{SheetSchema, SheetTable},
    },
    db::sheets::SheetStore,
};

// Uma aba da planilha com o seu esquema de colunas.
// Os repositórios usam isto em vez de falar direto com o SheetStore.
#[derive(Clone)]
pub struct SheetTab {
    store: Arc<dyn SheetStore>,
    name: String,
    schema: &'static SheetSchema,
}

impl SheetTab {
    pub fn new(store: Arc<dyn SheetStore>, name: impl Into<String>, schema: &'static SheetSchema) -> Self {
        Self {
            store,
            name: name.into(),
            schema,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn load(&self) -> Result<SheetTable, AppError> {
        let values = self.store.read_sheet(&self.name).await?;
        SheetTable::parse(&self.name, self.schema, values)
    }

    /// Acrescenta uma linha. Em aba vazia grava antes o cabeçalho padrão.
    pub async fn append(&self, table: &SheetTable, cells: &[(&str, String)]) -> Result<(), AppError> {
        if !table.has_header() {
            tracing::info!("🧾 Aba '{}' vazia, gravando cabeçalho padrão", self.name);
            self.store
                .append_row(&self.name, table.header().to_vec())
                .await?;
        }
        self.store.append_row(&self.name, table.build_row(cells)).await
    }

    /// Atualiza campos de uma linha, uma célula por campo.
    pub async fn update_fields(
        &self,
        table: &SheetTable,
        row_index: usize,
        fields: &[(&'static str, String)],
    ) -> Result<(), AppError> {
        for (key, value) in fields {
            let column = table.require_column(self.schema, key)?;
            self.store
                .update_cells(&self.name, row_index, column, vec![value.clone()])
                .await?;
        }
        Ok(())
    }

    pub async fn clear(&self, row_index: usize) -> Result<(), AppError> {
        self.store.clear_row(&self.name, row_index).await
    }

    /// Cria a aba (com cabeçalho) se ela ainda não existir.
    pub async fn ensure_exists(&self) -> Result<(), AppError> {
        let sheets = self.store.list_sheets().await?;
        if sheets.iter().any(|s| s == &self.name) {
            return Ok(());
        }
        self.store.add_sheet(&self.name).await?;
        self.store
            .append_row(&self.name, self.schema.default_header())
            .await
    }
}
