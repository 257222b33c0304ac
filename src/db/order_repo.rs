// src/db/order_repo.rs

use std::sync::Arc;

use crate::{
    common::{
        error::AppError,
        sheet_table::{ColumnSpec, SheetRow, SheetSchema, SheetTable},
    },
    db::{sheets::SheetStore, tab::SheetTab},
    models::payment::BookOrderRecord,
};

pub static BOOK_ORDER_SCHEMA: SheetSchema = SheetSchema {
    columns: &[
        ColumnSpec { key: "data", header: "Data", aliases: &["data do pedido", "data/hora"] },
        ColumnSpec { key: "cpf", header: "CPF", aliases: &[] },
        ColumnSpec { key: "nome", header: "Nome", aliases: &["nome completo", "aluno"] },
        ColumnSpec { key: "email", header: "Email", aliases: &["e-mail"] },
        ColumnSpec { key: "telefone", header: "Telefone", aliases: &["celular", "whatsapp"] },
        ColumnSpec { key: "livro", header: "Livro", aliases: &["livros", "material"] },
        ColumnSpec { key: "ciclo", header: "Ciclo", aliases: &[] },
        ColumnSpec { key: "valor", header: "Valor", aliases: &["valor total", "preco"] },
        ColumnSpec { key: "forma_pagamento", header: "Forma de Pagamento", aliases: &["pagamento", "metodo de pagamento"] },
        ColumnSpec { key: "payment_id", header: "ID Pagamento", aliases: &["id do pagamento", "payment id"] },
        ColumnSpec { key: "status", header: "Status", aliases: &["situacao"] },
    ],
    required: &["cpf"],
};

// Repositório da aba "pedidos"
#[derive(Clone)]
pub struct OrderRepository {
    tab: SheetTab,
}

impl OrderRepository {
    pub fn new(store: Arc<dyn SheetStore>, sheet_name: &str) -> Self {
        Self {
            tab: SheetTab::new(store, sheet_name, &BOOK_ORDER_SCHEMA),
        }
    }

    pub async fn load(&self) -> Result<SheetTable, AppError> {
        self.tab.load().await
    }

    pub fn to_record(row: &SheetRow<'_>) -> BookOrderRecord {
        BookOrderRecord {
            row_index: row.row_index,
            data: row.get("data").to_string(),
            cpf: row.get("cpf").to_string(),
            nome: row.get("nome").to_string(),
            email: row.get("email").to_string(),
            telefone: row.get("telefone").to_string(),
            livro: row.get("livro").to_string(),
            ciclo: row.get("ciclo").to_string(),
            valor: row.get("valor").to_string(),
            forma_pagamento: row.get("forma_pagamento").to_string(),
            payment_id: row.get("payment_id").to_string(),
            status: row.get("status").to_string(),
        }
    }

    pub fn records(table: &SheetTable) -> Vec<BookOrderRecord> {
        table
            .records()
            .filter(|row| !row.is_blank())
            .map(|row| Self::to_record(&row))
            .collect()
    }

    pub async fn append(&self, table: &SheetTable, record: &BookOrderRecord) -> Result<(), AppError> {
        let cells = [
            ("data", record.data.clone()),
            ("cpf", record.cpf.clone()),
            ("nome", record.nome.clone()),
            ("email", record.email.clone()),
            ("telefone", record.telefone.clone()),
            ("livro", record.livro.clone()),
            ("ciclo", record.ciclo.clone()),
            ("valor", record.valor.clone()),
            ("forma_pagamento", record.forma_pagamento.clone()),
            ("payment_id", record.payment_id.clone()),
            ("status", record.status.clone()),
        ];
        self.tab.append(table, &cells).await
    }

    /// Marca o pedido ligado ao pagamento. Devolve false se não houver pedido.
    pub async fn update_status_by_payment(&self, payment_id: &str, status: &str) -> Result<bool, AppError> {
        let table = self.load().await?;
        let Some(row_index) = table
            .records()
            .find(|row| row.get("payment_id") == payment_id)
            .map(|row| row.row_index)
        else {
            return Ok(false);
        };

        self.tab
            .update_fields(&table, row_index, &[("status", status.to_string())])
            .await?;
        Ok(true)
    }
}
