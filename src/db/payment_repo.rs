// src/db/payment_repo.rs

use std::sync::Arc;

use crate::{
    common::{
        error::AppError,
        sheet_table::{ColumnSpec, SheetRow, SheetSchema, SheetTable},
    },
    db::{sheets::SheetStore, tab::SheetTab},
    models::payment::PendingPaymentRecord,
};

pub static PAYMENT_SCHEMA: SheetSchema = SheetSchema {
    columns: &[
        ColumnSpec { key: "data", header: "Data", aliases: &["data de criacao", "data/hora"] },
        ColumnSpec { key: "payment_id", header: "ID Pagamento", aliases: &["id do pagamento", "payment id", "id"] },
        ColumnSpec { key: "cpf", header: "CPF", aliases: &[] },
        ColumnSpec { key: "nome", header: "Nome", aliases: &["nome completo", "aluno"] },
        ColumnSpec { key: "email", header: "Email", aliases: &["e-mail"] },
        ColumnSpec { key: "livro", header: "Livro", aliases: &["livros"] },
        ColumnSpec { key: "ciclo", header: "Ciclo", aliases: &[] },
        ColumnSpec { key: "valor", header: "Valor", aliases: &["valor total", "preco"] },
        ColumnSpec { key: "status", header: "Status", aliases: &["situacao"] },
        ColumnSpec { key: "external_reference", header: "Referência Externa", aliases: &["external reference", "referencia"] },
        ColumnSpec { key: "ticket_url", header: "Ticket URL", aliases: &["link de pagamento", "url"] },
        ColumnSpec { key: "qr_code", header: "QR Code", aliases: &["pix copia e cola", "copia e cola"] },
        ColumnSpec { key: "qr_code_base64", header: "QR Code Base64", aliases: &["qr base64"] },
        ColumnSpec { key: "data_confirmacao", header: "Data de Confirmação", aliases: &["data confirmacao", "confirmado em"] },
    ],
    required: &["payment_id", "status"],
};

// Repositório da aba "pagamentos"
#[derive(Clone)]
pub struct PaymentRepository {
    tab: SheetTab,
}

impl PaymentRepository {
    pub fn new(store: Arc<dyn SheetStore>, sheet_name: &str) -> Self {
        Self {
            tab: SheetTab::new(store, sheet_name, &PAYMENT_SCHEMA),
        }
    }

    pub async fn load(&self) -> Result<SheetTable, AppError> {
        self.tab.load().await
    }

    pub fn to_record(row: &SheetRow<'_>) -> PendingPaymentRecord {
        PendingPaymentRecord {
            row_index: row.row_index,
            data: row.get("data").to_string(),
            payment_id: row.get("payment_id").to_string(),
            cpf: row.get("cpf").to_string(),
            nome: row.get("nome").to_string(),
            email: row.get("email").to_string(),
            livro: row.get("livro").to_string(),
            ciclo: row.get("ciclo").to_string(),
            valor: row.get("valor").to_string(),
            status: row.get("status").to_string(),
            external_reference: row.get("external_reference").to_string(),
            ticket_url: row.get("ticket_url").to_string(),
            qr_code: row.get("qr_code").to_string(),
            qr_code_base64: row.get("qr_code_base64").to_string(),
            data_confirmacao: row.get("data_confirmacao").to_string(),
        }
    }

    pub fn records(table: &SheetTable) -> Vec<PendingPaymentRecord> {
        table
            .records()
            .filter(|row| !row.is_blank())
            .map(|row| Self::to_record(&row))
            .collect()
    }

    /// Primeira linha com o ID de pagamento (busca linear).
    pub fn find_row(table: &SheetTable, payment_id: &str) -> Option<usize> {
        table
            .records()
            .find(|row| row.get("payment_id") == payment_id.trim())
            .map(|row| row.row_index)
    }

    pub async fn append(&self, table: &SheetTable, record: &PendingPaymentRecord) -> Result<(), AppError> {
        let cells = [
            ("data", record.data.clone()),
            ("payment_id", record.payment_id.clone()),
            ("cpf", record.cpf.clone()),
            ("nome", record.nome.clone()),
            ("email", record.email.clone()),
            ("livro", record.livro.clone()),
            ("ciclo", record.ciclo.clone()),
            ("valor", record.valor.clone()),
            ("status", record.status.clone()),
            ("external_reference", record.external_reference.clone()),
            ("ticket_url", record.ticket_url.clone()),
            ("qr_code", record.qr_code.clone()),
            ("qr_code_base64", record.qr_code_base64.clone()),
            ("data_confirmacao", record.data_confirmacao.clone()),
        ];
        self.tab.append(table, &cells).await
    }

    pub async fn update_fields(
        &self,
        table: &SheetTable,
        row_index: usize,
        fields: &[(&'static str, String)],
    ) -> Result<(), AppError> {
        self.tab.update_fields(table, row_index, fields).await
    }
}
