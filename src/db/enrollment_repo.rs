// src/db/enrollment_repo.rs

use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    common::{
        cpf::normalize_cpf,
        error::AppError,
        sheet_table::{ColumnSpec, SheetRow, SheetSchema, SheetTable},
    },
    db::{sheets::SheetStore, tab::SheetTab},
    models::enrollment::EnrollmentRecord,
};

pub static ENROLLMENT_SCHEMA: SheetSchema = SheetSchema {
    columns: &[
        ColumnSpec { key: "data", header: "Data", aliases: &["data da matricula", "data/hora"] },
        ColumnSpec { key: "matricula", header: "Matrícula", aliases: &["numero da matricula", "n matricula"] },
        ColumnSpec { key: "cpf", header: "CPF", aliases: &[] },
        ColumnSpec { key: "nome", header: "Nome", aliases: &["nome completo", "aluno"] },
        ColumnSpec { key: "ciclo", header: "Ciclo", aliases: &[] },
        ColumnSpec { key: "subnucleo", header: "Subnúcleo", aliases: &["sub nucleo", "nucleo"] },
        ColumnSpec { key: "data_evento", header: "Data do Evento", aliases: &["data evento", "evento"] },
        ColumnSpec { key: "status", header: "Status", aliases: &["situacao"] },
        ColumnSpec { key: "observacao", header: "Observação", aliases: &["observacoes", "obs"] },
        ColumnSpec { key: "email", header: "Email", aliases: &["e-mail"] },
        ColumnSpec { key: "telefone", header: "Telefone", aliases: &["celular", "whatsapp"] },
    ],
    required: &["cpf"],
};

// Repositório da aba "matriculas" (somente inserção)
#[derive(Clone)]
pub struct EnrollmentRepository {
    tab: SheetTab,
}

impl EnrollmentRepository {
    pub fn new(store: Arc<dyn SheetStore>, sheet_name: &str) -> Self {
        Self {
            tab: SheetTab::new(store, sheet_name, &ENROLLMENT_SCHEMA),
        }
    }

    pub async fn load(&self) -> Result<SheetTable, AppError> {
        self.tab.load().await
    }

    pub fn to_record(row: &SheetRow<'_>) -> EnrollmentRecord {
        EnrollmentRecord {
            row_index: row.row_index,
            data: row.get("data").to_string(),
            matricula: row.get("matricula").to_string(),
            cpf: row.get("cpf").to_string(),
            nome: row.get("nome").to_string(),
            ciclo: row.get("ciclo").to_string(),
            subnucleo: row.get("subnucleo").to_string(),
            data_evento: row.get("data_evento").to_string(),
            status: row.get("status").to_string(),
            observacao: row.get("observacao").to_string(),
            email: row.get("email").to_string(),
            telefone: row.get("telefone").to_string(),
        }
    }

    pub fn records(table: &SheetTable) -> Vec<EnrollmentRecord> {
        table
            .records()
            .filter(|row| !row.is_blank())
            .map(|row| Self::to_record(&row))
            .collect()
    }

    /// CPFs (só dígitos) que já têm matrícula.
    pub fn enrolled_cpfs(table: &SheetTable) -> HashSet<String> {
        table
            .records()
            .map(|row| normalize_cpf(row.get("cpf")))
            .filter(|cpf| !cpf.is_empty())
            .collect()
    }

    /// Última matrícula do CPF, se houver.
    pub fn latest_for_cpf(table: &SheetTable, cpf: &str) -> Option<EnrollmentRecord> {
        table
            .records()
            .filter(|row| normalize_cpf(row.get("cpf")) == cpf)
            .last()
            .map(|row| Self::to_record(&row))
    }

    pub async fn append(&self, table: &SheetTable, record: &EnrollmentRecord) -> Result<(), AppError> {
        let cells = [
            ("data", record.data.clone()),
            ("matricula", record.matricula.clone()),
            ("cpf", record.cpf.clone()),
            ("nome", record.nome.clone()),
            ("ciclo", record.ciclo.clone()),
            ("subnucleo", record.subnucleo.clone()),
            ("data_evento", record.data_evento.clone()),
            ("status", record.status.clone()),
            ("observacao", record.observacao.clone()),
            ("email", record.email.clone()),
            ("telefone", record.telefone.clone()),
        ];
        self.tab.append(table, &cells).await
    }
}
