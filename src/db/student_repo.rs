// src/db/student_repo.rs

use std::sync::Arc;

use crate::{
    common::{
        error::AppError,
        sheet_table::{ColumnSpec, SheetRow, SheetSchema, SheetTable},
    },
    db::{sheets::SheetStore, tab::SheetTab},
    models::student::PersonalDataRecord,
};

pub static PERSONAL_DATA_SCHEMA: SheetSchema = SheetSchema {
    columns: &[
        ColumnSpec { key: "timestamp", header: "Data/Hora", aliases: &["carimbo de data/hora", "timestamp", "data de cadastro", "data"] },
        ColumnSpec { key: "nome", header: "Nome", aliases: &["nome completo", "nome do aluno", "aluno"] },
        ColumnSpec { key: "rg", header: "RG", aliases: &["identidade"] },
        ColumnSpec { key: "cpf", header: "CPF", aliases: &["cpf do aluno"] },
        ColumnSpec { key: "telefone", header: "Telefone", aliases: &["celular", "whatsapp", "fone"] },
        ColumnSpec { key: "email", header: "Email", aliases: &["e-mail"] },
        ColumnSpec { key: "sexo", header: "Sexo", aliases: &["genero"] },
        ColumnSpec { key: "estado_civil", header: "Estado Civil", aliases: &[] },
        ColumnSpec { key: "data_nascimento", header: "Data de Nascimento", aliases: &["nascimento"] },
        ColumnSpec { key: "cidade_nascimento", header: "Cidade de Nascimento", aliases: &["naturalidade"] },
        ColumnSpec { key: "uf_nascimento", header: "UF de Nascimento", aliases: &["uf nascimento", "estado de nascimento"] },
        ColumnSpec { key: "nacionalidade", header: "Nacionalidade", aliases: &[] },
        ColumnSpec { key: "escolaridade", header: "Escolaridade", aliases: &[] },
        ColumnSpec { key: "profissao", header: "Profissão", aliases: &[] },
        ColumnSpec { key: "cargo_igreja", header: "Cargo na Igreja", aliases: &["cargo", "funcao na igreja"] },
        ColumnSpec { key: "cep", header: "CEP", aliases: &[] },
        ColumnSpec { key: "endereco", header: "Endereço", aliases: &["logradouro", "rua"] },
        ColumnSpec { key: "numero", header: "Número", aliases: &["n", "no", "num"] },
        ColumnSpec { key: "complemento", header: "Complemento", aliases: &[] },
        ColumnSpec { key: "bairro", header: "Bairro", aliases: &[] },
        ColumnSpec { key: "cidade", header: "Cidade", aliases: &[] },
        ColumnSpec { key: "uf", header: "UF", aliases: &["estado"] },
        ColumnSpec { key: "status", header: "Status", aliases: &["situacao"] },
    ],
    required: &["nome", "cpf"],
};

// Repositório da aba "dados pessoais"
#[derive(Clone)]
pub struct StudentRepository {
    tab: SheetTab,
}

impl StudentRepository {
    pub fn new(store: Arc<dyn SheetStore>, sheet_name: &str) -> Self {
        Self {
            tab: SheetTab::new(store, sheet_name, &PERSONAL_DATA_SCHEMA),
        }
    }

    pub fn sheet_name(&self) -> &str {
        self.tab.name()
    }

    pub async fn load(&self) -> Result<SheetTable, AppError> {
        self.tab.load().await
    }

    pub fn to_record(row: &SheetRow<'_>) -> PersonalDataRecord {
        PersonalDataRecord {
            row_index: row.row_index,
            timestamp: row.get("timestamp").to_string(),
            nome: row.get("nome").to_string(),
            rg: row.get("rg").to_string(),
            cpf: row.get("cpf").to_string(),
            telefone: row.get("telefone").to_string(),
            email: row.get("email").to_string(),
            sexo: row.get("sexo").to_string(),
            estado_civil: row.get("estado_civil").to_string(),
            data_nascimento: row.get("data_nascimento").to_string(),
            cidade_nascimento: row.get("cidade_nascimento").to_string(),
            uf_nascimento: row.get("uf_nascimento").to_string(),
            nacionalidade: row.get("nacionalidade").to_string(),
            escolaridade: row.get("escolaridade").to_string(),
            profissao: row.get("profissao").to_string(),
            cargo_igreja: row.get("cargo_igreja").to_string(),
            cep: row.get("cep").to_string(),
            endereco: row.get("endereco").to_string(),
            numero: row.get("numero").to_string(),
            complemento: row.get("complemento").to_string(),
            bairro: row.get("bairro").to_string(),
            cidade: row.get("cidade").to_string(),
            uf: row.get("uf").to_string(),
            status: row.get("status").to_string(),
        }
    }

    pub async fn append(&self, table: &SheetTable, record: &PersonalDataRecord) -> Result<(), AppError> {
        let cells = [
            ("timestamp", record.timestamp.clone()),
            ("nome", record.nome.clone()),
            ("rg", record.rg.clone()),
            ("cpf", record.cpf.clone()),
            ("telefone", record.telefone.clone()),
            ("email", record.email.clone()),
            ("sexo", record.sexo.clone()),
            ("estado_civil", record.estado_civil.clone()),
            ("data_nascimento", record.data_nascimento.clone()),
            ("cidade_nascimento", record.cidade_nascimento.clone()),
            ("uf_nascimento", record.uf_nascimento.clone()),
            ("nacionalidade", record.nacionalidade.clone()),
            ("escolaridade", record.escolaridade.clone()),
            ("profissao", record.profissao.clone()),
            ("cargo_igreja", record.cargo_igreja.clone()),
            ("cep", record.cep.clone()),
            ("endereco", record.endereco.clone()),
            ("numero", record.numero.clone()),
            ("complemento", record.complemento.clone()),
            ("bairro", record.bairro.clone()),
            ("cidade", record.cidade.clone()),
            ("uf", record.uf.clone()),
            ("status", record.status.clone()),
        ];
        self.tab.append(table, &cells).await
    }

    /// Grava o status na célula da coluna Status da linha indicada.
    pub async fn update_status(
        &self,
        table: &SheetTable,
        row_index: usize,
        status: &str,
    ) -> Result<(), AppError> {
        self.tab
            .update_fields(table, row_index, &[("status", status.to_string())])
            .await
    }

    pub fn require_status_column(&self, table: &SheetTable) -> Result<usize, AppError> {
        table.require_column(&PERSONAL_DATA_SCHEMA, "status")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::{InMemorySheets, SheetCall};

    #[tokio::test]
    async fn reads_records_by_header_name() {
        let sheets = InMemorySheets::new().with_sheet("dados pessoais", &[
            &["Carimbo de data/hora", "E-mail", "Nome Completo", "CPF", "WhatsApp", "Situação"],
            &["18/10/2026 10:00", "ana@x.com", "Ana", "617.677.351-20", "61999990000", "Pendente"],
        ]);
        let repo = StudentRepository::new(Arc::new(sheets), "dados pessoais");

        let table = repo.load().await.unwrap();
        let record = StudentRepository::to_record(&table.row(2).unwrap());

        assert_eq!(record.nome, "Ana");
        assert_eq!(record.email, "ana@x.com");
        assert_eq!(record.telefone, "61999990000");
        assert_eq!(record.status, "Pendente");
        assert_eq!(record.timestamp, "18/10/2026 10:00");
    }

    #[tokio::test]
    async fn status_update_targets_status_column() {
        let sheets = InMemorySheets::new().with_sheet("dados pessoais", &[
            &["Nome", "CPF", "Status"],
            &["Ana", "61767735120", "Pendente"],
        ]);
        let repo = StudentRepository::new(Arc::new(sheets.clone()), "dados pessoais");
        let table = repo.load().await.unwrap();

        repo.update_status(&table, 2, "Efetivado").await.unwrap();

        assert_eq!(sheets.calls(), vec![SheetCall::Update {
            sheet: "dados pessoais".into(),
            row_index: 2,
            column: 2,
            values: vec!["Efetivado".into()],
        }]);
    }

    #[tokio::test]
    async fn status_update_without_status_column_fails() {
        let sheets = InMemorySheets::new()
            .with_sheet("dados pessoais", &[&["Nome", "CPF"], &["Ana", "61767735120"]]);
        let repo = StudentRepository::new(Arc::new(sheets.clone()), "dados pessoais");
        let table = repo.load().await.unwrap();

        let err = repo.update_status(&table, 2, "Efetivado").await.unwrap_err();
        assert!(matches!(err, AppError::MissingSheetHeader { header: "Status", .. }));
        assert!(sheets.calls().is_empty());
    }
}
