// src/common/sheet_table.rs

//! Acesso às colunas das planilhas pelo nome do cabeçalho.
//!
//! A primeira linha de cada aba é o cabeçalho. Cada coluna conhecida tem um
//! nome padrão e uma lista de apelidos; os cabeçalhos são comparados depois
//! de normalizados (sem acento, minúsculos, pontuação virando espaço), então
//! "E-mail", "email" e "EMAIL " caem na mesma coluna. Nenhum código fora
//! deste módulo usa índice numérico de coluna.

use std::collections::HashMap;

use deunicode::deunicode;

use crate::common::error::AppError;

#[derive(Debug)]
pub struct ColumnSpec {
    pub key: &'static str,
    /// Cabeçalho usado quando a aba é criada pelo sistema
    pub header: &'static str,
    pub aliases: &'static [&'static str],
}

#[derive(Debug)]
pub struct SheetSchema {
    pub columns: &'static [ColumnSpec],
    pub required: &'static [&'static str],
}

impl SheetSchema {
    pub fn default_header(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.header.to_string()).collect()
    }

    pub fn spec(&self, key: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.key == key)
    }

    fn header_name(&self, key: &'static str) -> &'static str {
        self.spec(key).map(|c| c.header).unwrap_or(key)
    }

    /// Mapeia chave -> índice da coluna. O primeiro cabeçalho que casa vence.
    pub fn map_headers(&self, header: &[String]) -> HashMap<&'static str, usize> {
        let normalized: Vec<String> = header.iter().map(|h| normalize_header(h)).collect();
        let mut columns = HashMap::new();

        for spec in self.columns {
            let found = normalized.iter().position(|h| {
                !h.is_empty()
                    && (*h == normalize_header(spec.header)
                        || spec.aliases.iter().any(|a| *h == normalize_header(a)))
            });
            if let Some(idx) = found {
                columns.insert(spec.key, idx);
            }
        }
        columns
    }
}

pub fn normalize_header(raw: &str) -> String {
    deunicode(raw)
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Índice de coluna (0 = A) para a letra da notação A1.
pub fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (index % 26) as u8) as char);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.iter().rev().collect()
}

/// Posição (0-based) da primeira linha não vazia: o cabeçalho da aba.
/// Linhas em branco acima dele são ignoradas.
pub fn header_position(values: &[Vec<String>]) -> Option<usize> {
    values
        .iter()
        .position(|row| row.iter().any(|cell| !cell.trim().is_empty()))
}

#[derive(Debug, Clone)]
pub struct SheetTable {
    sheet: String,
    header: Vec<String>,
    columns: HashMap<&'static str, usize>,
    rows: Vec<Vec<String>>,
    has_header: bool,
    // Linha do cabeçalho na planilha (1-based)
    header_row: usize,
}

impl SheetTable {
    /// Monta a tabela a partir dos valores crus da aba (cabeçalho incluído).
    /// Só a aba sem nenhuma célula preenchida vira tabela vazia com o
    /// cabeçalho padrão; linhas em branco antes do cabeçalho são puladas.
    pub fn parse(
        sheet: &str,
        schema: &'static SheetSchema,
        mut values: Vec<Vec<String>>,
    ) -> Result<Self, AppError> {
        let Some(position) = header_position(&values) else {
            let header = schema.default_header();
            return Ok(Self {
                sheet: sheet.to_string(),
                columns: schema.map_headers(&header),
                header,
                rows: Vec::new(),
                has_header: false,
                header_row: 1,
            });
        };

        values.drain(..position);
        let header = values.remove(0);
        let columns = schema.map_headers(&header);

        if let Some(missing) = schema.required.iter().copied().find(|key| !columns.contains_key(key)) {
            return Err(AppError::MissingSheetHeader {
                sheet: sheet.to_string(),
                header: schema.header_name(missing),
            });
        }

        Ok(Self {
            sheet: sheet.to_string(),
            header,
            columns,
            rows: values,
            has_header: true,
            header_row: position + 1,
        })
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn has_header(&self) -> bool {
        self.has_header
    }

    pub fn column(&self, key: &str) -> Option<usize> {
        self.columns.get(key).copied()
    }

    pub fn require_column(
        &self,
        schema: &'static SheetSchema,
        key: &'static str,
    ) -> Result<usize, AppError> {
        self.column(key).ok_or_else(|| AppError::MissingSheetHeader {
            sheet: self.sheet.clone(),
            header: schema.header_name(key),
        })
    }

    pub fn records(&self) -> impl Iterator<Item = SheetRow<'_>> {
        let first = self.header_row + 1;
        self.rows.iter().enumerate().map(move |(i, cells)| SheetRow {
            row_index: first + i,
            cells,
            table: self,
        })
    }

    /// Linha pelo número da planilha (1-based; o cabeçalho costuma ser a 1).
    pub fn row(&self, row_index: usize) -> Option<SheetRow<'_>> {
        if row_index <= self.header_row {
            return None;
        }
        self.rows.get(row_index - self.header_row - 1).map(|cells| SheetRow {
            row_index,
            cells,
            table: self,
        })
    }

    /// Monta uma linha na ordem real do cabeçalho da aba.
    pub fn build_row(&self, values: &[(&str, String)]) -> Vec<String> {
        let mut row = vec![String::new(); self.header.len()];
        for (key, value) in values {
            match self.column(key) {
                Some(idx) => row[idx] = value.clone(),
                None => tracing::debug!("Aba '{}' sem coluna para '{}', valor ignorado", self.sheet, key),
            }
        }
        row
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SheetRow<'a> {
    pub row_index: usize,
    cells: &'a [String],
    table: &'a SheetTable,
}

impl<'a> SheetRow<'a> {
    pub fn get(&self, key: &str) -> &'a str {
        self.table
            .column(key)
            .and_then(|idx| self.cells.get(idx))
            .map(|s| s.trim())
            .unwrap_or("")
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static SCHEMA: SheetSchema = SheetSchema {
        columns: &[
            ColumnSpec { key: "nome", header: "Nome", aliases: &["nome completo"] },
            ColumnSpec { key: "cpf", header: "CPF", aliases: &[] },
            ColumnSpec { key: "email", header: "Email", aliases: &["e-mail"] },
            ColumnSpec { key: "status", header: "Status", aliases: &["situação"] },
        ],
        required: &["nome", "cpf"],
    };

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn header_normalization() {
        assert_eq!(normalize_header("  E-MAIL "), "e mail");
        assert_eq!(normalize_header("Situação"), "situacao");
        assert_eq!(normalize_header("Data/Hora"), "data hora");
    }

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn columns_resolve_by_name_regardless_of_position() {
        let values = vec![
            row(&["Situação", "E-mail", "CPF", "Nome Completo"]),
            row(&["Pendente", "ana@x.com", "617.677.351-20", "Ana"]),
        ];
        let table = SheetTable::parse("dados", &SCHEMA, values).unwrap();
        let first = table.records().next().unwrap();

        assert_eq!(first.row_index, 2);
        assert_eq!(first.get("nome"), "Ana");
        assert_eq!(first.get("cpf"), "617.677.351-20");
        assert_eq!(first.get("status"), "Pendente");
        assert_eq!(table.column("email"), Some(1));
    }

    #[test]
    fn missing_required_header_is_rejected() {
        let values = vec![row(&["Nome", "Telefone"]), row(&["Ana", "1"])];
        let err = SheetTable::parse("dados", &SCHEMA, values).unwrap_err();
        match err {
            AppError::MissingSheetHeader { sheet, header } => {
                assert_eq!(sheet, "dados");
                assert_eq!(header, "CPF");
            }
            other => panic!("erro inesperado: {other:?}"),
        }
    }

    #[test]
    fn empty_sheet_uses_default_header() {
        let table = SheetTable::parse("dados", &SCHEMA, vec![]).unwrap();
        assert!(!table.has_header());
        assert_eq!(table.header(), &["Nome", "CPF", "Email", "Status"]);
        assert_eq!(table.records().count(), 0);
    }

    #[test]
    fn blank_rows_above_header_are_skipped() {
        let values = vec![row(&[]), row(&["", " "]), row(&["CPF", "Nome"]), row(&["617", "Ana"])];
        let table = SheetTable::parse("dados", &SCHEMA, values).unwrap();

        assert!(table.has_header());
        assert_eq!(table.header(), &["CPF", "Nome"]);
        let first = table.records().next().unwrap();
        assert_eq!(first.row_index, 4);
        assert_eq!(first.get("cpf"), "617");
        assert_eq!(table.row(4).unwrap().get("nome"), "Ana");
        assert!(table.row(3).is_none());
    }

    #[test]
    fn only_blank_rows_count_as_empty_sheet() {
        let table = SheetTable::parse("dados", &SCHEMA, vec![row(&[]), row(&["  "])]).unwrap();
        assert!(!table.has_header());
        assert_eq!(header_position(&[row(&[]), row(&["CPF"])]), Some(1));
        assert_eq!(header_position(&[row(&[""])]), None);
    }

    #[test]
    fn short_rows_read_as_empty_cells() {
        let values = vec![row(&["Nome", "CPF", "Email"]), row(&["Ana"])];
        let table = SheetTable::parse("dados", &SCHEMA, values).unwrap();
        let first = table.row(2).unwrap();
        assert_eq!(first.get("cpf"), "");
        assert_eq!(first.get("status"), "");
        assert!(table.row(1).is_none());
        assert!(table.row(3).is_none());
    }

    #[test]
    fn build_row_follows_sheet_order() {
        let values = vec![row(&["CPF", "Extra", "Nome"])];
        let table = SheetTable::parse("dados", &SCHEMA, values).unwrap();
        let built = table.build_row(&[("nome", "Ana".into()), ("cpf", "1".into()), ("email", "x".into())]);
        assert_eq!(built, row(&["1", "", "Ana"]));
    }
}
