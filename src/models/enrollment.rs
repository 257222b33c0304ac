// src/models/enrollment.rs

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

// Critério usado para decidir se um cadastro ainda está pendente
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PendingCriterion {
    /// CPF ainda não aparece na aba de matrículas
    #[default]
    Cpf,
    /// Além disso, a coluna Status do cadastro precisa dizer "Pendente"
    Status,
}

impl FromStr for PendingCriterion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cpf" => Ok(Self::Cpf),
            "status" => Ok(Self::Status),
            other => Err(format!("critério de pendência desconhecido: {}", other)),
        }
    }
}

// Uma linha da aba "matriculas"
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentRecord {
    #[schema(example = 5)]
    pub row_index: usize,
    #[schema(example = "18/10/2026")]
    pub data: String,
    #[schema(example = "EETAD1792345678901")]
    pub matricula: String,
    #[schema(example = "61767735120")]
    pub cpf: String,
    pub nome: String,
    #[schema(example = "Ciclo 2025")]
    pub ciclo: String,
    #[schema(example = "Sede")]
    pub subnucleo: String,
    pub data_evento: String,
    #[schema(example = "Efetivado")]
    pub status: String,
    pub observacao: String,
    pub email: String,
    pub telefone: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeEnrollmentPayload {
    #[validate(range(min = 2, message = "rowIndex deve apontar para uma linha de dados (>= 2)."))]
    #[schema(example = 2)]
    pub row_index: usize,

    #[validate(length(min = 11, message = "CPF inválido."))]
    #[schema(example = "61767735120")]
    pub cpf: String,

    #[validate(length(min = 1, message = "O ciclo é obrigatório."))]
    #[schema(example = "Ciclo 2025")]
    pub ciclo: String,

    #[serde(default)]
    #[schema(example = "Sede")]
    pub subnucleo: Option<String>,

    #[validate(length(min = 1, message = "O status é obrigatório."))]
    #[schema(example = "Efetivado")]
    pub status: String,

    #[serde(default)]
    pub observacao: Option<String>,

    #[serde(default, alias = "eventDate")]
    #[schema(example = "2026-11-07")]
    pub data_evento: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeEnrollmentResponse {
    pub success: bool,
    #[schema(example = "EETAD1792345678901")]
    pub matricula: String,
    pub row_index: usize,
    /// true quando o CPF já estava matriculado (chamada repetida)
    pub already_enrolled: bool,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EnrollmentQuery {
    pub cpf: Option<String>,
    pub ciclo: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconcilePayload {
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusRepair {
    pub row_index: usize,
    pub cpf: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateEnrollment {
    pub cpf: String,
    pub matriculas: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub success: bool,
    pub dry_run: bool,
    pub checked: usize,
    pub repaired: Vec<StatusRepair>,
    pub duplicate_enrollments: Vec<DuplicateEnrollment>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentListResponse {
    pub success: bool,
    pub total: usize,
    pub enrollments: Vec<EnrollmentRecord>,
}
