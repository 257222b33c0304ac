// src/models/student.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::common::cpf::validate_cpf;

// Uma linha da aba "dados pessoais"
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PersonalDataRecord {
    #[schema(example = 2)]
    pub row_index: usize,
    #[schema(example = "18/10/2026 14:32:10")]
    pub timestamp: String,
    #[schema(example = "Ana Paula Souza")]
    pub nome: String,
    pub rg: String,
    #[schema(example = "617.677.351-20")]
    pub cpf: String,
    pub telefone: String,
    pub email: String,
    pub sexo: String,
    pub estado_civil: String,
    pub data_nascimento: String,
    pub cidade_nascimento: String,
    pub uf_nascimento: String,
    pub nacionalidade: String,
    pub escolaridade: String,
    pub profissao: String,
    pub cargo_igreja: String,
    pub cep: String,
    pub endereco: String,
    pub numero: String,
    pub complemento: String,
    pub bairro: String,
    pub cidade: String,
    pub uf: String,
    #[schema(example = "Pendente")]
    pub status: String,
}

// Formulário de auto-cadastro do aluno
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SavePersonalDataPayload {
    #[validate(length(min = 3, message = "O nome deve ter no mínimo 3 caracteres."))]
    #[schema(example = "Ana Paula Souza")]
    pub nome: String,

    #[validate(custom(function = "validate_cpf"))]
    #[schema(example = "617.677.351-20")]
    pub cpf: String,

    #[validate(length(min = 8, message = "Telefone inválido."))]
    #[schema(example = "(61) 99999-0000")]
    pub telefone: String,

    #[validate(email(message = "O e-mail fornecido é inválido."))]
    #[schema(example = "ana@exemplo.com")]
    pub email: String,

    #[serde(default)]
    pub rg: Option<String>,
    #[serde(default)]
    pub sexo: Option<String>,
    #[serde(default)]
    pub estado_civil: Option<String>,
    #[serde(default)]
    #[schema(example = "1990-05-12")]
    pub data_nascimento: Option<String>,
    #[serde(default)]
    pub cidade_nascimento: Option<String>,
    #[serde(default)]
    pub uf_nascimento: Option<String>,
    #[serde(default)]
    pub nacionalidade: Option<String>,
    #[serde(default)]
    pub escolaridade: Option<String>,
    #[serde(default)]
    pub profissao: Option<String>,
    #[serde(default)]
    pub cargo_igreja: Option<String>,
    #[serde(default)]
    pub cep: Option<String>,
    #[serde(default)]
    pub endereco: Option<String>,
    #[serde(default)]
    pub numero: Option<String>,
    #[serde(default)]
    pub complemento: Option<String>,
    #[serde(default)]
    pub bairro: Option<String>,
    #[serde(default)]
    pub cidade: Option<String>,
    #[serde(default)]
    pub uf: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SavePersonalDataResponse {
    pub success: bool,
    #[schema(example = "61767735120")]
    pub cpf: String,
    #[schema(example = "Pendente")]
    pub status: String,
}

// Saída do resolvedor de pendências
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingStudent {
    /// Linha na planilha (1-based), usada pelo finalize-enrollment
    #[schema(example = 2)]
    pub row_index: usize,
    #[schema(example = "Ana Paula Souza")]
    pub nome: String,
    #[schema(example = "61767735120")]
    pub cpf: String,
    pub telefone: String,
    pub email: String,
    #[schema(example = "Pendente")]
    pub status: String,
    pub data_cadastro: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingStudentsResponse {
    pub success: bool,
    pub total: usize,
    pub students: Vec<PendingStudent>,
}
