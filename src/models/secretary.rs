// src/models/secretary.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub const STATUS_ACTIVE: &str = "ativo";
pub const STATUS_INACTIVE: &str = "inativo";

// Um usuário da secretaria (aba "usuarios")
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretaryUser {
    #[schema(ignore)]
    #[serde(skip_serializing)]
    pub row_index: usize,

    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: String,

    #[schema(example = "secretaria")]
    pub username: String,

    #[schema(example = "secretaria@eetad.org")]
    pub email: String,

    #[schema(example = "Maria das Graças")]
    pub nome_completo: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    #[schema(ignore)]
    pub password_hash: String,

    #[schema(example = "ativo")]
    pub status: String,

    pub created_at: String,
    pub updated_at: String,
}

impl SecretaryUser {
    pub fn is_active(&self) -> bool {
        // Linhas antigas sem status contam como ativas
        self.status.is_empty() || self.status.eq_ignore_ascii_case(STATUS_ACTIVE)
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginPayload {
    /// Nome de usuário ou e-mail
    #[validate(length(min = 1, message = "Informe o usuário."))]
    #[schema(example = "secretaria")]
    pub username: String,

    #[validate(length(min = 1, message = "Informe a senha."))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    #[schema(example = "2026-10-18T22:00:00Z")]
    pub expires_at: String,
    pub user: SecretaryUser,
}

// Claims do JWT de sessão
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // ID do usuário
    pub sid: Uuid,   // ID da sessão no servidor
    pub exp: usize,
    pub iat: usize,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserPayload {
    #[validate(length(min = 3, message = "O usuário deve ter no mínimo 3 caracteres."))]
    #[schema(example = "secretaria")]
    pub username: String,

    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,

    #[validate(length(min = 3, message = "O nome deve ter no mínimo 3 caracteres."))]
    pub nome_completo: String,

    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserPayload {
    #[validate(length(min = 1, message = "O ID do usuário é obrigatório."))]
    pub id: String,

    #[validate(email(message = "O e-mail fornecido é inválido."))]
    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub nome_completo: Option<String>,

    #[serde(default)]
    #[schema(example = "inativo")]
    pub status: Option<String>,

    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    #[serde(default)]
    pub password: Option<String>,
}

// Corpo do manage-secretary-users: { "action": "create", ... }
#[derive(Debug, Deserialize, ToSchema)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ManageUsersRequest {
    List,
    Create(CreateUserPayload),
    Update(UpdateUserPayload),
    Delete { id: String },
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManageUsersResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<SecretaryUser>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<SecretaryUser>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub success: bool,
    pub user: SecretaryUser,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogoutResponse {
    pub success: bool,
}
