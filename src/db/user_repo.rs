// src/db/user_repo.rs

use std::sync::Arc;

use crate::{
    common::{
        error::AppError,
        sheet_table::{ColumnSpec, SheetRow, SheetSchema, SheetTable},
    },
    db::{sheets::SheetStore, tab::SheetTab},
    models::secretary::SecretaryUser,
};

pub static USER_SCHEMA: SheetSchema = SheetSchema {
    columns: &[
        ColumnSpec { key: "id", header: "ID", aliases: &["user id"] },
        ColumnSpec { key: "username", header: "Usuário", aliases: &["username", "login"] },
        ColumnSpec { key: "email", header: "Email", aliases: &["e-mail"] },
        ColumnSpec { key: "nome_completo", header: "Nome Completo", aliases: &["nome"] },
        ColumnSpec { key: "password_hash", header: "Senha Hash", aliases: &["senha", "password hash", "hash"] },
        ColumnSpec { key: "status", header: "Status", aliases: &["situacao"] },
        ColumnSpec { key: "created_at", header: "Criado Em", aliases: &["data de criacao", "created at"] },
        ColumnSpec { key: "updated_at", header: "Atualizado Em", aliases: &["data de atualizacao", "updated at"] },
    ],
    required: &["id", "username", "password_hash"],
};

// O repositório de usuários da secretaria, aba "usuarios"
#[derive(Clone)]
pub struct UserRepository {
    tab: SheetTab,
}

impl UserRepository {
    pub fn new(store: Arc<dyn SheetStore>, sheet_name: &str) -> Self {
        Self {
            tab: SheetTab::new(store, sheet_name, &USER_SCHEMA),
        }
    }

    pub async fn load(&self) -> Result<SheetTable, AppError> {
        self.tab.load().await
    }

    pub fn to_user(row: &SheetRow<'_>) -> SecretaryUser {
        SecretaryUser {
            row_index: row.row_index,
            id: row.get("id").to_string(),
            username: row.get("username").to_string(),
            email: row.get("email").to_string(),
            nome_completo: row.get("nome_completo").to_string(),
            password_hash: row.get("password_hash").to_string(),
            status: row.get("status").to_string(),
            created_at: row.get("created_at").to_string(),
            updated_at: row.get("updated_at").to_string(),
        }
    }

    /// Usuários cadastrados; linhas limpas (excluídas) ficam de fora.
    pub fn users(table: &SheetTable) -> Vec<SecretaryUser> {
        table
            .records()
            .filter(|row| !row.get("id").is_empty())
            .map(|row| Self::to_user(&row))
            .collect()
    }

    pub async fn list(&self) -> Result<Vec<SecretaryUser>, AppError> {
        let table = self.load().await?;
        Ok(Self::users(&table))
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<SecretaryUser>, AppError> {
        Ok(self.list().await?.into_iter().find(|u| u.id == id))
    }

    /// Busca por usuário ou e-mail, sem diferenciar maiúsculas.
    pub async fn find_by_login(&self, login: &str) -> Result<Option<SecretaryUser>, AppError> {
        let login = login.trim();
        Ok(self.list().await?.into_iter().find(|u| {
            u.username.eq_ignore_ascii_case(login)
                || (!u.email.is_empty() && u.email.eq_ignore_ascii_case(login))
        }))
    }

    pub async fn append(&self, table: &SheetTable, user: &SecretaryUser) -> Result<(), AppError> {
        let cells = [
            ("id", user.id.clone()),
            ("username", user.username.clone()),
            ("email", user.email.clone()),
            ("nome_completo", user.nome_completo.clone()),
            ("password_hash", user.password_hash.clone()),
            ("status", user.status.clone()),
            ("created_at", user.created_at.clone()),
            ("updated_at", user.updated_at.clone()),
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

    pub async fn clear(&self, row_index: usize) -> Result<(), AppError> {
        self.tab.clear(row_index).await
    }

    pub async fn ensure_exists(&self) -> Result<(), AppError> {
        self.tab.ensure_exists().await
    }
}
