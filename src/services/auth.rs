// src/services/auth.rs

use std::collections::HashMap;
use std::sync::Arc;

use bcrypt::{hash, verify};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tokio::sync::Mutex;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{error::AppError, sheet_table::SheetTable},
    db::UserRepository,
    models::secretary::{
        AuthResponse, Claims, CreateUserPayload, ManageUsersRequest, ManageUsersResponse,
        SecretaryUser, UpdateUserPayload, STATUS_ACTIVE, STATUS_INACTIVE,
    },
};

/// Hash do sistema antigo: `h = ((h << 5) - h) + unidade UTF-16` em 32 bits,
/// valor absoluto em hexadecimal minúsculo. Só serve para aceitar senhas
/// antigas; toda senha nova vai para bcrypt.
pub fn legacy_hash(password: &str) -> String {
    let mut h: i32 = 0;
    for unit in password.encode_utf16() {
        h = (h << 5).wrapping_sub(h).wrapping_add(i32::from(unit));
    }
    format!("{:x}", i64::from(h).abs())
}

fn is_bcrypt_hash(stored: &str) -> bool {
    stored.starts_with("$2")
}

// Abas antigas de usuários não têm a coluna "Atualizado Em"
fn touch(table: &SheetTable, fields: &mut Vec<(&'static str, String)>) {
    if table.column("updated_at").is_some() {
        fields.push(("updated_at", Utc::now().to_rfc3339()));
    }
}

#[derive(Debug, Clone)]
struct Session {
    user_id: String,
    expires_at: DateTime<Utc>,
}

// Sessões vivas no servidor. O JWT só vale enquanto a sessão existir.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<Uuid, Session>>>,
}

impl SessionStore {
    async fn create(&self, user_id: &str, expires_at: DateTime<Utc>) -> Uuid {
        let sid = Uuid::new_v4();
        let mut sessions = self.sessions.lock().await;
        let now = Utc::now();
        sessions.retain(|_, s| s.expires_at > now);
        sessions.insert(
            sid,
            Session {
                user_id: user_id.to_string(),
                expires_at,
            },
        );
        sid
    }

    /// Dono da sessão, se ela ainda vale. Sessão vencida sai do mapa.
    async fn owner(&self, sid: &Uuid) -> Option<String> {
        let mut sessions = self.sessions.lock().await;
        match sessions.get(sid) {
            Some(session) if session.expires_at > Utc::now() => Some(session.user_id.clone()),
            Some(_) => {
                sessions.remove(sid);
                None
            }
            None => None,
        }
    }

    async fn remove(&self, sid: &Uuid) -> bool {
        self.sessions.lock().await.remove(sid).is_some()
    }

    async fn remove_user(&self, user_id: &str) {
        self.sessions.lock().await.retain(|_, s| s.user_id != user_id);
    }
}

// Usuário autenticado + sessão usada na requisição
#[derive(Debug, Clone)]
pub struct SecretarySession {
    pub user: SecretaryUser,
    pub sid: Uuid,
}

#[derive(Clone)]
pub struct AuthService {
    users: UserRepository,
    sessions: SessionStore,
    jwt_secret: String,
    session_hours: i64,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(users: UserRepository, jwt_secret: String, session_hours: i64) -> Self {
        Self {
            users,
            sessions: SessionStore::default(),
            jwt_secret,
            session_hours,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }

    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    async fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let password = password.to_owned();
        let cost = self.bcrypt_cost;
        // Executa o hashing em um thread separado
        let hashed = tokio::task::spawn_blocking(move || hash(&password, cost))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
        Ok(hashed)
    }

    async fn verify_password(&self, password: &str, stored: &str) -> Result<bool, AppError> {
        if !is_bcrypt_hash(stored) {
            return Ok(!stored.is_empty() && legacy_hash(password).eq_ignore_ascii_case(stored));
        }
        let password = password.to_owned();
        let stored = stored.to_owned();
        let valid = tokio::task::spawn_blocking(move || verify(&password, &stored))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;
        Ok(valid)
    }

    pub async fn login(&self, login: &str, password: &str) -> Result<AuthResponse, AppError> {
        let user = self
            .users
            .find_by_login(login)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !self.verify_password(password, &user.password_hash).await? {
            tracing::warn!("🔒 Senha incorreta para '{}'", user.username);
            return Err(AppError::InvalidCredentials);
        }
        if !user.is_active() {
            return Err(AppError::InactiveUser);
        }

        if !is_bcrypt_hash(&user.password_hash) {
            // Linha do sistema antigo: troca o hash por bcrypt
            if let Err(e) = self.upgrade_legacy_hash(&user, password).await {
                tracing::warn!("⚠️ Não foi possível atualizar o hash de '{}': {:?}", user.username, e);
            }
        }

        let now = Utc::now();
        let expires_at = now + Duration::hours(self.session_hours);
        let sid = self.sessions.create(&user.id, expires_at).await;
        let token = self.create_token(&user.id, sid, now, expires_at)?;

        tracing::info!("🔓 Login de '{}'", user.username);
        Ok(AuthResponse {
            success: true,
            token,
            expires_at: expires_at.to_rfc3339(),
            user,
        })
    }

    async fn upgrade_legacy_hash(&self, user: &SecretaryUser, password: &str) -> Result<(), AppError> {
        let hashed = self.hash_password(password).await?;
        let table = self.users.load().await?;
        let mut fields = vec![("password_hash", hashed)];
        touch(&table, &mut fields);
        self.users.update_fields(&table, user.row_index, &fields).await
    }

    pub async fn logout(&self, sid: &Uuid) -> bool {
        self.sessions.remove(sid).await
    }

    pub async fn validate_token(&self, token: &str) -> Result<SecretarySession, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;
        let claims = token_data.claims;

        let owner = self
            .sessions
            .owner(&claims.sid)
            .await
            .ok_or(AppError::SessionExpired)?;
        if owner != claims.sub {
            return Err(AppError::InvalidToken);
        }

        let user = self
            .users
            .find_by_id(&claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)?;
        if !user.is_active() {
            return Err(AppError::InactiveUser);
        }

        Ok(SecretarySession { user, sid: claims.sid })
    }

    fn create_token(
        &self,
        user_id: &str,
        sid: Uuid,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let claims = Claims {
            sub: user_id.to_string(),
            sid,
            exp: expires_at.timestamp() as usize,
            iat: issued_at.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }

    /// Ações do manage-secretary-users. Sem sessão, só o primeiro `create`
    /// (planilha sem nenhum usuário) é aceito.
    pub async fn manage_users(
        &self,
        request: ManageUsersRequest,
        actor: Option<&SecretarySession>,
    ) -> Result<ManageUsersResponse, AppError> {
        if actor.is_none() {
            let bootstrap = matches!(request, ManageUsersRequest::Create(_))
                && self.is_bootstrap().await?;
            if !bootstrap {
                return Err(AppError::InvalidToken);
            }
            tracing::info!("🌱 Criando o primeiro usuário da secretaria");
        }

        match request {
            ManageUsersRequest::List => Ok(ManageUsersResponse {
                success: true,
                users: Some(self.users.list().await?),
                user: None,
            }),
            ManageUsersRequest::Create(payload) => {
                let user = self.create_user(&payload).await?;
                Ok(ManageUsersResponse {
                    success: true,
                    users: None,
                    user: Some(user),
                })
            }
            ManageUsersRequest::Update(payload) => {
                let user = self.update_user(&payload).await?;
                Ok(ManageUsersResponse {
                    success: true,
                    users: None,
                    user: Some(user),
                })
            }
            ManageUsersRequest::Delete { id } => {
                if actor.is_some_and(|a| a.user.id == id) {
                    return Err(AppError::BadRequest("não é possível excluir o próprio usuário".into()));
                }
                self.delete_user(&id).await?;
                Ok(ManageUsersResponse {
                    success: true,
                    users: None,
                    user: None,
                })
            }
        }
    }

    async fn is_bootstrap(&self) -> Result<bool, AppError> {
        self.users.ensure_exists().await?;
        Ok(self.users.list().await?.is_empty())
    }

    pub async fn create_user(&self, payload: &CreateUserPayload) -> Result<SecretaryUser, AppError> {
        payload.validate()?;
        self.users.ensure_exists().await?;

        let table = self.users.load().await?;
        let existing = UserRepository::users(&table);
        let username = payload.username.trim();
        let email = payload.email.trim();
        if existing.iter().any(|u| {
            u.username.eq_ignore_ascii_case(username) || u.email.eq_ignore_ascii_case(email)
        }) {
            return Err(AppError::UserAlreadyExists);
        }

        let now = Utc::now().to_rfc3339();
        let user = SecretaryUser {
            row_index: 0,
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            email: email.to_string(),
            nome_completo: payload.nome_completo.trim().to_string(),
            password_hash: self.hash_password(&payload.password).await?,
            status: STATUS_ACTIVE.to_string(),
            created_at: now.clone(),
            updated_at: now,
        };
        self.users.append(&table, &user).await?;

        tracing::info!("👤 Usuário '{}' criado", user.username);
        Ok(user)
    }

    pub async fn update_user(&self, payload: &UpdateUserPayload) -> Result<SecretaryUser, AppError> {
        payload.validate()?;

        let table = self.users.load().await?;
        let users = UserRepository::users(&table);
        let mut user = users
            .iter()
            .find(|u| u.id == payload.id)
            .cloned()
            .ok_or(AppError::UserNotFound)?;

        let mut fields: Vec<(&'static str, String)> = Vec::new();

        if let Some(email) = payload.email.as_deref().map(str::trim) {
            if users
                .iter()
                .any(|u| u.id != user.id && u.email.eq_ignore_ascii_case(email))
            {
                return Err(AppError::UserAlreadyExists);
            }
            user.email = email.to_string();
            fields.push(("email", user.email.clone()));
        }
        if let Some(nome) = payload.nome_completo.as_deref().map(str::trim) {
            user.nome_completo = nome.to_string();
            fields.push(("nome_completo", user.nome_completo.clone()));
        }
        if let Some(status) = payload.status.as_deref().map(|s| s.trim().to_lowercase()) {
            if status != STATUS_ACTIVE && status != STATUS_INACTIVE {
                return Err(AppError::BadRequest(format!("status inválido: {}", status)));
            }
            user.status = status;
            fields.push(("status", user.status.clone()));
        }
        if let Some(password) = payload.password.as_deref() {
            user.password_hash = self.hash_password(password).await?;
            fields.push(("password_hash", user.password_hash.clone()));
        }

        user.updated_at = Utc::now().to_rfc3339();
        touch(&table, &mut fields);
        self.users.update_fields(&table, user.row_index, &fields).await?;

        if !user.is_active() || payload.password.is_some() {
            self.sessions.remove_user(&user.id).await;
        }

        tracing::info!("👤 Usuário '{}' atualizado", user.username);
        Ok(user)
    }

    pub async fn delete_user(&self, id: &str) -> Result<(), AppError> {
        let user = self.users.find_by_id(id).await?.ok_or(AppError::UserNotFound)?;
        self.users.clear(user.row_index).await?;
        self.sessions.remove_user(&user.id).await;
        tracing::info!("🗑️ Usuário '{}' excluído", user.username);
        Ok(())
    }
}
