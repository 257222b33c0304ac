// src/google/auth.rs

//! Autenticação com a conta de serviço do Google (JWT bearer grant).
//!
//! Monta um JWT RS256 assinado com a chave privada da conta de serviço,
//! troca pelo access token no endpoint OAuth2 e guarda o token até perto
//! da expiração. Todas as chamadas às planilhas passam por aqui.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::common::error::AppError;

pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const SCOPE_SPREADSHEETS: &str = "https://www.googleapis.com/auth/spreadsheets";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
// Renova o token um minuto antes de expirar
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Clone)]
pub struct ServiceAccountCredentials {
    pub client_email: String,
    pub private_key: String,
}

impl ServiceAccountCredentials {
    /// A chave costuma chegar pela variável de ambiente com `\n` literais.
    pub fn new(client_email: impl Into<String>, private_key: &str) -> Self {
        Self {
            client_email: client_email.into(),
            private_key: private_key.replace("\\n", "\n"),
        }
    }
}

// A chave privada nunca aparece em logs
impl std::fmt::Debug for ServiceAccountCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountCredentials")
            .field("client_email", &self.client_email)
            .field("private_key", &"***")
            .finish()
    }
}

// Claims do JWT enviado ao Google
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceAccountClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ServiceAccountAuth {
    credentials: Option<ServiceAccountCredentials>,
    http_client: reqwest::Client,
    token_url: String,
    cache: Arc<Mutex<Option<CachedToken>>>,
}

impl ServiceAccountAuth {
    pub fn new(credentials: Option<ServiceAccountCredentials>, http_client: reqwest::Client) -> Self {
        Self {
            credentials,
            http_client,
            token_url: GOOGLE_TOKEN_URL.to_string(),
            cache: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    fn credentials(&self) -> Result<&ServiceAccountCredentials, AppError> {
        self.credentials
            .as_ref()
            .ok_or(AppError::CredentialsNotConfigured("GOOGLE_SERVICE_ACCOUNT_EMAIL/GOOGLE_PRIVATE_KEY"))
    }

    /// Gera a asserção JWT (header.payload.assinatura) para o grant.
    pub fn build_assertion(&self, now: DateTime<Utc>) -> Result<String, AppError> {
        let credentials = self.credentials()?;

        let claims = ServiceAccountClaims {
            iss: credentials.client_email.clone(),
            scope: SCOPE_SPREADSHEETS.to_string(),
            aud: GOOGLE_TOKEN_URL.to_string(),
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };

        let key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes()).map_err(|e| {
            tracing::error!("🔥 GOOGLE_PRIVATE_KEY não pôde ser lida: {}", e);
            AppError::CredentialsNotConfigured("GOOGLE_PRIVATE_KEY inválida")
        })?;

        Ok(encode(&Header::new(Algorithm::RS256), &claims, &key)?)
    }

    /// Devolve um access token válido, usando o cache quando possível.
    pub async fn access_token(&self) -> Result<String, AppError> {
        // O lock fica preso durante a troca: requisições simultâneas esperam
        // o mesmo token em vez de assinar várias vezes.
        let mut cache = self.cache.lock().await;

        if let Some(cached) = cache.as_ref() {
            if Utc::now() < cached.expires_at {
                return Ok(cached.access_token.clone());
            }
        }

        let now = Utc::now();
        let assertion = self.build_assertion(now)?;

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("❌ Token do Google recusado (status {})", status.as_u16());
            return Err(AppError::TokenRequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS);

        *cache = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at: now + Duration::seconds(lifetime - EXPIRY_MARGIN_SECS),
        });

        tracing::debug!("🔑 Novo access token do Google válido por {}s", lifetime);
        Ok(token.access_token)
    }

    /// Descarta o token em cache (ex.: depois de um 401 das planilhas).
    pub async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) const TEST_PRIVATE_KEY: &str = include_str!("../../fixtures/test_service_account_key.pem");
    const TEST_PUBLIC_KEY: &str = include_str!("../../fixtures/test_service_account_pub.pem");

    pub(crate) fn test_credentials() -> ServiceAccountCredentials {
        ServiceAccountCredentials::new("eetad@projeto.iam.gserviceaccount.com", TEST_PRIVATE_KEY)
    }

    #[test]
    fn assertion_carries_google_claims() {
        let auth = ServiceAccountAuth::new(Some(test_credentials()), reqwest::Client::new());
        let jwt = auth.build_assertion(Utc::now()).unwrap();

        let header = decode_header(&jwt).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(header.typ.as_deref(), Some("JWT"));

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[GOOGLE_TOKEN_URL]);
        let data = decode::<ServiceAccountClaims>(
            &jwt,
            &DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY.as_bytes()).unwrap(),
            &validation,
        )
        .unwrap();

        assert_eq!(data.claims.iss, "eetad@projeto.iam.gserviceaccount.com");
        assert_eq!(data.claims.scope, SCOPE_SPREADSHEETS);
        assert_eq!(data.claims.exp - data.claims.iat, 3600);
    }

    #[test]
    fn escaped_newlines_in_env_key_are_restored() {
        let escaped = TEST_PRIVATE_KEY.replace('\n', "\\n");
        let creds = ServiceAccountCredentials::new("a@b", &escaped);
        assert_eq!(creds.private_key, TEST_PRIVATE_KEY);
    }

    #[tokio::test]
    async fn missing_credentials_is_a_configuration_error() {
        let auth = ServiceAccountAuth::new(None, reqwest::Client::new());
        let err = auth.access_token().await.unwrap_err();
        assert!(matches!(err, AppError::CredentialsNotConfigured(_)));
    }

    #[tokio::test]
    async fn garbage_key_is_a_configuration_error() {
        let creds = ServiceAccountCredentials::new("a@b", "not a pem");
        let auth = ServiceAccountAuth::new(Some(creds), reqwest::Client::new());
        let err = auth.build_assertion(Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::CredentialsNotConfigured(_)));
    }

    #[tokio::test]
    async fn token_is_exchanged_once_and_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant-type%3Ajwt-bearer"))
            .and(body_string_contains("assertion="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.token",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let auth = ServiceAccountAuth::new(Some(test_credentials()), reqwest::Client::new())
            .with_token_url(format!("{}/token", server.uri()));

        assert_eq!(auth.access_token().await.unwrap(), "ya29.token");
        assert_eq!(auth.access_token().await.unwrap(), "ya29.token");
    }

    #[tokio::test]
    async fn rejected_exchange_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })))
            .mount(&server)
            .await;

        let auth = ServiceAccountAuth::new(Some(test_credentials()), reqwest::Client::new())
            .with_token_url(format!("{}/token", server.uri()));

        match auth.access_token().await.unwrap_err() {
            AppError::TokenRequestFailed { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("invalid_grant"));
            }
            other => panic!("erro inesperado: {other:?}"),
        }
    }
}
