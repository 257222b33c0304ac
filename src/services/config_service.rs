// src/services/config_service.rs

use crate::{
    config::{RuntimeConfig, RuntimeSettings, Settings},
    models::settings::{EnvConfigStatus, EnvVarStatus, UpdateEnvConfigPayload},
};

const SECRET_MARKERS: [&str; 4] = ["KEY", "SECRET", "TOKEN", "PASSWORD"];

fn is_secret(name: &str) -> bool {
    SECRET_MARKERS.iter().any(|m| name.contains(m))
}

/// Mostra só as pontas do segredo: "APP_USR-123...4321" vira "APP_***4321".
pub fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}***{}", head, tail)
}

fn describe(name: &str, value: Option<&str>) -> EnvVarStatus {
    EnvVarStatus {
        name: name.to_string(),
        configured: value.is_some(),
        preview: value.map(|v| if is_secret(name) { mask(v) } else { v.to_string() }),
    }
}

// Campo vazio no POST apaga o valor
fn apply(target: &mut Option<String>, incoming: Option<String>) -> bool {
    match incoming {
        Some(value) => {
            let value = value.trim().to_string();
            *target = (!value.is_empty()).then_some(value);
            true
        }
        None => false,
    }
}

#[derive(Clone)]
pub struct ConfigService {
    runtime: RuntimeSettings,
    // Valores fixos desde a inicialização
    startup: Vec<(&'static str, Option<String>)>,
}

impl ConfigService {
    pub fn new(runtime: RuntimeSettings, settings: &Settings) -> Self {
        let mut startup = vec![
            ("GOOGLE_SERVICE_ACCOUNT_EMAIL", settings.google_service_account_email.clone()),
            ("GOOGLE_PRIVATE_KEY", settings.google_private_key.clone()),
            ("MERCADOPAGO_NOTIFICATION_URL", settings.mercadopago_notification_url.clone()),
            ("JWT_SECRET", Some(settings.jwt_secret.clone())),
            ("PENDING_CRITERION", Some(format!("{:?}", settings.pending_criterion).to_lowercase())),
        ];
        startup.extend(settings.reported_env.iter().cloned());

        Self { runtime, startup }
    }

    pub fn status(&self) -> EnvConfigStatus {
        let RuntimeConfig {
            spreadsheet_id,
            mercadopago_access_token,
            mercadopago_webhook_secret,
        } = self.runtime.snapshot();

        let mut variables = vec![
            describe("GOOGLE_SHEETS_SPREADSHEET_ID", spreadsheet_id.as_deref()),
            describe("MERCADOPAGO_ACCESS_TOKEN", mercadopago_access_token.as_deref()),
            describe("MERCADOPAGO_WEBHOOK_SECRET", mercadopago_webhook_secret.as_deref()),
        ];
        variables.extend(
            self.startup
                .iter()
                .map(|(name, value)| describe(name, value.as_deref())),
        );

        EnvConfigStatus {
            success: true,
            variables,
        }
    }

    pub fn update(&self, payload: UpdateEnvConfigPayload) -> EnvConfigStatus {
        let mut changed = Vec::new();
        self.runtime.update(|config| {
            if apply(&mut config.spreadsheet_id, payload.google_sheets_spreadsheet_id) {
                changed.push("GOOGLE_SHEETS_SPREADSHEET_ID");
            }
            if apply(&mut config.mercadopago_access_token, payload.mercadopago_access_token) {
                changed.push("MERCADOPAGO_ACCESS_TOKEN");
            }
            if apply(&mut config.mercadopago_webhook_secret, payload.mercadopago_webhook_secret) {
                changed.push("MERCADOPAGO_WEBHOOK_SECRET");
            }
        });

        if !changed.is_empty() {
            tracing::info!("🔧 Configuração atualizada em tempo de execução: {}", changed.join(", "));
        }
        self.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find<'a>(status: &'a EnvConfigStatus, name: &str) -> &'a EnvVarStatus {
        status.variables.iter().find(|v| v.name == name).unwrap()
    }

    #[test]
    fn masks_secret_values() {
        assert_eq!(mask("APP_USR-123456-4321"), "APP_***4321");
        assert_eq!(mask("curto"), "***");
    }

    #[test]
    fn status_hides_secrets_but_shows_identifiers() {
        let runtime = RuntimeSettings::new(RuntimeConfig {
            spreadsheet_id: Some("1AbCdEfGh".into()),
            mercadopago_access_token: Some("APP_USR-123456-4321".into()),
            mercadopago_webhook_secret: None,
        });
        let service = ConfigService::new(runtime, &Settings::for_tests());
        let status = service.status();

        assert_eq!(find(&status, "GOOGLE_SHEETS_SPREADSHEET_ID").preview.as_deref(), Some("1AbCdEfGh"));
        assert_eq!(find(&status, "MERCADOPAGO_ACCESS_TOKEN").preview.as_deref(), Some("APP_***4321"));
        assert!(!find(&status, "MERCADOPAGO_WEBHOOK_SECRET").configured);
        assert_eq!(find(&status, "JWT_SECRET").preview.as_deref(), Some("segr***este"));
        assert_eq!(find(&status, "PENDING_CRITERION").preview.as_deref(), Some("cpf"));
        assert!(!find(&status, "SMTP_HOST").configured);
    }

    #[test]
    fn update_overrides_and_clears_runtime_values() {
        let runtime = RuntimeSettings::new(RuntimeConfig {
            spreadsheet_id: Some("antiga".into()),
            mercadopago_access_token: Some("TOKEN-ANTIGO".into()),
            mercadopago_webhook_secret: None,
        });
        let service = ConfigService::new(runtime.clone(), &Settings::for_tests());

        service.update(UpdateEnvConfigPayload {
            google_sheets_spreadsheet_id: Some(" nova ".into()),
            mercadopago_access_token: Some("".into()),
            mercadopago_webhook_secret: None,
        });

        let config = runtime.snapshot();
        assert_eq!(config.spreadsheet_id.as_deref(), Some("nova"));
        assert_eq!(config.mercadopago_access_token, None);
        assert_eq!(config.mercadopago_webhook_secret, None);
    }
}
