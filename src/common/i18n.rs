// src/common/i18n.rs

use std::collections::HashMap;

pub const DEFAULT_LANG: &str = "pt";

// Mensagens de erro por idioma. Placeholders no formato `{nome}`.
const PT: &[(&str, &str)] = &[
    ("validation.invalid_fields", "Um ou mais campos são inválidos."),
    ("request.bad_request", "Requisição inválida: {detail}"),
    ("config.credentials_not_configured", "Credenciais não configuradas: {what}"),
    ("google.token_request_failed", "Falha ao obter token do Google (status {status})"),
    ("upstream.failed", "{service} respondeu com status {status}"),
    ("upstream.unreachable", "Falha de comunicação com o serviço externo."),
    ("sheets.missing_header", "A aba '{sheet}' não possui a coluna obrigatória '{header}'."),
    ("students.not_found", "Aluno não encontrado."),
    ("students.cpf_already_registered", "Este CPF já possui cadastro."),
    ("payments.not_found", "Pagamento não encontrado."),
    ("payments.invalid_webhook_signature", "Assinatura do webhook inválida."),
    ("users.not_found", "Usuário não encontrado."),
    ("users.already_exists", "Usuário ou e-mail já cadastrado."),
    ("auth.invalid_credentials", "Usuário ou senha inválidos."),
    ("auth.inactive_user", "Usuário inativo."),
    ("auth.invalid_token", "Token de autenticação inválido ou ausente."),
    ("auth.session_expired", "Sessão expirada. Faça login novamente."),
    ("internal.unexpected", "Ocorreu um erro inesperado."),
];

const EN: &[(&str, &str)] = &[
    ("validation.invalid_fields", "One or more fields are invalid."),
    ("request.bad_request", "Bad request: {detail}"),
    ("config.credentials_not_configured", "credentials not configured: {what}"),
    ("google.token_request_failed", "token request failed with status {status}"),
    ("upstream.failed", "{service} failed with status {status}"),
    ("upstream.unreachable", "Could not reach the external service."),
    ("sheets.missing_header", "Sheet '{sheet}' is missing the required column '{header}'."),
    ("students.not_found", "Student not found."),
    ("students.cpf_already_registered", "This CPF is already registered."),
    ("payments.not_found", "Payment not found."),
    ("payments.invalid_webhook_signature", "Invalid webhook signature."),
    ("users.not_found", "User not found."),
    ("users.already_exists", "Username or e-mail already in use."),
    ("auth.invalid_credentials", "Invalid username or password."),
    ("auth.inactive_user", "Inactive user."),
    ("auth.invalid_token", "Missing or invalid authentication token."),
    ("auth.session_expired", "Session expired. Please log in again."),
    ("internal.unexpected", "An unexpected error occurred."),
];

#[derive(Debug)]
pub struct I18nStore {
    messages: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl I18nStore {
    pub fn new() -> Self {
        let mut messages = HashMap::new();
        messages.insert("pt", PT.iter().copied().collect());
        messages.insert("en", EN.iter().copied().collect());
        Self { messages }
    }

    // Idioma desconhecido cai no português; chave desconhecida volta como está
    pub fn message(&self, lang: &str, key: &str) -> String {
        self.messages
            .get(lang)
            .and_then(|table| table.get(key))
            .or_else(|| self.messages.get(DEFAULT_LANG).and_then(|table| table.get(key)))
            .map(|m| m.to_string())
            .unwrap_or_else(|| key.to_string())
    }

    pub fn format(&self, lang: &str, key: &str, args: &[(&str, String)]) -> String {
        args.iter().fold(self.message(lang, key), |msg, (name, value)| {
            msg.replace(&format!("{{{}}}", name), value)
        })
    }
}

impl Default for I18nStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_language_falls_back_to_portuguese() {
        let store = I18nStore::new();
        assert_eq!(store.message("de", "students.not_found"), "Aluno não encontrado.");
    }

    #[test]
    fn placeholders_are_replaced() {
        let store = I18nStore::new();
        let msg = store.format("en", "upstream.failed", &[
            ("service", "MercadoPago".to_string()),
            ("status", "502".to_string()),
        ]);
        assert_eq!(msg, "MercadoPago failed with status 502");
    }

    #[test]
    fn every_key_has_both_languages() {
        let pt: Vec<_> = PT.iter().map(|(k, _)| *k).collect();
        let en: Vec<_> = EN.iter().map(|(k, _)| *k).collect();
        assert_eq!(pt, en);
    }
}
