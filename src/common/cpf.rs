// src/common/cpf.rs

use validator::ValidationError;

/// Mantém apenas os dígitos do CPF ("617.677.351-20" -> "61767735120").
/// As planilhas guardam CPFs com e sem pontuação; toda comparação passa por aqui.
pub fn normalize_cpf(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Confere os dois dígitos verificadores do CPF.
pub fn is_valid_cpf(raw: &str) -> bool {
    let digits: Vec<u32> = normalize_cpf(raw)
        .chars()
        .filter_map(|c| c.to_digit(10))
        .collect();

    if digits.len() != 11 {
        return false;
    }
    // "111.111.111-11" passa no cálculo mas não é um CPF válido
    if digits.iter().all(|d| *d == digits[0]) {
        return false;
    }

    let check = |len: usize| -> u32 {
        let sum: u32 = digits[..len]
            .iter()
            .enumerate()
            .map(|(i, d)| d * (len as u32 + 1 - i as u32))
            .sum();
        let rest = sum % 11;
        if rest < 2 { 0 } else { 11 - rest }
    };

    check(9) == digits[9] && check(10) == digits[10]
}

// Usado com `#[validate(custom(function = "validate_cpf"))]`
pub fn validate_cpf(cpf: &str) -> Result<(), ValidationError> {
    if is_valid_cpf(cpf) {
        Ok(())
    } else {
        let mut err = ValidationError::new("cpf");
        err.message = Some("CPF inválido.".into());
        Err(err)
    }
}
