//! CPF/CNPJ normalization and masking.
//!
//! Tax ids arrive with or without punctuation (`123.456.789-01`,
//! `12.345.678/0001-99`). Storage and comparison always use the bare
//! digit form; anything user-visible outside the review UI is masked.

/// Digits in a CPF.
pub const CPF_LEN: usize = 11;
/// Digits in a CNPJ.
pub const CNPJ_LEN: usize = 14;

/// Strip everything but ASCII digits.
#[must_use]
pub fn digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Whether the value has the digit count of a CPF.
#[must_use]
pub fn is_cpf(value: &str) -> bool {
    value.len() == CPF_LEN && value.chars().all(|c| c.is_ascii_digit())
}

/// Whether the value has the digit count of a CNPJ.
#[must_use]
pub fn is_cnpj(value: &str) -> bool {
    value.len() == CNPJ_LEN && value.chars().all(|c| c.is_ascii_digit())
}

/// Mask a CPF for display outside the review UI: `123.***.***`.
///
/// Keeps only the first three digits. Values shorter than three
/// characters are fully masked.
#[must_use]
pub fn mask_cpf(cpf: &str) -> String {
    let digits = digits(cpf);
    let prefix = digits.get(..3).unwrap_or("***");
    format!("{prefix}.***.***")
}

/// Mask a CNPJ for display outside the review UI: `12.***.***`.
#[must_use]
pub fn mask_cnpj(cnpj: &str) -> String {
    let digits = digits(cnpj);
    let prefix = digits.get(..2).unwrap_or("**");
    format!("{prefix}.***.***")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation() {
        assert_eq!(digits("123.456.789-01"), "12345678901");
        assert_eq!(digits("12.345.678/0001-99"), "12345678000199");
        assert_eq!(digits("abc"), "");
    }

    #[test]
    fn length_checks() {
        assert!(is_cpf("12345678901"));
        assert!(!is_cpf("1234567890"));
        assert!(!is_cpf("123456789012"));
        assert!(!is_cpf("1234567890a"));
        assert!(is_cnpj("12345678000199"));
        assert!(!is_cnpj("12345678901"));
    }

    #[test]
    fn cpf_mask_keeps_first_three_digits() {
        assert_eq!(mask_cpf("12345678901"), "123.***.***");
        assert_eq!(mask_cpf("123.456.789-01"), "123.***.***");
        assert!(!mask_cpf("12345678901").contains("45678901"));
    }

    #[test]
    fn cnpj_mask_keeps_first_two_digits() {
        assert_eq!(mask_cnpj("12345678000199"), "12.***.***");
        assert_eq!(mask_cnpj("12.345.678/0001-99"), "12.***.***");
    }

    #[test]
    fn short_values_fully_masked() {
        assert_eq!(mask_cpf("12"), "***.***.***");
        assert_eq!(mask_cnpj("1"), "**.***.***");
    }
}
