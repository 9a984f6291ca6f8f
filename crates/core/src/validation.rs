//! Request validation helpers.
//!
//! Field-level checks shared by the intake and review surfaces. Failures
//! accumulate into a [`Violations`] collector so a submission reports every
//! problem at once instead of failing on the first field, mirroring how
//! form consumers expect validation errors to arrive.

use crate::error::{AppError, FieldViolation};

/// Minimum password length for back-office accounts.
pub const MIN_PASSWORD_LENGTH: usize = 8;
/// Maximum email length.
pub const MAX_EMAIL_LENGTH: usize = 255;
/// Maximum name length.
pub const MAX_NAME_LENGTH: usize = 255;

/// Accumulator for field violations.
///
/// Collect with [`Violations::add`], then [`Violations::finish`] returns
/// `Err(AppError::Validation)` when anything was recorded.
#[derive(Debug, Default)]
pub struct Violations {
    items: Vec<FieldViolation>,
}

impl Violations {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, description: impl Into<String>) {
        self.items.push(FieldViolation::new(field, description));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Convert into a result, consuming the collector.
    ///
    /// # Errors
    /// Returns `AppError::Validation` with every recorded violation.
    pub fn finish(self) -> Result<(), AppError> {
        if self.items.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.items))
        }
    }
}

/// Validate password strength beyond basic length.
///
/// # Errors
/// Returns `AppError::Validation` if the password is too short or lacks
/// required characters.
pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::invalid(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
        ));
    }

    let has_letter = password.chars().any(char::is_alphabetic);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if !has_letter || !has_digit {
        return Err(AppError::invalid(
            "password",
            "Password must contain at least one letter and one number",
        ));
    }

    Ok(())
}

/// Syntactic email check. Anything stricter belongs to the mail provider.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.len() > MAX_EMAIL_LENGTH {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

/// Brazilian state code check (two uppercase letters).
#[must_use]
pub fn is_valid_uf(state: &str) -> bool {
    state.len() == 2 && state.chars().all(|c| c.is_ascii_uppercase())
}

/// Record a violation when a required text field is empty.
pub fn require_text(violations: &mut Violations, field: &str, value: &str) {
    if value.trim().is_empty() {
        violations.add(field, "This field is required");
    } else if value.len() > MAX_NAME_LENGTH {
        violations.add(
            field,
            format!("Must not exceed {MAX_NAME_LENGTH} characters"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_validation() {
        assert!(validate_password("password1").is_ok());
        assert!(validate_password("MySecure123").is_ok());
        assert!(validate_password("short1").is_err());
        assert!(validate_password("onlyletters").is_err());
        assert!(validate_password("12345678").is_err());
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("test.user@domain.org"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("nodomain"));
        assert!(!is_valid_email("user@nodot"));
    }

    #[test]
    fn uf_validation() {
        assert!(is_valid_uf("SP"));
        assert!(is_valid_uf("RJ"));
        assert!(!is_valid_uf("sp"));
        assert!(!is_valid_uf("SPP"));
        assert!(!is_valid_uf("S"));
    }

    #[test]
    fn violations_accumulate() {
        let mut v = Violations::new();
        require_text(&mut v, "full_name", "");
        require_text(&mut v, "city", "São Paulo");
        v.add("cpf", "CPF must contain 11 digits");

        let err = v.finish().unwrap_err();
        match err {
            AppError::Validation(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].field, "full_name");
                assert_eq!(items[1].field, "cpf");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_violations_pass() {
        assert!(Violations::new().finish().is_ok());
    }
}
