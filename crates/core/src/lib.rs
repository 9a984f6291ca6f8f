//! Core library with shared types, traits, and error handling.
//!
//! This crate provides reusable components for the credentialing service:
//! - Error types with automatic HTTP response conversion
//! - JWT token generation and validation
//! - Field validation helpers and CPF/CNPJ handling

pub mod error;
pub mod jwt;
pub mod str_ext;
pub mod tax_id;
pub mod validation;

pub use error::{AppError, FieldViolation, OptionExt, ResultExt};
pub use jwt::{AuthInfo, JwtError, JwtSubject, JwtValidator, TokenPair, TokenUse, UserRole};
pub use str_ext::{OptionStrExt, StrExt};
pub use validation::Violations;
