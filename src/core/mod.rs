//! Core domain services: password hashing, email delivery, CNPJ
//! registry lookups and document storage.

pub mod cnpj;
pub mod document_store;
pub mod email_provider;
pub mod messages;
pub mod password;

pub use cnpj::{CnpjService, CnpjValidation};
pub use document_store::DocumentStore;
pub use email_provider::{EmailMessage, EmailProvider};
