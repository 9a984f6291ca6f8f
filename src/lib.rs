//! Credentialing service library: configuration, HTTP surface,
//! middleware and domain services.

pub mod config;
pub mod core;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod startup;
