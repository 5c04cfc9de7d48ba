//! Error types for vault-rs

use thiserror::Error;

/// Errors that can occur when reading secrets from Vault
#[derive(Error, Debug)]
pub enum VaultError {
    /// HTTP transport error (connection refused, TLS, timeouts)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Vault address could not be parsed as a URL
    #[error("Invalid Vault address: {0}")]
    InvalidAddress(String),

    /// Nothing stored at the requested path
    #[error("Secret not found: {0}")]
    SecretNotFound(String),

    /// Token rejected, or its policy does not cover the path
    #[error("Permission denied reading secret: {0}")]
    PermissionDenied(String),

    /// Any other non-success HTTP status
    #[error("Vault returned status {code}: {body}")]
    Status { code: u16, body: String },

    /// Response body did not have the expected structure
    #[error("Malformed Vault response: {0}")]
    MalformedResponse(String),

    /// Secret exists but lacks the requested field
    #[error("Field '{field}' missing from secret {path}")]
    MissingField { path: String, field: String },

    /// Secret field exists but is not a string
    #[error("Field '{field}' in secret {path} is not a string")]
    FieldNotString { path: String, field: String },
}

impl VaultError {
    /// Whether the store could not be reached or refused the token
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            VaultError::Http(_) | VaultError::InvalidAddress(_) | VaultError::PermissionDenied(_)
        )
    }
}
