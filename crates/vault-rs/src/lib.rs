//! vault-rs: minimal client for reading secrets from HashiCorp Vault
//!
//! Supports token authentication and logical reads from KV v1 and KV v2
//! engines. Nothing is cached; every read goes to the server.

pub mod client;
pub mod error;
pub mod secret;

pub use client::{SecretReader, VaultClient};
pub use error::VaultError;
pub use secret::{Secret, SecretShape};
