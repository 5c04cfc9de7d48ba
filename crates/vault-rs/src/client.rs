//! Vault HTTP client
//!
//! Only the logical read endpoint is implemented: `GET /v1/<path>` with the
//! token in the `X-Vault-Token` header.

use crate::error::VaultError;
use crate::secret::Secret;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value};

const TOKEN_HEADER: &str = "X-Vault-Token";

/// Anything that can read a secret by logical path
#[async_trait]
pub trait SecretReader: Send + Sync {
    async fn read(&self, path: &str) -> Result<Secret, VaultError>;
}

/// Body of a logical read response; only `data` is used
#[derive(Debug, Deserialize)]
struct ReadResponse {
    data: Option<Map<String, Value>>,
}

/// Client for a single Vault server, authenticated with a static token
#[derive(Debug)]
pub struct VaultClient {
    http: Client,
    address: String,
    token: SecretString,
}

impl VaultClient {
    /// Create a client for `address` (e.g. `http://localhost:8200`)
    pub fn new(address: &str, token: SecretString) -> Result<Self, VaultError> {
        Url::parse(address)
            .map_err(|e| VaultError::InvalidAddress(format!("{}: {}", address, e)))?;

        let http = Client::builder().build()?;

        Ok(Self {
            http,
            address: address.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Address the client was created with, without a trailing slash
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Full URL of the logical read endpoint for `path`
    pub fn secret_url(&self, path: &str) -> Result<Url, VaultError> {
        let url = format!("{}/v1/{}", self.address, path.trim_start_matches('/'));
        Url::parse(&url).map_err(|e| VaultError::InvalidAddress(format!("{}: {}", url, e)))
    }

    /// Read the secret stored at `path`
    pub async fn read_secret(&self, path: &str) -> Result<Secret, VaultError> {
        let url = self.secret_url(path)?;
        tracing::debug!("Reading secret {} from {}", path, self.address);

        let resp = self
            .http
            .get(url)
            .header(TOKEN_HEADER, self.token.expose_secret())
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(VaultError::SecretNotFound(path.to_string()));
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(VaultError::PermissionDenied(path.to_string()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(VaultError::Status {
                code: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        let body = resp.text().await?;
        parse_read_response(path, &body)
    }
}

#[async_trait]
impl SecretReader for VaultClient {
    async fn read(&self, path: &str) -> Result<Secret, VaultError> {
        self.read_secret(path).await
    }
}

/// Parse the JSON body of a successful logical read
fn parse_read_response(path: &str, body: &str) -> Result<Secret, VaultError> {
    let resp: ReadResponse = serde_json::from_str(body)
        .map_err(|e| VaultError::MalformedResponse(format!("{}: {}", path, e)))?;

    let data = resp
        .data
        .ok_or_else(|| VaultError::MalformedResponse(format!("{}: response has no data", path)))?;

    Ok(Secret::new(path, data))
}
