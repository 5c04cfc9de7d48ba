//! Secret payloads and the shapes Vault returns them in

use crate::error::VaultError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Where secret fields live inside the `data` object of a read response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretShape {
    /// KV v1 engine: fields directly under `data`
    Flat,
    /// KV v2 engine: fields under `data.data`
    Nested,
    /// `data.data` when it is an object, otherwise `data`
    #[default]
    Auto,
}

impl std::fmt::Display for SecretShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretShape::Flat => write!(f, "flat"),
            SecretShape::Nested => write!(f, "nested"),
            SecretShape::Auto => write!(f, "auto"),
        }
    }
}

/// A secret as read from a single path
#[derive(Debug, Clone)]
pub struct Secret {
    /// Logical path the secret was read from
    pub path: String,
    /// The response's `data` object
    pub data: Map<String, Value>,
}

impl Secret {
    pub fn new(path: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }

    /// Secret fields according to the given shape
    pub fn fields(&self, shape: SecretShape) -> Result<&Map<String, Value>, VaultError> {
        let nested = self.data.get("data").and_then(Value::as_object);
        match shape {
            SecretShape::Flat => Ok(&self.data),
            SecretShape::Nested => nested.ok_or_else(|| {
                VaultError::MalformedResponse(format!(
                    "secret {} has no nested data object",
                    self.path
                ))
            }),
            SecretShape::Auto => Ok(nested.unwrap_or(&self.data)),
        }
    }

    /// Look up a string field
    pub fn string_field(&self, shape: SecretShape, field: &str) -> Result<&str, VaultError> {
        let value = self
            .fields(shape)?
            .get(field)
            .ok_or_else(|| VaultError::MissingField {
                path: self.path.clone(),
                field: field.to_string(),
            })?;

        value.as_str().ok_or_else(|| VaultError::FieldNotString {
            path: self.path.clone(),
            field: field.to_string(),
        })
    }
}
