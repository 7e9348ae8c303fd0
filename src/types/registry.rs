// ABOUTME: Validated registry location such as "localhost:5000" or "registry.lan/team".
// ABOUTME: Rejects URL schemes and stray slashes so image references compose cleanly.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("registry cannot be empty")]
    Empty,

    #[error("registry must not include a URL scheme: {0}")]
    HasScheme(String),

    #[error("registry must not start or end with '/': {0}")]
    StraySlash(String),

    #[error("invalid character in registry: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Registry(String);

impl Registry {
    pub fn new(value: &str) -> Result<Self, RegistryError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(RegistryError::Empty);
        }

        if value.contains("://") {
            return Err(RegistryError::HasScheme(value.to_string()));
        }

        if value.starts_with('/') || value.ends_with('/') {
            return Err(RegistryError::StraySlash(value.to_string()));
        }

        for c in value.chars() {
            if !c.is_ascii_alphanumeric() && !matches!(c, '.' | '-' | '_' | ':' | '/') {
                return Err(RegistryError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
