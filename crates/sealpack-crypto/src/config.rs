//! Engine configuration.
//!
//! Loaded from TOML or built in code, then validated before an engine is
//! constructed from it.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hash::HashAlgorithm;
use crate::key_type::KeyType;

/// Default streaming chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(String),
    #[error("config parse error: {0}")]
    ParseError(String),
    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// How public-key identifiers are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintMode {
    /// First 8 bytes of SHA-512 over the public key DER.
    #[default]
    Sha512Truncated,
    /// Full SHA-256 over the public key DER.
    Sha256,
}

/// Engine configuration. Fixed once the engine is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    pub default_key_type: KeyType,
    pub fingerprint_mode: FingerprintMode,
    pub signature_hash: HashAlgorithm,
    pub chunk_size: usize,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            default_key_type: KeyType::Ed25519,
            fingerprint_mode: FingerprintMode::Sha512Truncated,
            signature_hash: HashAlgorithm::Sha512,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl CryptoConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: CryptoConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileNotFound(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(ConfigError::ValidationError(format!(
                "chunk_size must be between 1 and {}",
                MAX_CHUNK_SIZE
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = CryptoConfig::default();
        assert_eq!(config.default_key_type, KeyType::Ed25519);
        assert_eq!(config.fingerprint_mode, FingerprintMode::Sha512Truncated);
        assert_eq!(config.signature_hash, HashAlgorithm::Sha512);
        assert_eq!(config.chunk_size, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = CryptoConfig::from_toml_str(
            r#"
            default_key_type = "rsa-2048"
            fingerprint_mode = "sha256"
            "#,
        )
        .unwrap();
        assert_eq!(config.default_key_type, KeyType::RSA_2048);
        assert_eq!(config.fingerprint_mode, FingerprintMode::Sha256);
        assert_eq!(config.signature_hash, HashAlgorithm::Sha512);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            CryptoConfig::from_toml_str("chunk_size = 0"),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(matches!(
            CryptoConfig::from_toml_str("default_key_type = \"rsa-1024\""),
            Err(ConfigError::ParseError(_))
        ));
        assert!(matches!(
            CryptoConfig::from_toml_str("signature_hash = \"md5\""),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "signature_hash = \"sha256\"\nchunk_size = 4096").unwrap();

        let config = CryptoConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.signature_hash, HashAlgorithm::Sha256);
        assert_eq!(config.chunk_size, 4096);

        assert!(matches!(
            CryptoConfig::load_from_file("/nonexistent/sealpack.toml"),
            Err(ConfigError::FileNotFound(_))
        ));
    }
}
