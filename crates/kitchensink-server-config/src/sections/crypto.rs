// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! PII encryption and hashing configuration.
//!
//! Keys are supplied as a single secret string of comma-separated
//! `version:base64key` entries, for example `1:AAAA...,2:BBBB...`. Retired
//! versions stay listed so existing ciphertext remains readable.

use std::collections::BTreeSet;

use kitchensink_common_config::{Secret, SecretString};
use serde::Deserialize;

use crate::error::ConfigError;

pub(crate) const KEYS_VAR: &str = "KITCHENSINK_SERVER_CRYPTO_KEYS";
pub(crate) const ACTIVE_VERSION_VAR: &str = "KITCHENSINK_SERVER_CRYPTO_ACTIVE_KEY_VERSION";
pub(crate) const HASH_SECRET_VAR: &str = "KITCHENSINK_SERVER_CRYPTO_HASH_SECRET";

/// One configured encryption key. The material is still base64-encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyEntry {
	pub version: u32,
	pub material: SecretString,
}

#[derive(Debug, Clone)]
pub struct CryptoConfig {
	/// Keys ordered by ascending version.
	pub keys: Vec<KeyEntry>,
	pub active_key_version: u32,
	pub hash_secret: SecretString,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CryptoConfigLayer {
	#[serde(default)]
	pub keys: Option<SecretString>,
	#[serde(default)]
	pub active_key_version: Option<u32>,
	#[serde(default)]
	pub hash_secret: Option<SecretString>,
}

impl CryptoConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.keys.is_some() {
			self.keys = other.keys;
		}
		if other.active_key_version.is_some() {
			self.active_key_version = other.active_key_version;
		}
		if other.hash_secret.is_some() {
			self.hash_secret = other.hash_secret;
		}
	}

	pub fn finalize(self) -> Result<CryptoConfig, ConfigError> {
		let raw_keys = self
			.keys
			.filter(|k| !k.is_blank())
			.ok_or_else(|| ConfigError::MissingEnvVar(KEYS_VAR.to_string()))?;
		let keys = parse_key_entries(raw_keys.expose())?;

		let newest = keys
			.last()
			.map(|k| k.version)
			.ok_or_else(|| ConfigError::MissingEnvVar(KEYS_VAR.to_string()))?;
		let active_key_version = self.active_key_version.unwrap_or(newest);
		if !keys.iter().any(|k| k.version == active_key_version) {
			return Err(ConfigError::Validation(format!(
				"active key version {active_key_version} has no configured key"
			)));
		}

		let hash_secret = self
			.hash_secret
			.filter(|s| !s.is_blank())
			.ok_or_else(|| ConfigError::MissingEnvVar(HASH_SECRET_VAR.to_string()))?;

		Ok(CryptoConfig {
			keys,
			active_key_version,
			hash_secret,
		})
	}
}

/// Parse `version:material` entries, rejecting malformed or repeated versions.
pub fn parse_key_entries(raw: &str) -> Result<Vec<KeyEntry>, ConfigError> {
	let mut seen = BTreeSet::new();
	let mut keys = Vec::new();

	for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
		let (version, material) = entry.split_once(':').ok_or_else(|| invalid_keys(
			"each entry must look like <version>:<base64 key>",
		))?;

		let version: u32 = version
			.trim()
			.parse()
			.map_err(|_| invalid_keys("key version must be a positive integer"))?;
		if version == 0 {
			return Err(invalid_keys("key version must be a positive integer"));
		}
		if material.trim().is_empty() {
			return Err(invalid_keys("key material is empty"));
		}
		if !seen.insert(version) {
			return Err(invalid_keys("key version listed more than once"));
		}

		keys.push(KeyEntry {
			version,
			material: Secret::new(material.trim().to_string()),
		});
	}

	keys.sort_by_key(|k| k.version);
	Ok(keys)
}

fn invalid_keys(message: &str) -> ConfigError {
	ConfigError::InvalidValue {
		key: KEYS_VAR.to_string(),
		message: message.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn layer(keys: &str, active: Option<u32>) -> CryptoConfigLayer {
		CryptoConfigLayer {
			keys: Some(Secret::new(keys.to_string())),
			active_key_version: active,
			hash_secret: Some(Secret::new("0123456789abcdef0123456789abcdef".to_string())),
		}
	}

	#[test]
	fn active_version_defaults_to_newest() {
		let config = layer("2:bbbb, 1:aaaa", None).finalize().unwrap();
		assert_eq!(config.active_key_version, 2);
		let versions: Vec<u32> = config.keys.iter().map(|k| k.version).collect();
		assert_eq!(versions, vec![1, 2]);
		assert_eq!(config.keys[0].material.expose(), "aaaa");
	}

	#[test]
	fn explicit_active_version_may_be_older() {
		let config = layer("1:aaaa,2:bbbb", Some(1)).finalize().unwrap();
		assert_eq!(config.active_key_version, 1);
	}

	#[test]
	fn active_version_without_key_is_rejected() {
		let err = layer("1:aaaa", Some(3)).finalize().unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));
	}

	#[test]
	fn missing_keys_is_rejected() {
		let err = CryptoConfigLayer::default().finalize().unwrap_err();
		assert!(matches!(err, ConfigError::MissingEnvVar(ref v) if v == KEYS_VAR));
	}

	#[test]
	fn missing_hash_secret_is_rejected() {
		let mut layer = layer("1:aaaa", None);
		layer.hash_secret = Some(Secret::new("  ".to_string()));
		let err = layer.finalize().unwrap_err();
		assert!(matches!(err, ConfigError::MissingEnvVar(ref v) if v == HASH_SECRET_VAR));
	}

	#[test]
	fn malformed_entries_are_rejected() {
		assert!(parse_key_entries("aaaa").is_err());
		assert!(parse_key_entries("x:aaaa").is_err());
		assert!(parse_key_entries("0:aaaa").is_err());
		assert!(parse_key_entries("1:").is_err());
		assert!(parse_key_entries("1:aaaa,1:bbbb").is_err());
	}

	#[test]
	fn error_messages_never_echo_key_material() {
		let err = parse_key_entries("1:topsecret,1:othersecret").unwrap_err();
		assert!(!err.to_string().contains("topsecret"));
	}

	#[test]
	fn merge_prefers_other() {
		let mut base = layer("1:aaaa", None);
		base.merge(CryptoConfigLayer {
			active_key_version: Some(1),
			..Default::default()
		});
		assert_eq!(base.active_key_version, Some(1));
		assert!(base.keys.is_some());
	}

	#[test]
	fn deserializes_from_toml() {
		let layer: CryptoConfigLayer = toml::from_str(
			r#"
keys = "1:aaaa,2:bbbb"
active_key_version = 2
hash_secret = "pepper"
"#,
		)
		.unwrap();
		assert_eq!(layer.active_key_version, Some(2));
		assert_eq!(layer.hash_secret.unwrap().expose(), "pepper");
	}
}
