// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;

use kitchensink_common_config::load_secret_env;
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::crypto::{ACTIVE_VERSION_VAR, HASH_SECRET_VAR, KEYS_VAR};
use crate::sections::{
	AuditConfigLayer, CryptoConfigLayer, DatabaseConfigLayer, LogFormat, LoggingConfigLayer,
	QueueOverflowPolicy, RuntimeConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file yields an empty layer.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/kitchensink/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: KITCHENSINK_SERVER_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			runtime: Some(load_runtime_from_env()),
			database: Some(load_database_from_env()),
			crypto: Some(load_crypto_from_env()?),
			audit: Some(load_audit_from_env()?),
			logging: Some(load_logging_from_env()?),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_list(name: &str) -> Option<Vec<String>> {
	env_var(name).map(|v| {
		v.split(',')
			.map(str::trim)
			.filter(|s| !s.is_empty())
			.map(String::from)
			.collect()
	})
}

fn env_parsed<T: std::str::FromStr>(name: &str, kind: &str) -> Result<Option<T>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid {kind} value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn load_runtime_from_env() -> RuntimeConfigLayer {
	RuntimeConfigLayer {
		environment: env_var("KITCHENSINK_SERVER_ENV"),
	}
}

fn load_database_from_env() -> DatabaseConfigLayer {
	DatabaseConfigLayer {
		url: env_var("KITCHENSINK_SERVER_DATABASE_URL"),
	}
}

fn load_crypto_from_env() -> Result<CryptoConfigLayer, ConfigError> {
	Ok(CryptoConfigLayer {
		keys: load_secret_env(KEYS_VAR).map_err(|e| ConfigError::Secret(e.to_string()))?,
		active_key_version: env_parsed(ACTIVE_VERSION_VAR, "u32")?,
		hash_secret: load_secret_env(HASH_SECRET_VAR)
			.map_err(|e| ConfigError::Secret(e.to_string()))?,
	})
}

fn load_audit_from_env() -> Result<AuditConfigLayer, ConfigError> {
	let queue_overflow_policy = match env_var("KITCHENSINK_SERVER_AUDIT_QUEUE_OVERFLOW_POLICY") {
		Some(v) => Some(v.parse::<QueueOverflowPolicy>().map_err(|message| {
			ConfigError::InvalidValue {
				key: "KITCHENSINK_SERVER_AUDIT_QUEUE_OVERFLOW_POLICY".to_string(),
				message,
			}
		})?),
		None => None,
	};

	Ok(AuditConfigLayer {
		enabled: env_bool("KITCHENSINK_SERVER_AUDIT_ENABLED"),
		retention_days: env_parsed("KITCHENSINK_SERVER_AUDIT_RETENTION_DAYS", "i64")?,
		queue_capacity: env_parsed("KITCHENSINK_SERVER_AUDIT_QUEUE_CAPACITY", "usize")?,
		queue_overflow_policy,
		sqlite_sink: env_bool("KITCHENSINK_SERVER_AUDIT_SQLITE_SINK"),
		tracing_sink: env_bool("KITCHENSINK_SERVER_AUDIT_TRACING_SINK"),
		include_actions: env_list("KITCHENSINK_SERVER_AUDIT_INCLUDE_ACTIONS"),
		exclude_entity_types: env_list("KITCHENSINK_SERVER_AUDIT_EXCLUDE_ENTITY_TYPES"),
	})
}

fn load_logging_from_env() -> Result<LoggingConfigLayer, ConfigError> {
	let format = match env_var("KITCHENSINK_SERVER_LOG_FORMAT") {
		Some(v) => match v.to_ascii_lowercase().as_str() {
			"json" => Some(LogFormat::Json),
			"pretty" | "text" => Some(LogFormat::Pretty),
			_ => {
				return Err(ConfigError::InvalidValue {
					key: "KITCHENSINK_SERVER_LOG_FORMAT".to_string(),
					message: format!("unknown log format '{v}'"),
				})
			}
		},
		None => None,
	};

	Ok(LoggingConfigLayer {
		level: env_var("KITCHENSINK_SERVER_LOG_LEVEL"),
		format,
	})
}
