// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Centralized configuration management for the kitchensink server.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`KITCHENSINK_SERVER_*`)
//!
//! # Usage
//!
//! ```ignore
//! use kitchensink_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("database at {}", config.database.url);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

const MIN_PRODUCTION_HASH_SECRET_LEN: usize = 32;

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
	pub runtime: RuntimeConfig,
	pub database: DatabaseConfig,
	pub crypto: CryptoConfig,
	pub audit: AuditConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`KITCHENSINK_SERVER_*`)
/// 2. Config file (`/etc/kitchensink/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration from environment only (for testing or simple deployments).
pub fn load_config_from_env() -> Result<ServerConfig, ConfigError> {
	let mut merged = ServerConfigLayer::default();
	merged.merge(EnvSource.load()?);
	finalize(merged)
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
pub fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let runtime = layer.runtime.unwrap_or_default().finalize();
	let database = layer.database.unwrap_or_default().finalize();
	let crypto = layer.crypto.unwrap_or_default().finalize()?;
	let audit = layer.audit.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	validate_config(&runtime, &crypto, &audit)?;

	info!(
		environment = %runtime.environment,
		database = %database.url,
		key_versions = crypto.keys.len(),
		active_key_version = crypto.active_key_version,
		audit_enabled = audit.enabled,
		"Server configuration loaded"
	);

	Ok(ServerConfig {
		runtime,
		database,
		crypto,
		audit,
		logging,
	})
}

/// Validate cross-field configuration rules.
fn validate_config(
	runtime: &RuntimeConfig,
	crypto: &CryptoConfig,
	audit: &AuditConfig,
) -> Result<(), ConfigError> {
	if !runtime.is_production() {
		return Ok(());
	}

	if crypto.hash_secret.len() < MIN_PRODUCTION_HASH_SECRET_LEN {
		return Err(ConfigError::Validation(format!(
			"KITCHENSINK_SERVER_CRYPTO_HASH_SECRET must be at least \
			 {MIN_PRODUCTION_HASH_SECRET_LEN} bytes when KITCHENSINK_SERVER_ENV=production"
		)));
	}

	if !audit.enabled {
		return Err(ConfigError::Validation(
			"KITCHENSINK_SERVER_AUDIT_ENABLED=false is not allowed when \
			 KITCHENSINK_SERVER_ENV=production"
				.to_string(),
		));
	}

	Ok(())
}
