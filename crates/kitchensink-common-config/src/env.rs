// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Loading secrets from the environment.
//!
//! A secret named `VAR` may be supplied directly in `VAR` or as a path in
//! `VAR_FILE` (Docker/Kubernetes secret mounts). The file form wins when both
//! are set, and a single trailing newline is dropped from file contents.

use std::path::PathBuf;
use std::{env, fs};

use thiserror::Error;

use crate::secret::{Secret, SecretString};

#[derive(Debug, Error)]
pub enum SecretEnvError {
	#[error("failed to read secret file at {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("secret file path in {var} is empty")]
	EmptyPath { var: String },
}

/// Load `var` from `{var}_FILE` or `{var}`. Returns `Ok(None)` when neither is set.
///
/// ```no_run
/// use kitchensink_common_config::load_secret_env;
///
/// if let Some(keys) = load_secret_env("KITCHENSINK_SERVER_CRYPTO_KEYS")? {
///     println!("keys configured: {keys}"); // prints [REDACTED]
/// }
/// # Ok::<(), kitchensink_common_config::SecretEnvError>(())
/// ```
pub fn load_secret_env(var: &str) -> Result<Option<SecretString>, SecretEnvError> {
	let file_var = format!("{var}_FILE");

	if let Ok(path_str) = env::var(&file_var) {
		if path_str.is_empty() {
			return Err(SecretEnvError::EmptyPath { var: file_var });
		}

		let path = PathBuf::from(path_str);
		let content = fs::read_to_string(&path).map_err(|source| SecretEnvError::Io {
			path: path.clone(),
			source,
		})?;

		let value = content.strip_suffix('\n').unwrap_or(&content).to_string();
		return Ok(Some(Secret::new(value)));
	}

	Ok(env::var(var).ok().map(Secret::new))
}

#[derive(Debug, Error)]
pub enum RequiredSecretError {
	#[error("required secret not found: set either {var} or {file_var}")]
	Missing { var: String, file_var: String },

	#[error(transparent)]
	Load(#[from] SecretEnvError),
}

/// Like [`load_secret_env`] but fails when the secret is absent.
pub fn require_secret_env(var: &str) -> Result<SecretString, RequiredSecretError> {
	load_secret_env(var)?.ok_or_else(|| RequiredSecretError::Missing {
		var: var.to_string(),
		file_var: format!("{var}_FILE"),
	})
}
