// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared configuration primitives for kitchensink.
//!
//! - [`Secret`] keeps key material and hash secrets out of logs and config dumps.
//! - [`load_secret_env`] reads secrets from `VAR` or from the file named by `VAR_FILE`.

pub mod env;
pub mod secret;

pub use env::{load_secret_env, require_secret_env, RequiredSecretError, SecretEnvError};
pub use secret::{Secret, SecretString, REDACTED};
