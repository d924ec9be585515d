// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

pub type CryptoResult<T> = Result<T, CryptoError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
	#[error("invalid input: {0}")]
	InvalidInput(&'static str),

	#[error("invalid key for version {version}: {reason}")]
	InvalidKey { version: u32, reason: String },

	#[error("no key configured for version {0}")]
	UnknownKeyVersion(u32),

	#[error("key version {requested} must be greater than {current}")]
	NonMonotonicVersion { current: u32, requested: u32 },

	#[error("ciphertext is malformed")]
	MalformedCiphertext,

	#[error("encryption failed")]
	Encryption,

	#[error("decryption failed")]
	Decryption,
}

impl CryptoError {
	/// True for every failure that means stored ciphertext cannot be read back.
	pub fn is_unreadable_ciphertext(&self) -> bool {
		matches!(
			self,
			CryptoError::UnknownKeyVersion(_) | CryptoError::MalformedCiphertext | CryptoError::Decryption
		)
	}
}
