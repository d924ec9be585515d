// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Versioned AES-256-GCM field encryption.
//!
//! Ciphertext is stored as `v{version}:{base64(nonce || ciphertext || tag)}`.
//! The `v{version}` prefix is also fed to GCM as associated data, so editing
//! the version tag makes decryption fail instead of selecting another key.

use std::sync::{Arc, RwLock};

use aes_gcm::{
	aead::{Aead, KeyInit, OsRng, Payload},
	Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CryptoError, CryptoResult};
use crate::keyring::{KeyRing, KEY_SIZE};

/// Size of AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// Tagged ciphertext of a single PII value, in its storage form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedValue(String);

impl EncryptedValue {
	/// Wrap a value previously read from storage.
	pub fn from_stored(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Version of the key that produced this value, if the tag is readable.
	pub fn key_version(&self) -> Option<u32> {
		self.split().ok().map(|(version, _)| version)
	}

	fn split(&self) -> CryptoResult<(u32, &str)> {
		let rest = self.0.strip_prefix('v').ok_or(CryptoError::MalformedCiphertext)?;
		let (version, body) = rest.split_once(':').ok_or(CryptoError::MalformedCiphertext)?;
		let version = version
			.parse::<u32>()
			.map_err(|_| CryptoError::MalformedCiphertext)?;
		Ok((version, body))
	}
}

fn associated_data(version: u32) -> Vec<u8> {
	format!("v{version}").into_bytes()
}

fn generate_nonce() -> [u8; NONCE_SIZE] {
	let mut nonce = [0u8; NONCE_SIZE];
	OsRng.fill_bytes(&mut nonce);
	nonce
}

fn seal(version: u32, key: &[u8; KEY_SIZE], plaintext: &[u8]) -> CryptoResult<EncryptedValue> {
	let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
	let nonce_bytes = generate_nonce();
	let aad = associated_data(version);

	let ciphertext = cipher
		.encrypt(
			Nonce::from_slice(&nonce_bytes),
			Payload {
				msg: plaintext,
				aad: &aad,
			},
		)
		.map_err(|_| CryptoError::Encryption)?;

	let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
	combined.extend_from_slice(&nonce_bytes);
	combined.extend_from_slice(&ciphertext);

	Ok(EncryptedValue(format!("v{version}:{}", STANDARD.encode(combined))))
}

fn open(ring: &KeyRing, value: &EncryptedValue) -> CryptoResult<String> {
	let (version, body) = value.split()?;
	let key = ring
		.key(version)
		.ok_or(CryptoError::UnknownKeyVersion(version))?;

	let combined = STANDARD
		.decode(body)
		.map_err(|_| CryptoError::MalformedCiphertext)?;
	if combined.len() <= NONCE_SIZE {
		return Err(CryptoError::MalformedCiphertext);
	}
	let (nonce, ciphertext) = combined.split_at(NONCE_SIZE);

	let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
	let aad = associated_data(version);
	let plaintext = cipher
		.decrypt(
			Nonce::from_slice(nonce),
			Payload {
				msg: ciphertext,
				aad: &aad,
			},
		)
		.map_err(|_| CryptoError::Decryption)?;

	String::from_utf8(plaintext).map_err(|_| CryptoError::Decryption)
}

/// Encrypts and decrypts PII values against a shared [`KeyRing`].
///
/// The ring sits behind a lock as an `Arc`; every operation clones the `Arc`
/// once and works on that ring, and rotation replaces the `Arc` in one step.
/// A concurrent caller therefore sees the ring from before or after a
/// rotation, never a partial one.
#[derive(Debug)]
pub struct FieldCipher {
	ring: RwLock<Arc<KeyRing>>,
}

impl FieldCipher {
	pub fn new(ring: KeyRing) -> Self {
		Self {
			ring: RwLock::new(Arc::new(ring)),
		}
	}

	/// The ring currently in effect.
	pub fn key_ring(&self) -> Arc<KeyRing> {
		let guard = self.ring.read().unwrap_or_else(|poisoned| poisoned.into_inner());
		Arc::clone(&guard)
	}

	pub fn active_version(&self) -> u32 {
		self.key_ring().active_version()
	}

	/// Encrypt under the active key version.
	pub fn encrypt(&self, plaintext: &str) -> CryptoResult<EncryptedValue> {
		if plaintext.is_empty() {
			return Err(CryptoError::InvalidInput("cannot encrypt an empty value"));
		}

		let ring = self.key_ring();
		let version = ring.active_version();
		let key = ring
			.key(version)
			.ok_or(CryptoError::UnknownKeyVersion(version))?;
		seal(version, key, plaintext.as_bytes())
	}

	/// Decrypt with whichever retained key produced the value.
	pub fn decrypt(&self, value: &EncryptedValue) -> CryptoResult<String> {
		open(&self.key_ring(), value)
	}

	/// True iff the value's key version differs from the active one.
	/// Values whose tag cannot be read also report true.
	pub fn needs_reencryption(&self, value: &EncryptedValue) -> bool {
		value.key_version() != Some(self.active_version())
	}

	/// Add a new, higher key version and make it active.
	pub fn rotate(&self, version: u32, key: &[u8; KEY_SIZE]) -> CryptoResult<()> {
		let mut guard = self.ring.write().unwrap_or_else(|poisoned| poisoned.into_inner());
		let next = guard.with_rotation(version, key)?;
		*guard = Arc::new(next);
		info!(active_key_version = version, "encryption key rotated");
		Ok(())
	}

	/// Switch the active version to another retained key.
	pub fn activate(&self, version: u32) -> CryptoResult<()> {
		let mut guard = self.ring.write().unwrap_or_else(|poisoned| poisoned.into_inner());
		let next = guard.with_active(version)?;
		*guard = Arc::new(next);
		debug!(active_key_version = version, "encryption key version activated");
		Ok(())
	}
}
