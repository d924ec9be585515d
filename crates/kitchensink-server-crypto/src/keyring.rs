// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Versioned encryption keys.

use std::collections::BTreeMap;
use std::fmt;

use aes_gcm::aead::OsRng;
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};

/// Size of encryption keys in bytes (256 bits for AES-256).
pub const KEY_SIZE: usize = 32;

/// Generate a random encryption key.
pub fn generate_key() -> Zeroizing<[u8; KEY_SIZE]> {
	let mut key = Zeroizing::new([0u8; KEY_SIZE]);
	OsRng.fill_bytes(key.as_mut());
	key
}

/// Base64 form used in `KITCHENSINK_SERVER_CRYPTO_KEYS`.
pub fn encode_key(key: &[u8; KEY_SIZE]) -> String {
	STANDARD.encode(key)
}

fn decode_key(version: u32, encoded: &str) -> CryptoResult<Zeroizing<[u8; KEY_SIZE]>> {
	let bytes = Zeroizing::new(STANDARD.decode(encoded.trim()).map_err(|_| {
		CryptoError::InvalidKey {
			version,
			reason: "not valid base64".to_string(),
		}
	})?);

	if bytes.len() != KEY_SIZE {
		return Err(CryptoError::InvalidKey {
			version,
			reason: format!("expected {KEY_SIZE} bytes, got {}", bytes.len()),
		});
	}

	let mut key = Zeroizing::new([0u8; KEY_SIZE]);
	key.copy_from_slice(&bytes);
	Ok(key)
}

/// Every key that may still decrypt stored data, plus the version used for new encryptions.
///
/// A ring is immutable; rotation produces a new ring. Versions are positive
/// and a rotation must introduce a version higher than any already present.
#[derive(Clone)]
pub struct KeyRing {
	keys: BTreeMap<u32, Zeroizing<[u8; KEY_SIZE]>>,
	active: u32,
}

impl KeyRing {
	/// A ring with a single key that is also the active one.
	pub fn new(version: u32, key: &[u8; KEY_SIZE]) -> CryptoResult<Self> {
		if version == 0 {
			return Err(CryptoError::InvalidKey {
				version,
				reason: "key versions start at 1".to_string(),
			});
		}

		let mut keys = BTreeMap::new();
		keys.insert(version, Zeroizing::new(*key));
		Ok(Self {
			keys,
			active: version,
		})
	}

	/// Build a ring from base64-encoded keys as they appear in configuration.
	pub fn from_encoded<'a, I>(entries: I, active: u32) -> CryptoResult<Self>
	where
		I: IntoIterator<Item = (u32, &'a str)>,
	{
		let mut keys = BTreeMap::new();
		for (version, encoded) in entries {
			if version == 0 {
				return Err(CryptoError::InvalidKey {
					version,
					reason: "key versions start at 1".to_string(),
				});
			}
			if keys.insert(version, decode_key(version, encoded)?).is_some() {
				return Err(CryptoError::InvalidKey {
					version,
					reason: "duplicate key version".to_string(),
				});
			}
		}

		if !keys.contains_key(&active) {
			return Err(CryptoError::UnknownKeyVersion(active));
		}

		Ok(Self { keys, active })
	}

	pub fn active_version(&self) -> u32 {
		self.active
	}

	pub fn newest_version(&self) -> u32 {
		self.keys.keys().next_back().copied().unwrap_or(self.active)
	}

	pub fn versions(&self) -> Vec<u32> {
		self.keys.keys().copied().collect()
	}

	pub fn contains(&self, version: u32) -> bool {
		self.keys.contains_key(&version)
	}

	pub(crate) fn key(&self, version: u32) -> Option<&[u8; KEY_SIZE]> {
		self.keys.get(&version).map(|k| &**k)
	}

	/// New ring with `key` added under `version` and made active.
	pub fn with_rotation(&self, version: u32, key: &[u8; KEY_SIZE]) -> CryptoResult<Self> {
		let current = self.newest_version();
		if version <= current {
			return Err(CryptoError::NonMonotonicVersion {
				current,
				requested: version,
			});
		}

		let mut next = self.clone();
		next.keys.insert(version, Zeroizing::new(*key));
		next.active = version;
		Ok(next)
	}

	/// New ring with a different, already retained, version active.
	pub fn with_active(&self, version: u32) -> CryptoResult<Self> {
		if !self.contains(version) {
			return Err(CryptoError::UnknownKeyVersion(version));
		}

		let mut next = self.clone();
		next.active = version;
		Ok(next)
	}
}

impl fmt::Debug for KeyRing {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("KeyRing")
			.field("versions", &self.versions())
			.field("active", &self.active)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn generated_keys_differ() {
		assert_ne!(*generate_key(), *generate_key());
	}

	#[test]
	fn encoded_keys_decode_back() {
		let key = generate_key();
		let ring = KeyRing::from_encoded([(1, encode_key(&key).as_str())], 1).unwrap();
		assert_eq!(ring.key(1), Some(&*key));
	}

	#[test]
	fn from_encoded_validates_material() {
		assert!(matches!(
			KeyRing::from_encoded([(1, "not base64!")], 1),
			Err(CryptoError::InvalidKey { version: 1, .. })
		));
		let short = STANDARD.encode([0u8; 16]);
		assert!(matches!(
			KeyRing::from_encoded([(1, short.as_str())], 1),
			Err(CryptoError::InvalidKey { version: 1, .. })
		));
	}

	#[test]
	fn from_encoded_requires_active_key() {
		let key = encode_key(&generate_key());
		assert_eq!(
			KeyRing::from_encoded([(1, key.as_str())], 2).unwrap_err(),
			CryptoError::UnknownKeyVersion(2)
		);
	}

	#[test]
	fn rotation_must_increase_version() {
		let ring = KeyRing::new(2, &generate_key()).unwrap();
		assert_eq!(
			ring.with_rotation(2, &generate_key()).unwrap_err(),
			CryptoError::NonMonotonicVersion {
				current: 2,
				requested: 2
			}
		);
		let rotated = ring.with_rotation(3, &generate_key()).unwrap();
		assert_eq!(rotated.active_version(), 3);
		assert_eq!(rotated.versions(), vec![2, 3]);
		assert_eq!(ring.active_version(), 2);
	}

	#[test]
	fn activating_an_older_version_keeps_newest() {
		let ring = KeyRing::new(1, &generate_key())
			.unwrap()
			.with_rotation(2, &generate_key())
			.unwrap();
		let rolled_back = ring.with_active(1).unwrap();
		assert_eq!(rolled_back.active_version(), 1);
		assert_eq!(rolled_back.newest_version(), 2);
		assert!(ring.with_active(7).is_err());
	}

	#[test]
	fn debug_does_not_print_key_bytes() {
		let ring = KeyRing::new(1, &[7u8; KEY_SIZE]).unwrap();
		let debug = format!("{ring:?}");
		assert!(debug.contains("versions"));
		assert!(!debug.contains("7, 7"));
	}
}
