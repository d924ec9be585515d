// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Deterministic lookup hashes for PII.

use hmac::{Hmac, Mac};
use kitchensink_common_config::SecretString;
use sha2::Sha256;

use crate::error::{CryptoError, CryptoResult};

type HmacSha256 = Hmac<Sha256>;

/// Computes `hex(HMAC-SHA256(secret, plaintext))`.
///
/// The same plaintext always yields the same hash for a given secret, which
/// makes the output usable as a unique index. Callers normalize input (for
/// example lower-casing e-mail addresses) before hashing.
#[derive(Debug, Clone)]
pub struct PiiHasher {
	secret: SecretString,
}

impl PiiHasher {
	pub fn new(secret: SecretString) -> CryptoResult<Self> {
		if secret.is_blank() {
			return Err(CryptoError::InvalidInput("hash secret must not be empty"));
		}
		Ok(Self { secret })
	}

	/// Hash a PII value. Empty or whitespace-only input is rejected.
	pub fn hash(&self, plaintext: &str) -> CryptoResult<String> {
		if plaintext.trim().is_empty() {
			return Err(CryptoError::InvalidInput("cannot hash an empty value"));
		}

		let mut mac = HmacSha256::new_from_slice(self.secret.expose().as_bytes())
			.map_err(|_| CryptoError::InvalidInput("hash secret has an invalid length"))?;
		mac.update(plaintext.as_bytes());
		Ok(hex::encode(mac.finalize().into_bytes()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use kitchensink_common_config::Secret;
	use proptest::prelude::*;
	use std::collections::HashSet;

	fn hasher() -> PiiHasher {
		PiiHasher::new(Secret::new("test-pepper".to_string())).unwrap()
	}

	#[test]
	fn hash_is_hex_sha256_sized() {
		let hash = hasher().hash("a@x.com").unwrap();
		assert_eq!(hash.len(), 64);
		assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
	}

	#[test]
	fn empty_input_is_rejected() {
		let hasher = hasher();
		assert!(matches!(hasher.hash(""), Err(CryptoError::InvalidInput(_))));
		assert!(matches!(hasher.hash("   "), Err(CryptoError::InvalidInput(_))));
	}

	#[test]
	fn blank_secret_is_rejected() {
		assert!(PiiHasher::new(Secret::new(" ".to_string())).is_err());
	}

	#[test]
	fn different_secrets_give_different_hashes() {
		let other = PiiHasher::new(Secret::new("another-pepper".to_string())).unwrap();
		assert_ne!(
			hasher().hash("a@x.com").unwrap(),
			other.hash("a@x.com").unwrap()
		);
	}

	#[test]
	fn realistic_corpus_has_no_collisions() {
		let hasher = hasher();
		let mut seen = HashSet::new();
		for i in 0..2000 {
			let email = format!("member{i}@example.com");
			assert!(seen.insert(hasher.hash(&email).unwrap()));
		}
		for i in 0..2000u64 {
			let phone = format!("98{:08}", i);
			assert!(seen.insert(hasher.hash(&phone).unwrap()));
		}
	}

	proptest! {
		#[test]
		fn hash_is_deterministic(input in "[a-z0-9._%+-]{1,20}@[a-z0-9-]{1,10}\\.[a-z]{2,6}") {
			let hasher = hasher();
			prop_assert_eq!(hasher.hash(&input).unwrap(), hasher.hash(&input).unwrap());
		}

		#[test]
		fn distinct_inputs_hash_differently(a in "[0-9]{10}", b in "[0-9]{10}") {
			prop_assume!(a != b);
			let hasher = hasher();
			prop_assert_ne!(hasher.hash(&a).unwrap(), hasher.hash(&b).unwrap());
		}
	}
}
