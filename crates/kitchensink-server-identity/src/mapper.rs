// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Conversion between plaintext requests/responses and stored records.
//!
//! This is the only place that sees both plaintext and stored PII: requests
//! are hashed and encrypted on the way in, ciphertext is decrypted on the way
//! out, and nothing else touches the cipher.

use std::sync::Arc;

use chrono::Utc;
use kitchensink_server_crypto::{CryptoError, FieldCipher, PiiHasher};
use tracing::debug;

use crate::error::{IdentityError, IdentityResult};
use crate::record::{DecryptedPii, IdentityRecord, IdentityRequest};
use crate::types::{PiiField, ProtectedValue};

/// A response plus the PII fields whose ciphertext uses a retired key.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapped<T> {
	pub body: T,
	pub stale_fields: Vec<PiiField>,
}

impl<T> Mapped<T> {
	pub fn needs_reencryption(&self) -> bool {
		!self.stale_fields.is_empty()
	}
}

#[derive(Clone)]
pub struct RecordMapper {
	hasher: Arc<PiiHasher>,
	cipher: Arc<FieldCipher>,
}

impl RecordMapper {
	pub fn new(hasher: Arc<PiiHasher>, cipher: Arc<FieldCipher>) -> Self {
		Self { hasher, cipher }
	}

	pub fn cipher(&self) -> &Arc<FieldCipher> {
		&self.cipher
	}

	/// Lookup hash for an already sanitized value.
	pub fn hash_lookup(&self, field: PiiField, plaintext: &str) -> IdentityResult<String> {
		self.hasher
			.hash(plaintext)
			.map_err(|e| invalid_input(field, e))
	}

	/// Hash and encrypt one value. Both halves come from the same plaintext.
	pub fn protect(&self, field: PiiField, plaintext: &str) -> IdentityResult<ProtectedValue> {
		let hash = self.hash_lookup(field, plaintext)?;
		let encrypted = self.cipher.encrypt(plaintext).map_err(|e| match e {
			CryptoError::InvalidInput(_) => invalid_input(field, e),
			_ => IdentityError::Encryption { field },
		})?;
		Ok(ProtectedValue::new(hash, encrypted))
	}

	/// Build a new record from a sanitized, validated create request.
	pub fn to_entity<R: IdentityRecord>(&self, request: &R::Request) -> IdentityResult<R> {
		let protected = self.protect_present(request)?;
		let mut entity = R::new_from_request(request, Utc::now())?;
		for (field, value) in protected {
			entity.set_pii(field, value);
		}
		Ok(entity)
	}

	/// Patch an existing record with the fields present in `request`.
	///
	/// A PII field is re-protected only when its plaintext changed, so an
	/// unchanged e-mail keeps its stored hash and ciphertext. Every new value
	/// is computed before the record is touched: a failure leaves it as it was.
	pub fn update_entity_from_request<R: IdentityRecord>(
		&self,
		entity: &mut R,
		request: &R::Request,
	) -> IdentityResult<()> {
		let mut replacements = Vec::new();
		for field in PiiField::ALL {
			let Some(plaintext) = request.pii(field) else {
				continue;
			};
			let hash = self.hash_lookup(field, plaintext)?;
			let unchanged = entity
				.pii(field)
				.is_some_and(|current| current.hash() == hash);
			if unchanged {
				continue;
			}
			replacements.push((field, self.protect(field, plaintext)?));
		}

		let mut patched = entity.clone();
		patched.apply_request(request, Utc::now())?;
		for (field, value) in replacements {
			debug!(entity_type = R::ENTITY_TYPE, field = %field, "replacing protected value");
			patched.set_pii(field, value);
		}
		*entity = patched;
		Ok(())
	}

	/// Decrypt a stored record into its response shape.
	///
	/// Read-only: stale ciphertext is reported in [`Mapped::stale_fields`] and
	/// left for the next write to replace.
	pub fn to_response<R: IdentityRecord>(&self, entity: &R) -> IdentityResult<Mapped<R::Response>> {
		let id = entity.id().ok_or(IdentityError::NotPersisted {
			entity_type: R::ENTITY_TYPE,
		})?;

		let mut pii = DecryptedPii::default();
		let mut stale_fields = Vec::new();
		for field in PiiField::ALL {
			let Some(value) = entity.pii(field) else {
				continue;
			};
			let plaintext = self
				.cipher
				.decrypt(value.encrypted())
				.map_err(|_| IdentityError::Decryption { field })?;
			if self.cipher.needs_reencryption(value.encrypted()) {
				stale_fields.push(field);
			}
			pii.set(field, plaintext);
		}

		if !stale_fields.is_empty() {
			debug!(
				entity_type = R::ENTITY_TYPE,
				entity_id = %id,
				stale = ?stale_fields,
				"record uses a retired encryption key"
			);
		}

		Ok(Mapped {
			body: entity.to_response(id, pii),
			stale_fields,
		})
	}

	/// Re-encrypt every PII field that is not under the active key.
	///
	/// Hashes are recomputed from the decrypted plaintext and replaced along
	/// with the ciphertext; they come out identical, so the rewrite is not an
	/// audited change. Returns the fields that were rewritten.
	pub fn refresh_stale_encryption<R: IdentityRecord>(
		&self,
		entity: &mut R,
	) -> IdentityResult<Vec<PiiField>> {
		let mut replacements = Vec::new();
		for field in PiiField::ALL {
			let Some(current) = entity.pii(field) else {
				continue;
			};
			if !self.cipher.needs_reencryption(current.encrypted()) {
				continue;
			}
			let plaintext = self
				.cipher
				.decrypt(current.encrypted())
				.map_err(|_| IdentityError::Decryption { field })?;
			replacements.push((field, self.protect(field, &plaintext)?));
		}

		let fields = replacements.iter().map(|(field, _)| *field).collect();
		for (field, value) in replacements {
			entity.set_pii(field, value);
		}
		Ok(fields)
	}

	fn protect_present<Q: IdentityRequest>(
		&self,
		request: &Q,
	) -> IdentityResult<Vec<(PiiField, ProtectedValue)>> {
		PiiField::ALL
			.into_iter()
			.filter_map(|field| request.pii(field).map(|plaintext| (field, plaintext)))
			.map(|(field, plaintext)| self.protect(field, plaintext).map(|value| (field, value)))
			.collect()
	}
}

fn invalid_input(field: PiiField, e: CryptoError) -> IdentityError {
	IdentityError::Validation {
		field: field.as_str(),
		message: e.to_string(),
	}
}
