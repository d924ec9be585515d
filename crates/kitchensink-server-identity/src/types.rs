// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identifiers and value types shared by member and user records.

use std::fmt;
use std::str::FromStr;

use kitchensink_server_crypto::EncryptedValue;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(Uuid);

		impl $name {
			/// Create a new ID from a UUID.
			pub fn new(id: Uuid) -> Self {
				Self(id)
			}

			/// Generate a new random ID.
			pub fn generate() -> Self {
				Self(Uuid::new_v4())
			}

			/// Get the inner UUID value.
			pub fn into_inner(self) -> Uuid {
				self.0
			}

			/// Get a reference to the inner UUID.
			pub fn as_uuid(&self) -> &Uuid {
				&self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl FromStr for $name {
			type Err = uuid::Error;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Uuid::parse_str(s).map(Self)
			}
		}

		impl From<Uuid> for $name {
			fn from(id: Uuid) -> Self {
				Self(id)
			}
		}

		impl From<$name> for Uuid {
			fn from(id: $name) -> Self {
				id.0
			}
		}
	};
}

define_id_type!(MemberId, "Unique identifier for a member.");
define_id_type!(UserId, "Unique identifier for a user.");

/// The personal fields that are hashed and encrypted at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PiiField {
	Email,
	PhoneNumber,
}

impl PiiField {
	pub const ALL: [PiiField; 2] = [PiiField::Email, PiiField::PhoneNumber];

	/// Field name as it appears in requests, responses and audit entries.
	pub fn as_str(&self) -> &'static str {
		match self {
			PiiField::Email => "email",
			PiiField::PhoneNumber => "phone_number",
		}
	}

	pub fn hash_column(&self) -> &'static str {
		match self {
			PiiField::Email => "email_hash",
			PiiField::PhoneNumber => "phone_hash",
		}
	}

	pub fn encrypted_column(&self) -> &'static str {
		match self {
			PiiField::Email => "email_encrypted",
			PiiField::PhoneNumber => "phone_encrypted",
		}
	}
}

impl fmt::Display for PiiField {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Stored form of one PII value: the lookup hash and the ciphertext of the
/// same plaintext.
///
/// The halves can only be set together, so a record can never hold a fresh
/// hash next to stale ciphertext or the reverse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedValue {
	hash: String,
	encrypted: EncryptedValue,
}

impl ProtectedValue {
	pub(crate) fn new(hash: String, encrypted: EncryptedValue) -> Self {
		Self { hash, encrypted }
	}

	/// Rebuild a pair read back from storage.
	pub fn from_stored(hash: impl Into<String>, encrypted: impl Into<String>) -> Self {
		Self {
			hash: hash.into(),
			encrypted: EncryptedValue::from_stored(encrypted),
		}
	}

	pub fn hash(&self) -> &str {
		&self.hash
	}

	pub fn encrypted(&self) -> &EncryptedValue {
		&self.encrypted
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberStatus {
	#[default]
	Active,
	Inactive,
}

impl MemberStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			MemberStatus::Active => "ACTIVE",
			MemberStatus::Inactive => "INACTIVE",
		}
	}
}

impl fmt::Display for MemberStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for MemberStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_uppercase().as_str() {
			"ACTIVE" => Ok(MemberStatus::Active),
			"INACTIVE" => Ok(MemberStatus::Inactive),
			other => Err(format!("unknown status '{other}'")),
		}
	}
}
