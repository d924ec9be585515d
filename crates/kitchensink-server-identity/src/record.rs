// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The seams shared by member and user records.

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use kitchensink_server_audit::Snapshot;
use serde::Serialize;

use crate::error::IdentityResult;
use crate::types::{PiiField, ProtectedValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
	/// Required fields must be present.
	Create,
	/// Every field is optional; present fields obey the same rules.
	Update,
}

/// Inbound shape of a record. Absent fields are `None`.
pub trait IdentityRequest: Send + Sync {
	/// Normalize every present field in place.
	fn sanitize(&mut self);

	/// Check the sanitized request.
	fn validate(&self, mode: RequestMode) -> IdentityResult<()>;

	/// Sanitized plaintext of a PII field, if present.
	fn pii(&self, field: PiiField) -> Option<&str>;
}

/// Plaintext PII recovered for a response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecryptedPii {
	pub email: Option<String>,
	pub phone_number: Option<String>,
}

impl DecryptedPii {
	pub(crate) fn set(&mut self, field: PiiField, value: String) {
		match field {
			PiiField::Email => self.email = Some(value),
			PiiField::PhoneNumber => self.phone_number = Some(value),
		}
	}
}

/// A persisted identity record holding PII only as [`ProtectedValue`]s.
pub trait IdentityRecord: Clone + Send + Sync + 'static {
	type Id: Copy + Eq + Hash + Ord + fmt::Debug + fmt::Display + FromStr + Send + Sync + 'static;
	type Request: IdentityRequest;
	type Response: Serialize + Send + Sync;

	/// Name used in audit entries and errors.
	const ENTITY_TYPE: &'static str;

	fn id(&self) -> Option<Self::Id>;

	/// Set by the store on first save. Ids never change afterwards.
	fn assign_id(&mut self, id: Self::Id);

	fn generate_id() -> Self::Id;

	fn name(&self) -> &str;

	fn pii(&self, field: PiiField) -> Option<&ProtectedValue>;

	fn set_pii(&mut self, field: PiiField, value: ProtectedValue);

	/// A new record carrying the request's non-PII fields.
	fn new_from_request(request: &Self::Request, now: DateTime<Utc>) -> IdentityResult<Self>;

	/// Patch the non-PII fields present in the request.
	fn apply_request(&mut self, request: &Self::Request, now: DateTime<Utc>) -> IdentityResult<()>;

	/// Build the outbound shape. `id` is the persisted id of this record.
	fn to_response(&self, id: Self::Id, pii: DecryptedPii) -> Self::Response;

	/// Audited field values. PII fields are represented by their hash.
	fn snapshot(&self) -> Snapshot;
}

/// Shared helper for [`IdentityRecord::snapshot`] implementations.
pub(crate) fn pii_hash<R: IdentityRecord>(record: &R, field: PiiField) -> Option<String> {
	record.pii(field).map(|v| v.hash().to_string())
}
