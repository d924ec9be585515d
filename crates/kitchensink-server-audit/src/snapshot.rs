// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Immutable field-level copies of a record, taken around a write.

use std::collections::BTreeMap;

/// Field values of one record at one point in time.
///
/// PII fields hold their lookup hash, never plaintext or ciphertext, so two
/// snapshots can be compared without decrypting anything. Empty strings are
/// stored as absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
	entity_type: String,
	entity_id: Option<String>,
	fields: BTreeMap<String, Option<String>>,
}

impl Snapshot {
	pub fn builder(entity_type: impl Into<String>, entity_id: Option<String>) -> SnapshotBuilder {
		SnapshotBuilder {
			snapshot: Snapshot {
				entity_type: entity_type.into(),
				entity_id,
				fields: BTreeMap::new(),
			},
		}
	}

	pub fn entity_type(&self) -> &str {
		&self.entity_type
	}

	pub fn entity_id(&self) -> Option<&str> {
		self.entity_id.as_deref()
	}

	pub fn get(&self, field: &str) -> Option<&str> {
		self.fields.get(field).and_then(|v| v.as_deref())
	}

	pub fn field_names(&self) -> impl Iterator<Item = &str> {
		self.fields.keys().map(String::as_str)
	}

	/// Fields that currently hold a value.
	pub fn present(&self) -> impl Iterator<Item = (&str, &str)> {
		self.fields
			.iter()
			.filter_map(|(k, v)| v.as_deref().map(|v| (k.as_str(), v)))
	}
}

#[derive(Debug)]
pub struct SnapshotBuilder {
	snapshot: Snapshot,
}

impl SnapshotBuilder {
	pub fn field(mut self, name: &str, value: Option<String>) -> Self {
		let value = value.filter(|v| !v.is_empty());
		self.snapshot.fields.insert(name.to_string(), value);
		self
	}

	pub fn build(self) -> Snapshot {
		self.snapshot
	}
}
