// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Turns a before/after pair of [`Snapshot`]s into an audit entry.

use tracing::warn;

use crate::event::{AuditAction, AuditEntry, AuditEntryBuilder, ChangedFields, FieldChange};
use crate::snapshot::Snapshot;

/// Diff the state after a successful write against the pre-image.
///
/// - No pre-image: `CREATE` listing every non-empty field.
/// - Pre-image with the same id: `UPDATE` listing only differing fields, or
///   `None` when the write changed nothing.
///
/// Returns `None` when the written state has no id, since an entry without an
/// entity id cannot be attributed.
pub fn diff_write(before: Option<&Snapshot>, after: &Snapshot) -> Option<AuditEntryBuilder> {
	let Some(entity_id) = after.entity_id() else {
		warn!(
			entity_type = after.entity_type(),
			"written record has no id, skipping audit"
		);
		return None;
	};

	let before = match before {
		Some(before) if before.entity_id() == Some(entity_id) => Some(before),
		Some(before) => {
			warn!(
				entity_type = after.entity_type(),
				entity_id,
				snapshot_id = before.entity_id(),
				"snapshot id does not match written record, auditing as create"
			);
			None
		}
		None => None,
	};

	let (action, changed_fields) = match before {
		None => (AuditAction::Create, created_fields(after)),
		Some(before) => {
			let changes = updated_fields(before, after);
			if changes.is_empty() {
				return None;
			}
			(AuditAction::Update, changes)
		}
	};

	Some(
		AuditEntry::builder(action, after.entity_type(), entity_id).changed_fields(changed_fields),
	)
}

/// Entry for a successful delete. Carries no field changes.
pub fn diff_delete(entity_type: &str, entity_id: &str) -> AuditEntryBuilder {
	AuditEntry::builder(AuditAction::Delete, entity_type, entity_id)
}

fn created_fields(after: &Snapshot) -> ChangedFields {
	after
		.present()
		.map(|(name, value)| {
			(
				name.to_string(),
				FieldChange {
					old: None,
					new: Some(value.to_string()),
				},
			)
		})
		.collect()
}

fn updated_fields(before: &Snapshot, after: &Snapshot) -> ChangedFields {
	let mut changes = ChangedFields::new();
	let names = before.field_names().chain(after.field_names());
	for name in names {
		if changes.contains_key(name) {
			continue;
		}
		let old = before.get(name);
		let new = after.get(name);
		if old != new {
			changes.insert(
				name.to_string(),
				FieldChange {
					old: old.map(str::to_string),
					new: new.map(str::to_string),
				},
			);
		}
	}
	changes
}
