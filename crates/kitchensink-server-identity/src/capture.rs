// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use kitchensink_server_audit::{diff_write, AuditEntryBuilder, Snapshot};

use crate::record::IdentityRecord;

/// Pre-image of a record, owned by the single write operation that took it.
///
/// A capture is either idle (create path, nothing to compare against) or armed
/// with the snapshot of the stored record. [`ChangeCapture::finish`] consumes
/// it, so a snapshot can never outlive its operation or be diffed twice.
#[derive(Debug)]
#[must_use = "a capture must be finished after the write to produce an audit entry"]
pub struct ChangeCapture {
	before: Option<Snapshot>,
}

impl ChangeCapture {
	pub fn for_create() -> Self {
		Self { before: None }
	}

	/// Take the snapshot. Call before the write, with the stored state.
	pub fn arm<R: IdentityRecord>(existing: &R) -> Self {
		Self {
			before: Some(existing.snapshot()),
		}
	}

	pub fn is_armed(&self) -> bool {
		self.before.is_some()
	}

	/// Diff the pre-image against the state returned by the write.
	///
	/// `None` when the write changed no audited field.
	pub fn finish<R: IdentityRecord>(self, saved: &R) -> Option<AuditEntryBuilder> {
		diff_write(self.before.as_ref(), &saved.snapshot())
	}
}
