// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use thiserror::Error;

use crate::record::IdentityRecord;
use crate::types::PiiField;

#[derive(Debug, Error)]
pub enum StoreError {
	/// Another record already holds this hash.
	#[error("duplicate value for {field}")]
	Conflict { field: PiiField },

	/// An update targeted a record that no longer exists.
	#[error("record no longer exists")]
	Missing,

	#[error("{0}")]
	Backend(String),
}

/// Persistence collaborator for one record kind.
///
/// Implementations enforce uniqueness of each PII hash and report violations
/// as [`StoreError::Conflict`].
#[async_trait]
pub trait IdentityStore<R: IdentityRecord>: Send + Sync {
	/// Persist a record and return the stored state.
	///
	/// A record without an id is inserted under a fresh id. A record with an id
	/// replaces the stored one and fails with [`StoreError::Missing`] when that
	/// record has been deleted; it is never re-created.
	async fn save(&self, record: R) -> Result<R, StoreError>;

	async fn find_by_id(&self, id: R::Id) -> Result<Option<R>, StoreError>;

	async fn exists_by_hash(&self, field: PiiField, hash: &str) -> Result<bool, StoreError>;

	async fn find_by_hash(&self, field: PiiField, hash: &str) -> Result<Option<R>, StoreError>;

	/// Returns `false` when no record had this id.
	async fn delete(&self, id: R::Id) -> Result<bool, StoreError>;

	/// All records ordered by name.
	async fn list(&self) -> Result<Vec<R>, StoreError>;

	/// Records whose name contains `fragment`, case-insensitively, ordered by name.
	async fn search_by_name(&self, fragment: &str) -> Result<Vec<R>, StoreError>;
}
