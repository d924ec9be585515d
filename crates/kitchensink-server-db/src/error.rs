// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use kitchensink_server_identity::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("Internal: {0}")]
	Internal(String),

	#[error("Audit change set is not valid JSON: {0}")]
	Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl From<DbError> for StoreError {
	fn from(e: DbError) -> Self {
		StoreError::Backend(e.to_string())
	}
}

pub(crate) fn is_unique_violation(e: &DbError) -> bool {
	match e {
		DbError::Sqlx(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
		_ => false,
	}
}
