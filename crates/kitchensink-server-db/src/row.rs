// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Column decoding shared by the repositories.

use chrono::{DateTime, NaiveDate, Utc};
use kitchensink_server_identity::{PiiField, ProtectedValue};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::error::{DbError, Result};

pub(crate) const DATE_COLUMN_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(value)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("invalid {column} timestamp: {e}")))
}

pub(crate) fn parse_date(column: &str, value: &str) -> Result<NaiveDate> {
	NaiveDate::parse_from_str(value, DATE_COLUMN_FORMAT)
		.map_err(|e| DbError::Internal(format!("invalid {column} date: {e}")))
}

/// Reads a hash/ciphertext column pair. Both or neither must be set.
pub(crate) fn protected(row: &SqliteRow, field: PiiField) -> Result<Option<ProtectedValue>> {
	let hash: Option<String> = row.try_get(field.hash_column())?;
	let encrypted: Option<String> = row.try_get(field.encrypted_column())?;
	match (hash, encrypted) {
		(Some(hash), Some(encrypted)) => Ok(Some(ProtectedValue::from_stored(hash, encrypted))),
		(None, None) => Ok(None),
		_ => Err(DbError::Internal(format!(
			"{field} has only one of its hash and ciphertext columns set"
		))),
	}
}

pub(crate) fn hash_of(value: Option<&ProtectedValue>) -> Option<&str> {
	value.map(|v| v.hash())
}

pub(crate) fn encrypted_of(value: Option<&ProtectedValue>) -> Option<&str> {
	value.map(|v| v.encrypted().as_str())
}
