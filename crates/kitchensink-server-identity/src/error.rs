// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;
use crate::types::PiiField;

pub type IdentityResult<T> = Result<T, IdentityError>;

/// Category of an [`IdentityError`] as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
	Validation,
	Decryption,
	ResourceConflict,
	NotFound,
	Internal,
}

#[derive(Debug, Error)]
pub enum IdentityError {
	#[error("invalid {field}: {message}")]
	Validation {
		field: &'static str,
		message: String,
	},

	#[error("stored {field} cannot be decrypted")]
	Decryption { field: PiiField },

	#[error("a record with this {field} already exists")]
	ResourceConflict { field: PiiField },

	#[error("{entity_type} {id} not found")]
	NotFound { entity_type: &'static str, id: String },

	#[error("{entity_type} has no id after save")]
	NotPersisted { entity_type: &'static str },

	#[error("failed to encrypt {field}")]
	Encryption { field: PiiField },

	#[error("store error: {0}")]
	Store(String),
}

impl IdentityError {
	pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
		IdentityError::Validation {
			field,
			message: message.into(),
		}
	}

	pub fn kind(&self) -> ErrorKind {
		match self {
			IdentityError::Validation { .. } => ErrorKind::Validation,
			IdentityError::Decryption { .. } => ErrorKind::Decryption,
			IdentityError::ResourceConflict { .. } => ErrorKind::ResourceConflict,
			IdentityError::NotFound { .. } => ErrorKind::NotFound,
			IdentityError::NotPersisted { .. }
			| IdentityError::Encryption { .. }
			| IdentityError::Store(_) => ErrorKind::Internal,
		}
	}

	/// Name of the offending field, where one applies.
	pub fn field(&self) -> Option<&'static str> {
		match self {
			IdentityError::Validation { field, .. } => Some(*field),
			IdentityError::Decryption { field }
			| IdentityError::ResourceConflict { field }
			| IdentityError::Encryption { field } => Some(field.as_str()),
			_ => None,
		}
	}

	/// Caller-safe representation. Internal failures never expose their text.
	pub fn public_body(&self) -> ErrorBody {
		let message = match self.kind() {
			ErrorKind::Internal => "internal error".to_string(),
			_ => self.to_string(),
		};
		ErrorBody {
			kind: self.kind(),
			field: self.field(),
			message,
		}
	}
}

impl From<StoreError> for IdentityError {
	fn from(e: StoreError) -> Self {
		match e {
			StoreError::Conflict { field } => IdentityError::ResourceConflict { field },
			StoreError::Missing => IdentityError::Store("record no longer exists".to_string()),
			StoreError::Backend(message) => IdentityError::Store(message),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
	pub kind: ErrorKind,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub field: Option<&'static str>,
	pub message: String,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn conflict_carries_field() {
		let err: IdentityError = StoreError::Conflict {
			field: PiiField::Email,
		}
		.into();
		assert_eq!(err.kind(), ErrorKind::ResourceConflict);
		assert_eq!(err.field(), Some("email"));
	}

	#[test]
	fn internal_errors_are_not_exposed() {
		let err: IdentityError = StoreError::Backend("disk I/O error at /var/db".to_string()).into();
		let body = err.public_body();
		assert_eq!(body.kind, ErrorKind::Internal);
		assert_eq!(body.field, None);
		assert_eq!(body.message, "internal error");
	}

	#[test]
	fn validation_body() {
		let err = IdentityError::validation("name", "must not contain digits");
		let body = err.public_body();
		assert_eq!(body.kind, ErrorKind::Validation);
		assert_eq!(body.field, Some("name"));
		assert_eq!(body.message, "invalid name: must not contain digits");

		let json = serde_json::to_value(&body).unwrap();
		assert_eq!(json["kind"], "VALIDATION");
	}

	#[test]
	fn not_found_has_no_field() {
		let err = IdentityError::NotFound {
			entity_type: "member",
			id: "42".to_string(),
		};
		assert_eq!(err.kind(), ErrorKind::NotFound);
		assert!(err.public_body().field.is_none());
		assert!(serde_json::to_string(&err.public_body())
			.unwrap()
			.find("field")
			.is_none());
	}
}
