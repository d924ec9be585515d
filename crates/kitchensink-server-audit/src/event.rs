// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit entry types.
//!
//! - [`AuditAction`]: what happened to the record
//! - [`AuditEntry`]: one append-only audit record
//! - [`AuditEntryBuilder`]: fluent construction, used by the differ

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default retention period for audit logs in days.
pub const DEFAULT_AUDIT_RETENTION_DAYS: i64 = 90;

/// Actor recorded when an operation carries no caller identity.
pub const SYSTEM_ACTOR: &str = "SYSTEM";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
	Create,
	Update,
	Delete,
}

impl AuditAction {
	pub fn as_str(&self) -> &'static str {
		match self {
			AuditAction::Create => "CREATE",
			AuditAction::Update => "UPDATE",
			AuditAction::Delete => "DELETE",
		}
	}
}

impl fmt::Display for AuditAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for AuditAction {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_uppercase().as_str() {
			"CREATE" => Ok(AuditAction::Create),
			"UPDATE" => Ok(AuditAction::Update),
			"DELETE" => Ok(AuditAction::Delete),
			other => Err(format!("unknown audit action '{other}'")),
		}
	}
}

/// Before and after value of one field. PII fields carry hashes here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
	pub old: Option<String>,
	pub new: Option<String>,
}

/// Field name to change, ordered by field name.
pub type ChangedFields = BTreeMap<String, FieldChange>;

/// One audit record. Entries are appended and never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
	pub id: Uuid,
	pub timestamp: DateTime<Utc>,
	/// Record kind, e.g. `member` or `user`.
	pub entity_type: String,
	pub entity_id: String,
	pub action: AuditAction,
	pub changed_fields: ChangedFields,
	/// Caller identity, [`SYSTEM_ACTOR`] when unknown.
	pub performed_by: String,
	pub correlation_id: Option<String>,
	pub ip_address: Option<String>,
}

impl AuditEntry {
	pub fn builder(
		action: AuditAction,
		entity_type: impl Into<String>,
		entity_id: impl Into<String>,
	) -> AuditEntryBuilder {
		AuditEntryBuilder::new(action, entity_type, entity_id)
	}
}

#[derive(Debug, Clone)]
pub struct AuditEntryBuilder {
	action: AuditAction,
	entity_type: String,
	entity_id: String,
	changed_fields: ChangedFields,
	performed_by: Option<String>,
	correlation_id: Option<String>,
	ip_address: Option<String>,
}

impl AuditEntryBuilder {
	pub fn new(
		action: AuditAction,
		entity_type: impl Into<String>,
		entity_id: impl Into<String>,
	) -> Self {
		Self {
			action,
			entity_type: entity_type.into(),
			entity_id: entity_id.into(),
			changed_fields: ChangedFields::new(),
			performed_by: None,
			correlation_id: None,
			ip_address: None,
		}
	}

	pub fn action(&self) -> AuditAction {
		self.action
	}

	pub fn changed_fields(mut self, changed_fields: ChangedFields) -> Self {
		self.changed_fields = changed_fields;
		self
	}

	pub fn performed_by(mut self, actor: impl Into<String>) -> Self {
		self.performed_by = Some(actor.into());
		self
	}

	pub fn correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
		self.correlation_id = Some(correlation_id.into());
		self
	}

	pub fn ip_address(mut self, ip: impl Into<String>) -> Self {
		self.ip_address = Some(ip.into());
		self
	}

	pub fn build(self) -> AuditEntry {
		AuditEntry {
			id: Uuid::new_v4(),
			timestamp: Utc::now(),
			entity_type: self.entity_type,
			entity_id: self.entity_id,
			action: self.action,
			changed_fields: self.changed_fields,
			performed_by: self
				.performed_by
				.filter(|actor| !actor.trim().is_empty())
				.unwrap_or_else(|| SYSTEM_ACTOR.to_string()),
			correlation_id: self.correlation_id,
			ip_address: self.ip_address,
		}
	}
}
