// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit logging configuration section.

use serde::{Deserialize, Serialize};

const DEFAULT_QUEUE_CAPACITY: usize = 10000;
const DEFAULT_RETENTION_DAYS: i64 = 90;

/// What the audit queue does when it is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueueOverflowPolicy {
	#[default]
	DropNewest,
	DropOldest,
	Block,
}

impl std::str::FromStr for QueueOverflowPolicy {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"drop_newest" => Ok(Self::DropNewest),
			"drop_oldest" => Ok(Self::DropOldest),
			"block" => Ok(Self::Block),
			other => Err(format!("unknown overflow policy '{other}'")),
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuditConfigLayer {
	pub enabled: Option<bool>,
	pub retention_days: Option<i64>,
	pub queue_capacity: Option<usize>,
	pub queue_overflow_policy: Option<QueueOverflowPolicy>,
	pub sqlite_sink: Option<bool>,
	pub tracing_sink: Option<bool>,
	/// Action names (`CREATE`, `UPDATE`, `DELETE`) to record. Unset records all.
	pub include_actions: Option<Vec<String>>,
	pub exclude_entity_types: Option<Vec<String>>,
}

impl AuditConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.retention_days.is_some() {
			self.retention_days = other.retention_days;
		}
		if other.queue_capacity.is_some() {
			self.queue_capacity = other.queue_capacity;
		}
		if other.queue_overflow_policy.is_some() {
			self.queue_overflow_policy = other.queue_overflow_policy;
		}
		if other.sqlite_sink.is_some() {
			self.sqlite_sink = other.sqlite_sink;
		}
		if other.tracing_sink.is_some() {
			self.tracing_sink = other.tracing_sink;
		}
		if other.include_actions.is_some() {
			self.include_actions = other.include_actions;
		}
		if other.exclude_entity_types.is_some() {
			self.exclude_entity_types = other.exclude_entity_types;
		}
	}

	pub fn finalize(self) -> AuditConfig {
		AuditConfig {
			enabled: self.enabled.unwrap_or(true),
			retention_days: self.retention_days.unwrap_or(DEFAULT_RETENTION_DAYS),
			queue_capacity: self
				.queue_capacity
				.filter(|c| *c > 0)
				.unwrap_or(DEFAULT_QUEUE_CAPACITY),
			queue_overflow_policy: self.queue_overflow_policy.unwrap_or_default(),
			sqlite_sink: self.sqlite_sink.unwrap_or(true),
			tracing_sink: self.tracing_sink.unwrap_or(false),
			include_actions: self.include_actions,
			exclude_entity_types: self.exclude_entity_types,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditConfig {
	pub enabled: bool,
	pub retention_days: i64,
	pub queue_capacity: usize,
	pub queue_overflow_policy: QueueOverflowPolicy,
	pub sqlite_sink: bool,
	pub tracing_sink: bool,
	pub include_actions: Option<Vec<String>>,
	pub exclude_entity_types: Option<Vec<String>>,
}

impl Default for AuditConfig {
	fn default() -> Self {
		AuditConfigLayer::default().finalize()
	}
}
