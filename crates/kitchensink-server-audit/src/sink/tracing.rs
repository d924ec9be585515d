// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;

use super::{AuditSink, AuditSinkError};
use crate::event::AuditEntry;
use crate::filter::AuditFilterConfig;

/// Mirrors audit entries into the log stream under target `kitchensink_audit`.
pub struct TracingAuditSink {
	filter: AuditFilterConfig,
}

impl TracingAuditSink {
	pub fn new(filter: AuditFilterConfig) -> Self {
		Self { filter }
	}
}

#[async_trait]
impl AuditSink for TracingAuditSink {
	fn name(&self) -> &str {
		"tracing"
	}

	fn filter(&self) -> &AuditFilterConfig {
		&self.filter
	}

	async fn publish(&self, entry: Arc<AuditEntry>) -> Result<(), AuditSinkError> {
		let changed_fields = serde_json::to_string(&entry.changed_fields)
			.map_err(|e| AuditSinkError::Permanent(format!("failed to serialize changes: {e}")))?;

		tracing::info!(
			target: "kitchensink_audit",
			id = %entry.id,
			timestamp = %entry.timestamp.to_rfc3339(),
			action = %entry.action,
			entity_type = %entry.entity_type,
			entity_id = %entry.entity_id,
			performed_by = %entry.performed_by,
			correlation_id = entry.correlation_id.as_deref(),
			ip_address = entry.ip_address.as_deref(),
			changed_fields,
			"audit entry"
		);

		Ok(())
	}
}
