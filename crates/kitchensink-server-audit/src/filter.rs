// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};

use crate::event::{AuditAction, AuditEntry};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditFilterConfig {
	pub include_actions: Option<Vec<AuditAction>>,
	pub exclude_entity_types: Option<Vec<String>>,
}

impl AuditFilterConfig {
	pub fn allows(&self, entry: &AuditEntry) -> bool {
		if let Some(ref exclude) = self.exclude_entity_types {
			if exclude.iter().any(|t| t == &entry.entity_type) {
				return false;
			}
		}

		if let Some(ref include) = self.include_actions {
			if !include.contains(&entry.action) {
				return false;
			}
		}

		true
	}
}
