// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

pub mod diff;
pub mod error;
pub mod event;
pub mod filter;
pub mod pipeline;
pub mod sink;
pub mod snapshot;

pub use diff::{diff_delete, diff_write};
pub use error::{AuditError, AuditResult, AuditSinkError};
pub use event::{
	AuditAction, AuditEntry, AuditEntryBuilder, ChangedFields, FieldChange,
	DEFAULT_AUDIT_RETENTION_DAYS, SYSTEM_ACTOR,
};
pub use filter::AuditFilterConfig;
pub use pipeline::AuditService;
pub use sink::AuditSink;
pub use snapshot::{Snapshot, SnapshotBuilder};

pub use kitchensink_server_config::{AuditConfig, QueueOverflowPolicy};

#[cfg(feature = "sink-sqlite")]
pub use sink::sqlite::SqliteAuditSink;

#[cfg(feature = "sink-tracing")]
pub use sink::tracing::TracingAuditSink;
