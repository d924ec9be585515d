// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Duration, Utc};
use kitchensink_server_audit::{AuditAction, AuditEntry, ChangedFields};
use sqlx::{sqlite::SqlitePool, sqlite::SqliteRow, Row};
use uuid::Uuid;

use crate::error::{DbError, Result};
use crate::row::parse_timestamp;

/// Filters for [`AuditRepository::query_logs`]. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
	pub entity_type: Option<String>,
	pub entity_id: Option<String>,
	pub action: Option<AuditAction>,
	pub from: Option<DateTime<Utc>>,
	pub to: Option<DateTime<Utc>>,
	pub limit: Option<i64>,
	pub offset: Option<i64>,
}

pub struct AuditRepository {
	pool: SqlitePool,
}

impl AuditRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Matching entries, newest first, plus the total match count.
	#[tracing::instrument(skip(self))]
	pub async fn query_logs(&self, query: &AuditQuery) -> Result<(Vec<AuditEntry>, i64)> {
		let limit = query.limit.unwrap_or(50).clamp(1, 1000);
		let offset = query.offset.unwrap_or(0).max(0);

		let mut conditions = vec!["1=1"];
		let mut binds: Vec<String> = Vec::new();
		if let Some(v) = &query.entity_type {
			conditions.push("entity_type = ?");
			binds.push(v.clone());
		}
		if let Some(v) = &query.entity_id {
			conditions.push("entity_id = ?");
			binds.push(v.clone());
		}
		if let Some(v) = query.action {
			conditions.push("action = ?");
			binds.push(v.as_str().to_string());
		}
		if let Some(v) = query.from {
			conditions.push("timestamp >= ?");
			binds.push(v.to_rfc3339());
		}
		if let Some(v) = query.to {
			conditions.push("timestamp <= ?");
			binds.push(v.to_rfc3339());
		}

		let where_clause = conditions.join(" AND ");

		let count_sql = format!("SELECT COUNT(*) as cnt FROM audit_logs WHERE {where_clause}");
		let mut count_query = sqlx::query(&count_sql);
		for v in &binds {
			count_query = count_query.bind(v.as_str());
		}
		let total: i64 = count_query.fetch_one(&self.pool).await?.get("cnt");

		let data_sql = format!(
			"SELECT id, timestamp, entity_type, entity_id, action, changed_fields, \
			 performed_by, correlation_id, ip_address \
			 FROM audit_logs WHERE {where_clause} ORDER BY timestamp DESC, id DESC LIMIT ? OFFSET ?"
		);
		let mut data_query = sqlx::query(&data_sql);
		for v in &binds {
			data_query = data_query.bind(v.as_str());
		}
		data_query = data_query.bind(limit).bind(offset);

		let rows = data_query.fetch_all(&self.pool).await?;
		let logs = rows
			.iter()
			.map(entry_from_row)
			.collect::<Result<Vec<_>>>()?;

		Ok((logs, total))
	}

	/// Delete entries older than the retention window. Returns rows removed.
	#[tracing::instrument(skip(self))]
	pub async fn prune_older_than(&self, retention_days: i64) -> Result<u64> {
		if retention_days < 0 {
			return Err(DbError::Internal(format!(
				"retention must not be negative, got {retention_days} days"
			)));
		}
		let cutoff = Utc::now() - Duration::days(retention_days);
		let result = sqlx::query("DELETE FROM audit_logs WHERE timestamp < ?")
			.bind(cutoff.to_rfc3339())
			.execute(&self.pool)
			.await?;

		tracing::info!(
			removed = result.rows_affected(),
			retention_days,
			"pruned audit logs"
		);
		Ok(result.rows_affected())
	}
}

fn entry_from_row(row: &SqliteRow) -> Result<AuditEntry> {
	let id: String = row.get("id");
	let id = Uuid::parse_str(&id)
		.map_err(|e| DbError::Internal(format!("invalid audit id: {e}")))?;
	let action: String = row.get("action");
	let action = action.parse::<AuditAction>().map_err(DbError::Internal)?;
	let changed_fields: String = row.get("changed_fields");
	let changed_fields: ChangedFields = serde_json::from_str(&changed_fields)?;

	Ok(AuditEntry {
		id,
		timestamp: parse_timestamp("timestamp", row.get("timestamp"))?,
		entity_type: row.get("entity_type"),
		entity_id: row.get("entity_id"),
		action,
		changed_fields,
		performed_by: row.get("performed_by"),
		correlation_id: row.get("correlation_id"),
		ip_address: row.get("ip_address"),
	})
}
