// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::SqlitePool;

use crate::error::Result;

const MIGRATIONS: &[(&str, &str)] = &[
	(
		"001_create_members",
		include_str!("../migrations/001_create_members.sql"),
	),
	(
		"002_create_users",
		include_str!("../migrations/002_create_users.sql"),
	),
	(
		"003_create_audit_logs",
		include_str!("../migrations/003_create_audit_logs.sql"),
	),
];

/// Run all database migrations.
///
/// Migrations are idempotent - safe to run multiple times.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
	for (name, sql) in MIGRATIONS {
		for stmt in sql.split(';').filter(|s| !s.trim().is_empty()) {
			sqlx::query(stmt).execute(pool).await?;
		}
		tracing::debug!(migration = name, "migration applied");
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;
	use sqlx::Row;

	#[tokio::test]
	async fn migrations_are_idempotent() {
		let pool = create_test_pool().await;
		run_migrations(&pool).await.unwrap();

		let rows = sqlx::query(
			"SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
		)
		.fetch_all(&pool)
		.await
		.unwrap();
		let tables: Vec<String> = rows.iter().map(|r| r.get("name")).collect();
		assert_eq!(tables, vec!["audit_logs", "members", "users"]);
	}
}
