// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use kitchensink_server_identity::{
	IdentityRecord, IdentityStore, Member, MemberId, MemberStatus, PiiField, StoreError,
};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

use crate::error::{is_unique_violation, DbError, Result};
use crate::row::{encrypted_of, hash_of, parse_timestamp, protected};

const MEMBER_COLUMNS: &str = "id, name, email_hash, email_encrypted, phone_hash, phone_encrypted, \
	 status, created_at, updated_at";

#[derive(Clone)]
pub struct MemberRepository {
	pool: SqlitePool,
}

impl MemberRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, member), fields(member_id = ?member.id))]
	pub async fn insert_member(&self, member: &Member) -> Result<()> {
		let id = member
			.id
			.ok_or_else(|| DbError::Internal("member has no id".to_string()))?;

		sqlx::query(
			r#"
			INSERT INTO members (
				id, name, email_hash, email_encrypted, phone_hash, phone_encrypted,
				status, created_at, updated_at
			) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(id.to_string())
		.bind(&member.name)
		.bind(hash_of(member.email.as_ref()))
		.bind(encrypted_of(member.email.as_ref()))
		.bind(hash_of(member.phone_number.as_ref()))
		.bind(encrypted_of(member.phone_number.as_ref()))
		.bind(member.status.as_str())
		.bind(member.created_at.to_rfc3339())
		.bind(member.updated_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	/// Overwrite an existing member. Returns `false` when no row has its id.
	#[tracing::instrument(skip(self, member), fields(member_id = ?member.id))]
	pub async fn update_member(&self, member: &Member) -> Result<bool> {
		let id = member
			.id
			.ok_or_else(|| DbError::Internal("member has no id".to_string()))?;

		let result = sqlx::query(
			r#"
			UPDATE members SET
				name = ?,
				email_hash = ?,
				email_encrypted = ?,
				phone_hash = ?,
				phone_encrypted = ?,
				status = ?,
				updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(&member.name)
		.bind(hash_of(member.email.as_ref()))
		.bind(encrypted_of(member.email.as_ref()))
		.bind(hash_of(member.phone_number.as_ref()))
		.bind(encrypted_of(member.phone_number.as_ref()))
		.bind(member.status.as_str())
		.bind(member.updated_at.to_rfc3339())
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected() > 0)
	}

	#[tracing::instrument(skip(self), fields(member_id = %id))]
	pub async fn get_member(&self, id: MemberId) -> Result<Option<Member>> {
		let sql = format!("SELECT {MEMBER_COLUMNS} FROM members WHERE id = ?");
		let row = sqlx::query(&sql)
			.bind(id.to_string())
			.fetch_optional(&self.pool)
			.await?;
		row.as_ref().map(member_from_row).transpose()
	}

	#[tracing::instrument(skip(self, hash))]
	pub async fn get_by_hash(&self, field: PiiField, hash: &str) -> Result<Option<Member>> {
		let sql = format!(
			"SELECT {MEMBER_COLUMNS} FROM members WHERE {} = ?",
			field.hash_column()
		);
		let row = sqlx::query(&sql)
			.bind(hash)
			.fetch_optional(&self.pool)
			.await?;
		row.as_ref().map(member_from_row).transpose()
	}

	#[tracing::instrument(skip(self, hash))]
	pub async fn hash_exists(&self, field: PiiField, hash: &str) -> Result<bool> {
		let sql = format!(
			"SELECT EXISTS(SELECT 1 FROM members WHERE {} = ?) AS present",
			field.hash_column()
		);
		let present: i64 = sqlx::query(&sql)
			.bind(hash)
			.fetch_one(&self.pool)
			.await?
			.get("present");
		Ok(present != 0)
	}

	#[tracing::instrument(skip(self), fields(member_id = %id))]
	pub async fn delete_member(&self, id: MemberId) -> Result<bool> {
		let result = sqlx::query("DELETE FROM members WHERE id = ?")
			.bind(id.to_string())
			.execute(&self.pool)
			.await?;
		Ok(result.rows_affected() > 0)
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_members(&self) -> Result<Vec<Member>> {
		let sql = format!("SELECT {MEMBER_COLUMNS} FROM members ORDER BY name ASC, id ASC");
		let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
		rows.iter().map(member_from_row).collect()
	}

	#[tracing::instrument(skip(self))]
	pub async fn search_members(&self, fragment: &str) -> Result<Vec<Member>> {
		let sql = format!(
			"SELECT {MEMBER_COLUMNS} FROM members \
			 WHERE instr(lower(name), lower(?)) > 0 ORDER BY name ASC, id ASC"
		);
		let rows = sqlx::query(&sql)
			.bind(fragment)
			.fetch_all(&self.pool)
			.await?;
		rows.iter().map(member_from_row).collect()
	}

	/// The PII field another member already holds, after a unique-index failure.
	async fn conflicting_field(&self, member: &Member) -> Result<Option<PiiField>> {
		for field in PiiField::ALL {
			let Some(value) = member.pii(field) else {
				continue;
			};
			if let Some(other) = self.get_by_hash(field, value.hash()).await? {
				if other.id != member.id {
					return Ok(Some(field));
				}
			}
		}
		Ok(None)
	}
}

fn member_from_row(row: &SqliteRow) -> Result<Member> {
	let id: String = row.get("id");
	let id = id
		.parse::<MemberId>()
		.map_err(|e| DbError::Internal(format!("invalid member id: {e}")))?;
	let status: String = row.get("status");
	let status = status
		.parse::<MemberStatus>()
		.map_err(DbError::Internal)?;

	Ok(Member {
		id: Some(id),
		name: row.get("name"),
		email: protected(row, PiiField::Email)?,
		phone_number: protected(row, PiiField::PhoneNumber)?,
		status,
		created_at: parse_timestamp("created_at", row.get("created_at"))?,
		updated_at: parse_timestamp("updated_at", row.get("updated_at"))?,
	})
}

#[async_trait]
impl IdentityStore<Member> for MemberRepository {
	async fn save(&self, mut record: Member) -> std::result::Result<Member, StoreError> {
		let written = match record.id() {
			Some(_) => self.update_member(&record).await,
			None => {
				record.assign_id(MemberId::generate());
				self.insert_member(&record).await.map(|()| true)
			}
		};
		match written {
			Ok(true) => Ok(record),
			Ok(false) => Err(StoreError::Missing),
			Err(e) if is_unique_violation(&e) => match self.conflicting_field(&record).await? {
				Some(field) => Err(StoreError::Conflict { field }),
				None => Err(e.into()),
			},
			Err(e) => Err(e.into()),
		}
	}

	async fn find_by_id(&self, id: MemberId) -> std::result::Result<Option<Member>, StoreError> {
		Ok(self.get_member(id).await?)
	}

	async fn exists_by_hash(
		&self,
		field: PiiField,
		hash: &str,
	) -> std::result::Result<bool, StoreError> {
		Ok(self.hash_exists(field, hash).await?)
	}

	async fn find_by_hash(
		&self,
		field: PiiField,
		hash: &str,
	) -> std::result::Result<Option<Member>, StoreError> {
		Ok(self.get_by_hash(field, hash).await?)
	}

	async fn delete(&self, id: MemberId) -> std::result::Result<bool, StoreError> {
		Ok(self.delete_member(id).await?)
	}

	async fn list(&self) -> std::result::Result<Vec<Member>, StoreError> {
		Ok(self.list_members().await?)
	}

	async fn search_by_name(&self, fragment: &str) -> std::result::Result<Vec<Member>, StoreError> {
		Ok(self.search_members(fragment).await?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;
	use chrono::Utc;
	use kitchensink_server_identity::ProtectedValue;

	fn member(name: &str, email_hash: &str, phone_hash: &str) -> Member {
		let now = Utc::now();
		Member {
			id: None,
			name: name.to_string(),
			email: Some(ProtectedValue::from_stored(email_hash, "v1:ZW1haWw=")),
			phone_number: Some(ProtectedValue::from_stored(phone_hash, "v1:cGhvbmU=")),
			status: MemberStatus::Active,
			created_at: now,
			updated_at: now,
		}
	}

	#[tokio::test]
	async fn save_and_reload() {
		let repo = MemberRepository::new(create_test_pool().await);
		let saved = repo.save(member("Ann", "e1", "p1")).await.unwrap();
		let id = saved.id.unwrap();

		let loaded = repo.find_by_id(id).await.unwrap().unwrap();
		assert_eq!(loaded.name, "Ann");
		assert_eq!(loaded.email, saved.email);
		assert_eq!(loaded.phone_number, saved.phone_number);
		assert_eq!(loaded.status, MemberStatus::Active);
		assert_eq!(loaded.created_at.timestamp(), saved.created_at.timestamp());
	}

	#[tokio::test]
	async fn save_updates_existing_row() {
		let repo = MemberRepository::new(create_test_pool().await);
		let mut saved = repo.save(member("Ann", "e1", "p1")).await.unwrap();
		saved.name = "Anna".to_string();
		saved.status = MemberStatus::Inactive;
		saved.phone_number = None;
		repo.save(saved.clone()).await.unwrap();

		let members = repo.list().await.unwrap();
		assert_eq!(members.len(), 1);
		assert_eq!(members[0].name, "Anna");
		assert_eq!(members[0].status, MemberStatus::Inactive);
		assert!(members[0].phone_number.is_none());
	}

	#[tokio::test]
	async fn save_after_delete_does_not_recreate_the_row() {
		let repo = MemberRepository::new(create_test_pool().await);
		let saved = repo.save(member("Ann", "e1", "p1")).await.unwrap();
		assert!(repo.delete(saved.id.unwrap()).await.unwrap());

		let err = repo.save(saved).await.unwrap_err();
		assert!(matches!(err, StoreError::Missing));
		assert!(repo.list().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn unique_violation_reports_the_field() {
		let repo = MemberRepository::new(create_test_pool().await);
		repo.save(member("Ann", "e1", "p1")).await.unwrap();

		let err = repo.save(member("Bob", "e2", "p1")).await.unwrap_err();
		assert!(matches!(
			err,
			StoreError::Conflict {
				field: PiiField::PhoneNumber
			}
		));

		let err = repo.save(member("Bob", "e1", "p2")).await.unwrap_err();
		assert!(matches!(
			err,
			StoreError::Conflict {
				field: PiiField::Email
			}
		));
	}

	#[tokio::test]
	async fn members_without_pii_do_not_collide() {
		let repo = MemberRepository::new(create_test_pool().await);
		let mut a = member("Ann", "e1", "p1");
		a.phone_number = None;
		let mut b = member("Bob", "e2", "p2");
		b.phone_number = None;
		repo.save(a).await.unwrap();
		repo.save(b).await.unwrap();
		assert_eq!(repo.list().await.unwrap().len(), 2);
	}

	#[tokio::test]
	async fn hash_lookups_and_search() {
		let repo = MemberRepository::new(create_test_pool().await);
		let ann = repo.save(member("Ann", "e1", "p1")).await.unwrap();
		repo.save(member("Joanna", "e2", "p2")).await.unwrap();
		repo.save(member("Zed", "e3", "p3")).await.unwrap();

		assert!(repo.exists_by_hash(PiiField::Email, "e1").await.unwrap());
		assert!(!repo.exists_by_hash(PiiField::Email, "p1").await.unwrap());
		assert_eq!(
			repo.find_by_hash(PiiField::PhoneNumber, "p1")
				.await
				.unwrap()
				.unwrap()
				.id,
			ann.id
		);

		let names: Vec<_> = repo
			.search_by_name("aNN")
			.await
			.unwrap()
			.into_iter()
			.map(|m| m.name)
			.collect();
		assert_eq!(names, vec!["Ann", "Joanna"]);
	}

	#[tokio::test]
	async fn delete_reports_missing_rows() {
		let repo = MemberRepository::new(create_test_pool().await);
		let ann = repo.save(member("Ann", "e1", "p1")).await.unwrap();
		let id = ann.id.unwrap();

		assert!(repo.delete(id).await.unwrap());
		assert!(!repo.delete(id).await.unwrap());
		assert!(repo.find_by_id(id).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn half_written_pii_is_rejected_on_read() {
		let pool = create_test_pool().await;
		let repo = MemberRepository::new(pool.clone());
		let ann = repo.save(member("Ann", "e1", "p1")).await.unwrap();

		sqlx::query("UPDATE members SET email_encrypted = NULL")
			.execute(&pool)
			.await
			.unwrap();

		let err = repo.get_member(ann.id.unwrap()).await.unwrap_err();
		assert!(matches!(err, DbError::Internal(_)));
	}
}
