// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use kitchensink_server_identity::{
	IdentityRecord, IdentityStore, MemberStatus, PiiField, StoreError, User, UserId,
};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

use crate::error::{is_unique_violation, DbError, Result};
use crate::row::{
	encrypted_of, hash_of, parse_date, parse_timestamp, protected, DATE_COLUMN_FORMAT,
};

const USER_COLUMNS: &str = "id, name, email_hash, email_encrypted, phone_hash, phone_encrypted, \
	 isd_code, date_of_birth, address, city, country, status, registration_date, \
	 last_login_date, created_at, updated_at";

#[derive(Clone)]
pub struct UserRepository {
	pool: SqlitePool,
}

impl UserRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, user), fields(user_id = ?user.id))]
	pub async fn insert_user(&self, user: &User) -> Result<()> {
		let id = user
			.id
			.ok_or_else(|| DbError::Internal("user has no id".to_string()))?;

		sqlx::query(
			r#"
			INSERT INTO users (
				id, name, email_hash, email_encrypted, phone_hash, phone_encrypted,
				isd_code, date_of_birth, address, city, country, status,
				registration_date, last_login_date, created_at, updated_at
			) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(id.to_string())
		.bind(&user.name)
		.bind(hash_of(user.email.as_ref()))
		.bind(encrypted_of(user.email.as_ref()))
		.bind(hash_of(user.phone_number.as_ref()))
		.bind(encrypted_of(user.phone_number.as_ref()))
		.bind(&user.isd_code)
		.bind(
			user.date_of_birth
				.map(|d| d.format(DATE_COLUMN_FORMAT).to_string()),
		)
		.bind(&user.address)
		.bind(&user.city)
		.bind(&user.country)
		.bind(user.status.as_str())
		.bind(user.registration_date.to_rfc3339())
		.bind(user.last_login_date.map(|d| d.to_rfc3339()))
		.bind(user.created_at.to_rfc3339())
		.bind(user.updated_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	/// Overwrite an existing user. Returns `false` when no row has its id.
	#[tracing::instrument(skip(self, user), fields(user_id = ?user.id))]
	pub async fn update_user(&self, user: &User) -> Result<bool> {
		let id = user
			.id
			.ok_or_else(|| DbError::Internal("user has no id".to_string()))?;

		let result = sqlx::query(
			r#"
			UPDATE users SET
				name = ?,
				email_hash = ?,
				email_encrypted = ?,
				phone_hash = ?,
				phone_encrypted = ?,
				isd_code = ?,
				date_of_birth = ?,
				address = ?,
				city = ?,
				country = ?,
				status = ?,
				last_login_date = ?,
				updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(&user.name)
		.bind(hash_of(user.email.as_ref()))
		.bind(encrypted_of(user.email.as_ref()))
		.bind(hash_of(user.phone_number.as_ref()))
		.bind(encrypted_of(user.phone_number.as_ref()))
		.bind(&user.isd_code)
		.bind(
			user.date_of_birth
				.map(|d| d.format(DATE_COLUMN_FORMAT).to_string()),
		)
		.bind(&user.address)
		.bind(&user.city)
		.bind(&user.country)
		.bind(user.status.as_str())
		.bind(user.last_login_date.map(|d| d.to_rfc3339()))
		.bind(user.updated_at.to_rfc3339())
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected() > 0)
	}

	#[tracing::instrument(skip(self), fields(user_id = %id))]
	pub async fn get_user(&self, id: UserId) -> Result<Option<User>> {
		let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
		let row = sqlx::query(&sql)
			.bind(id.to_string())
			.fetch_optional(&self.pool)
			.await?;
		row.as_ref().map(user_from_row).transpose()
	}

	#[tracing::instrument(skip(self, hash))]
	pub async fn get_by_hash(&self, field: PiiField, hash: &str) -> Result<Option<User>> {
		let sql = format!(
			"SELECT {USER_COLUMNS} FROM users WHERE {} = ?",
			field.hash_column()
		);
		let row = sqlx::query(&sql)
			.bind(hash)
			.fetch_optional(&self.pool)
			.await?;
		row.as_ref().map(user_from_row).transpose()
	}

	#[tracing::instrument(skip(self, hash))]
	pub async fn hash_exists(&self, field: PiiField, hash: &str) -> Result<bool> {
		let sql = format!(
			"SELECT EXISTS(SELECT 1 FROM users WHERE {} = ?) AS present",
			field.hash_column()
		);
		let present: i64 = sqlx::query(&sql)
			.bind(hash)
			.fetch_one(&self.pool)
			.await?
			.get("present");
		Ok(present != 0)
	}

	#[tracing::instrument(skip(self), fields(user_id = %id))]
	pub async fn delete_user(&self, id: UserId) -> Result<bool> {
		let result = sqlx::query("DELETE FROM users WHERE id = ?")
			.bind(id.to_string())
			.execute(&self.pool)
			.await?;
		Ok(result.rows_affected() > 0)
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_users(&self) -> Result<Vec<User>> {
		let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY name ASC, id ASC");
		let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
		rows.iter().map(user_from_row).collect()
	}

	#[tracing::instrument(skip(self))]
	pub async fn search_users(&self, fragment: &str) -> Result<Vec<User>> {
		let sql = format!(
			"SELECT {USER_COLUMNS} FROM users \
			 WHERE instr(lower(name), lower(?)) > 0 ORDER BY name ASC, id ASC"
		);
		let rows = sqlx::query(&sql)
			.bind(fragment)
			.fetch_all(&self.pool)
			.await?;
		rows.iter().map(user_from_row).collect()
	}

	async fn conflicting_field(&self, user: &User) -> Result<Option<PiiField>> {
		for field in PiiField::ALL {
			let Some(value) = user.pii(field) else {
				continue;
			};
			if let Some(other) = self.get_by_hash(field, value.hash()).await? {
				if other.id != user.id {
					return Ok(Some(field));
				}
			}
		}
		Ok(None)
	}
}

fn user_from_row(row: &SqliteRow) -> Result<User> {
	let id: String = row.get("id");
	let id = id
		.parse::<UserId>()
		.map_err(|e| DbError::Internal(format!("invalid user id: {e}")))?;
	let status: String = row.get("status");
	let status = status.parse::<MemberStatus>().map_err(DbError::Internal)?;
	let date_of_birth: Option<String> = row.get("date_of_birth");
	let last_login_date: Option<String> = row.get("last_login_date");

	Ok(User {
		id: Some(id),
		name: row.get("name"),
		email: protected(row, PiiField::Email)?,
		phone_number: protected(row, PiiField::PhoneNumber)?,
		isd_code: row.get("isd_code"),
		date_of_birth: date_of_birth
			.as_deref()
			.map(|d| parse_date("date_of_birth", d))
			.transpose()?,
		address: row.get("address"),
		city: row.get("city"),
		country: row.get("country"),
		status,
		registration_date: parse_timestamp("registration_date", row.get("registration_date"))?,
		last_login_date: last_login_date
			.as_deref()
			.map(|d| parse_timestamp("last_login_date", d))
			.transpose()?,
		created_at: parse_timestamp("created_at", row.get("created_at"))?,
		updated_at: parse_timestamp("updated_at", row.get("updated_at"))?,
	})
}

#[async_trait]
impl IdentityStore<User> for UserRepository {
	async fn save(&self, mut record: User) -> std::result::Result<User, StoreError> {
		let written = match record.id() {
			Some(_) => self.update_user(&record).await,
			None => {
				record.assign_id(UserId::generate());
				self.insert_user(&record).await.map(|()| true)
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

	async fn find_by_id(&self, id: UserId) -> std::result::Result<Option<User>, StoreError> {
		Ok(self.get_user(id).await?)
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
	) -> std::result::Result<Option<User>, StoreError> {
		Ok(self.get_by_hash(field, hash).await?)
	}

	async fn delete(&self, id: UserId) -> std::result::Result<bool, StoreError> {
		Ok(self.delete_user(id).await?)
	}

	async fn list(&self) -> std::result::Result<Vec<User>, StoreError> {
		Ok(self.list_users().await?)
	}

	async fn search_by_name(&self, fragment: &str) -> std::result::Result<Vec<User>, StoreError> {
		Ok(self.search_users(fragment).await?)
	}
}
