// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Orchestration of identity operations.
//!
//! Each write runs its steps in a fixed order within one call:
//! snapshot, save, diff, audit append. The snapshot lives in a local
//! [`ChangeCapture`] and is consumed by the diff, so concurrent operations
//! never share capture state.

use std::marker::PhantomData;
use std::sync::Arc;

use kitchensink_server_audit::{diff_delete, AuditEntryBuilder, AuditService};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::capture::ChangeCapture;
use crate::error::{IdentityError, IdentityResult};
use crate::mapper::{Mapped, RecordMapper};
use crate::record::{IdentityRecord, IdentityRequest, RequestMode};
use crate::sanitize::{sanitize_email, sanitize_phone};
use crate::store::{IdentityStore, StoreError};
use crate::types::PiiField;

/// Caller context copied onto audit entries.
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
	pub performed_by: Option<String>,
	pub correlation_id: Option<String>,
	pub ip_address: Option<String>,
}

impl OperationContext {
	/// Operations started by the system itself.
	pub fn system() -> Self {
		Self::default()
	}

	pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
		self.performed_by = Some(actor.into());
		self
	}

	pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
		self.correlation_id = Some(correlation_id.into());
		self
	}

	pub fn with_ip_address(mut self, ip: impl Into<String>) -> Self {
		self.ip_address = Some(ip.into());
		self
	}

	fn apply(&self, mut builder: AuditEntryBuilder) -> AuditEntryBuilder {
		if let Some(actor) = &self.performed_by {
			builder = builder.performed_by(actor.clone());
		}
		if let Some(correlation_id) = &self.correlation_id {
			builder = builder.correlation_id(correlation_id.clone());
		}
		if let Some(ip) = &self.ip_address {
			builder = builder.ip_address(ip.clone());
		}
		builder
	}
}

/// Outcome of a [`IdentityService::reencrypt_stale`] sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReencryptReport {
	pub scanned: usize,
	pub rewritten: usize,
	pub failed: usize,
}

pub struct IdentityService<R, S>
where
	R: IdentityRecord,
	S: IdentityStore<R>,
{
	store: Arc<S>,
	mapper: RecordMapper,
	audit: Arc<AuditService>,
	_record: PhantomData<fn() -> R>,
}

impl<R, S> IdentityService<R, S>
where
	R: IdentityRecord,
	S: IdentityStore<R>,
{
	pub fn new(store: Arc<S>, mapper: RecordMapper, audit: Arc<AuditService>) -> Self {
		Self {
			store,
			mapper,
			audit,
			_record: PhantomData,
		}
	}

	pub fn mapper(&self) -> &RecordMapper {
		&self.mapper
	}

	#[instrument(skip(self, ctx, request), fields(entity_type = R::ENTITY_TYPE))]
	pub async fn create(
		&self,
		ctx: &OperationContext,
		mut request: R::Request,
	) -> IdentityResult<Mapped<R::Response>> {
		request.sanitize();
		request.validate(RequestMode::Create)?;

		let entity: R = self.mapper.to_entity(&request)?;
		self.ensure_unique(&entity).await?;

		let capture = ChangeCapture::for_create();
		let saved = self.store.save(entity).await?;
		self.append_audit(ctx, capture.finish(&saved));

		info!(entity_id = ?saved.id().map(|id| id.to_string()), "record created");
		self.mapper.to_response(&saved)
	}

	/// Patch a record. Stale ciphertext on the record is rewritten under the
	/// active key as part of the same write.
	#[instrument(skip(self, ctx, request), fields(entity_type = R::ENTITY_TYPE, entity_id = %id))]
	pub async fn update(
		&self,
		ctx: &OperationContext,
		id: R::Id,
		mut request: R::Request,
	) -> IdentityResult<Mapped<R::Response>> {
		request.sanitize();
		request.validate(RequestMode::Update)?;

		let existing = self.require(id).await?;
		let capture = ChangeCapture::arm(&existing);

		let mut entity = existing;
		self.mapper.update_entity_from_request(&mut entity, &request)?;
		let refreshed = self.mapper.refresh_stale_encryption(&mut entity)?;
		if !refreshed.is_empty() {
			debug!(fields = ?refreshed, "re-encrypting stale fields");
		}
		self.ensure_unique(&entity).await?;

		let saved = self.store.save(entity).await.map_err(|e| match e {
			StoreError::Missing => self.not_found(id),
			other => other.into(),
		})?;
		self.append_audit(ctx, capture.finish(&saved));

		info!("record updated");
		self.mapper.to_response(&saved)
	}

	#[instrument(skip(self, ctx), fields(entity_type = R::ENTITY_TYPE, entity_id = %id))]
	pub async fn delete(&self, ctx: &OperationContext, id: R::Id) -> IdentityResult<()> {
		if !self.store.delete(id).await? {
			return Err(self.not_found(id));
		}
		self.append_audit(ctx, Some(diff_delete(R::ENTITY_TYPE, &id.to_string())));
		info!("record deleted");
		Ok(())
	}

	#[instrument(skip(self), fields(entity_type = R::ENTITY_TYPE, entity_id = %id))]
	pub async fn get(&self, id: R::Id) -> IdentityResult<Mapped<R::Response>> {
		let entity = self.require(id).await?;
		self.mapper.to_response(&entity)
	}

	#[instrument(skip_all, fields(entity_type = R::ENTITY_TYPE))]
	pub async fn find_by_email(&self, email: &str) -> IdentityResult<Option<Mapped<R::Response>>> {
		self.find_by_pii(PiiField::Email, &sanitize_email(email)).await
	}

	#[instrument(skip_all, fields(entity_type = R::ENTITY_TYPE))]
	pub async fn find_by_phone_number(
		&self,
		phone_number: &str,
	) -> IdentityResult<Option<Mapped<R::Response>>> {
		self.find_by_pii(PiiField::PhoneNumber, &sanitize_phone(phone_number))
			.await
	}

	#[instrument(skip_all, fields(entity_type = R::ENTITY_TYPE))]
	pub async fn email_exists(&self, email: &str) -> IdentityResult<bool> {
		self.exists_by_pii(PiiField::Email, &sanitize_email(email))
			.await
	}

	#[instrument(skip_all, fields(entity_type = R::ENTITY_TYPE))]
	pub async fn phone_number_exists(&self, phone_number: &str) -> IdentityResult<bool> {
		self.exists_by_pii(PiiField::PhoneNumber, &sanitize_phone(phone_number))
			.await
	}

	#[instrument(skip(self), fields(entity_type = R::ENTITY_TYPE))]
	pub async fn list(&self) -> IdentityResult<Vec<Mapped<R::Response>>> {
		let records = self.store.list().await?;
		records.iter().map(|r| self.mapper.to_response(r)).collect()
	}

	#[instrument(skip(self), fields(entity_type = R::ENTITY_TYPE))]
	pub async fn search_by_name(&self, fragment: &str) -> IdentityResult<Vec<Mapped<R::Response>>> {
		let fragment = fragment.trim();
		if fragment.is_empty() {
			return self.list().await;
		}
		let records = self.store.search_by_name(fragment).await?;
		records.iter().map(|r| self.mapper.to_response(r)).collect()
	}

	/// Rewrite every ciphertext that is not under the active key.
	///
	/// Records that cannot be decrypted are counted as failed and left alone.
	/// Hashes do not change, so no audit entries are produced.
	#[instrument(skip(self), fields(entity_type = R::ENTITY_TYPE))]
	pub async fn reencrypt_stale(&self) -> IdentityResult<ReencryptReport> {
		let mut report = ReencryptReport::default();

		for mut record in self.store.list().await? {
			report.scanned += 1;
			match self.mapper.refresh_stale_encryption(&mut record) {
				Ok(fields) if fields.is_empty() => {}
				Ok(fields) => match self.store.save(record).await {
					Ok(_) => {
						report.rewritten += 1;
						debug!(fields = ?fields, "re-encrypted record");
					}
					Err(StoreError::Missing) => debug!("record deleted during sweep"),
					Err(e) => return Err(e.into()),
				},
				Err(e) => {
					report.failed += 1;
					warn!(
						entity_id = ?record.id().map(|id| id.to_string()),
						error = %e,
						"skipping record that cannot be re-encrypted"
					);
				}
			}
		}

		info!(
			scanned = report.scanned,
			rewritten = report.rewritten,
			failed = report.failed,
			"re-encryption sweep finished"
		);
		Ok(report)
	}

	async fn require(&self, id: R::Id) -> IdentityResult<R> {
		self.store
			.find_by_id(id)
			.await?
			.ok_or_else(|| self.not_found(id))
	}

	fn not_found(&self, id: R::Id) -> IdentityError {
		IdentityError::NotFound {
			entity_type: R::ENTITY_TYPE,
			id: id.to_string(),
		}
	}

	async fn find_by_pii(
		&self,
		field: PiiField,
		plaintext: &str,
	) -> IdentityResult<Option<Mapped<R::Response>>> {
		let hash = self.mapper.hash_lookup(field, plaintext)?;
		match self.store.find_by_hash(field, &hash).await? {
			Some(record) => self.mapper.to_response(&record).map(Some),
			None => Ok(None),
		}
	}

	async fn exists_by_pii(&self, field: PiiField, plaintext: &str) -> IdentityResult<bool> {
		let hash = self.mapper.hash_lookup(field, plaintext)?;
		Ok(self.store.exists_by_hash(field, &hash).await?)
	}

	/// Reject a write whose PII hash belongs to a different record. The store
	/// enforces the same rule atomically; this check reports the common case
	/// before anything is written.
	async fn ensure_unique(&self, entity: &R) -> IdentityResult<()> {
		for field in PiiField::ALL {
			let Some(value) = entity.pii(field) else {
				continue;
			};
			if let Some(other) = self.store.find_by_hash(field, value.hash()).await? {
				if other.id() != entity.id() {
					return Err(IdentityError::ResourceConflict { field });
				}
			}
		}
		Ok(())
	}

	/// Best effort: a dropped entry is logged and never fails the operation.
	fn append_audit(&self, ctx: &OperationContext, builder: Option<AuditEntryBuilder>) {
		let Some(builder) = builder else {
			debug!("no audited fields changed");
			return;
		};
		let entry = ctx.apply(builder).build();
		let (action, entity_id) = (entry.action, entry.entity_id.clone());
		if !self.audit.log(entry) {
			warn!(
				entity_type = R::ENTITY_TYPE,
				entity_id = %entity_id,
				action = %action,
				"audit entry dropped"
			);
		}
	}
}
