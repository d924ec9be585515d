// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-process [`IdentityStore`], used by tests and local tooling.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::record::IdentityRecord;
use crate::store::{IdentityStore, StoreError};
use crate::types::PiiField;

pub struct MemoryIdentityStore<R: IdentityRecord> {
	records: RwLock<HashMap<R::Id, R>>,
}

impl<R: IdentityRecord> Default for MemoryIdentityStore<R> {
	fn default() -> Self {
		Self {
			records: RwLock::new(HashMap::new()),
		}
	}
}

impl<R: IdentityRecord> MemoryIdentityStore<R> {
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn len(&self) -> usize {
		self.records.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.records.read().await.is_empty()
	}
}

fn holds_hash<R: IdentityRecord>(record: &R, field: PiiField, hash: &str) -> bool {
	record.pii(field).is_some_and(|v| v.hash() == hash)
}

fn sorted_by_name<R: IdentityRecord>(mut records: Vec<R>) -> Vec<R> {
	records.sort_by(|a, b| a.name().cmp(b.name()).then_with(|| a.id().cmp(&b.id())));
	records
}

#[async_trait]
impl<R: IdentityRecord> IdentityStore<R> for MemoryIdentityStore<R> {
	async fn save(&self, mut record: R) -> Result<R, StoreError> {
		let mut records = self.records.write().await;

		let id = match record.id() {
			Some(id) if !records.contains_key(&id) => return Err(StoreError::Missing),
			Some(id) => id,
			None => R::generate_id(),
		};
		for field in PiiField::ALL {
			let Some(value) = record.pii(field) else {
				continue;
			};
			let taken = records
				.iter()
				.any(|(other, existing)| *other != id && holds_hash(existing, field, value.hash()));
			if taken {
				return Err(StoreError::Conflict { field });
			}
		}

		record.assign_id(id);
		records.insert(id, record.clone());
		Ok(record)
	}

	async fn find_by_id(&self, id: R::Id) -> Result<Option<R>, StoreError> {
		Ok(self.records.read().await.get(&id).cloned())
	}

	async fn exists_by_hash(&self, field: PiiField, hash: &str) -> Result<bool, StoreError> {
		Ok(self
			.records
			.read()
			.await
			.values()
			.any(|r| holds_hash(r, field, hash)))
	}

	async fn find_by_hash(&self, field: PiiField, hash: &str) -> Result<Option<R>, StoreError> {
		Ok(self
			.records
			.read()
			.await
			.values()
			.find(|r| holds_hash(*r, field, hash))
			.cloned())
	}

	async fn delete(&self, id: R::Id) -> Result<bool, StoreError> {
		Ok(self.records.write().await.remove(&id).is_some())
	}

	async fn list(&self) -> Result<Vec<R>, StoreError> {
		let records = self.records.read().await.values().cloned().collect();
		Ok(sorted_by_name(records))
	}

	async fn search_by_name(&self, fragment: &str) -> Result<Vec<R>, StoreError> {
		let needle = fragment.to_lowercase();
		let records = self
			.records
			.read()
			.await
			.values()
			.filter(|r| r.name().to_lowercase().contains(&needle))
			.cloned()
			.collect();
		Ok(sorted_by_name(records))
	}
}
