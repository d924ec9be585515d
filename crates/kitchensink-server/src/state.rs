// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wiring of crypto, audit and persistence into the identity services.

use std::sync::Arc;

use anyhow::Context;
use kitchensink_server_audit::{
	AuditAction, AuditFilterConfig, AuditService, AuditSink, SqliteAuditSink, TracingAuditSink,
};
use kitchensink_server_config::{AuditConfig, CryptoConfig, ServerConfig};
use kitchensink_server_crypto::{FieldCipher, KeyRing, PiiHasher};
use kitchensink_server_db::{AuditRepository, MemberRepository, UserRepository};
use kitchensink_server_identity::{IdentityService, Member, RecordMapper, User};
use sqlx::SqlitePool;
use tracing::{info, warn};

pub type MemberService = IdentityService<Member, MemberRepository>;
pub type UserService = IdentityService<User, UserRepository>;

pub struct AppState {
	pub pool: SqlitePool,
	pub members: MemberService,
	pub users: UserService,
	pub audit_log: AuditRepository,
	pub audit_retention_days: i64,
	audit: Arc<AuditService>,
}

impl AppState {
	/// Must be called from within a tokio runtime.
	pub async fn new(pool: SqlitePool, config: &ServerConfig) -> anyhow::Result<Self> {
		let cipher = Arc::new(FieldCipher::new(build_key_ring(&config.crypto)?));
		let hasher = Arc::new(
			PiiHasher::new(config.crypto.hash_secret.clone())
				.context("invalid PII hash secret")?,
		);
		let mapper = RecordMapper::new(hasher, cipher);

		let audit = Arc::new(AuditService::new(
			build_audit_filter(&config.audit)?,
			config.audit.queue_capacity,
			config.audit.queue_overflow_policy,
			build_audit_sinks(&pool, &config.audit),
		));
		for failure in audit.health_check().await {
			warn!(error = %failure, "audit sink is unhealthy; writes continue without it");
		}

		info!(
			active_key_version = config.crypto.active_key_version,
			audit_enabled = config.audit.enabled,
			"application state initialized"
		);

		Ok(Self {
			members: IdentityService::new(
				Arc::new(MemberRepository::new(pool.clone())),
				mapper.clone(),
				Arc::clone(&audit),
			),
			users: IdentityService::new(
				Arc::new(UserRepository::new(pool.clone())),
				mapper,
				Arc::clone(&audit),
			),
			audit_log: AuditRepository::new(pool.clone()),
			audit_retention_days: config.audit.retention_days,
			pool,
			audit,
		})
	}

	/// Drop the services and wait for queued audit entries to reach their sinks.
	pub async fn shutdown(self) {
		let Self {
			members,
			users,
			audit,
			..
		} = self;
		drop(members);
		drop(users);

		match Arc::try_unwrap(audit) {
			Ok(audit) => audit.shutdown().await,
			Err(_) => warn!("audit service still shared at shutdown; pending entries may be lost"),
		}
	}
}

pub fn build_key_ring(config: &CryptoConfig) -> anyhow::Result<KeyRing> {
	KeyRing::from_encoded(
		config
			.keys
			.iter()
			.map(|k| (k.version, k.material.expose().as_str())),
		config.active_key_version,
	)
	.context("invalid encryption key configuration")
}

/// The configured filter applies to the whole pipeline; sinks see every entry it admits.
pub fn build_audit_filter(config: &AuditConfig) -> anyhow::Result<AuditFilterConfig> {
	let include_actions = match &config.include_actions {
		Some(names) => Some(
			names
				.iter()
				.map(|name| name.parse::<AuditAction>().map_err(anyhow::Error::msg))
				.collect::<anyhow::Result<Vec<_>>>()
				.context("invalid audit include_actions")?,
		),
		None => None,
	};

	Ok(AuditFilterConfig {
		include_actions,
		exclude_entity_types: config.exclude_entity_types.clone(),
	})
}

fn build_audit_sinks(pool: &SqlitePool, config: &AuditConfig) -> Vec<Arc<dyn AuditSink>> {
	let mut sinks: Vec<Arc<dyn AuditSink>> = Vec::new();
	if !config.enabled {
		warn!("audit logging is disabled");
		return sinks;
	}
	if config.sqlite_sink {
		sinks.push(Arc::new(SqliteAuditSink::new(
			pool.clone(),
			AuditFilterConfig::default(),
		)));
	}
	if config.tracing_sink {
		sinks.push(Arc::new(TracingAuditSink::new(AuditFilterConfig::default())));
	}
	sinks
}
