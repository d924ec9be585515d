// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Command execution. Every command produces a JSON document for stdout.

use kitchensink_server_crypto::{encode_key, generate_key};
use kitchensink_server_db::{run_migrations, AuditQuery};
use kitchensink_server_identity::{
	IdentityRecord, IdentityService, IdentityStore, Mapped, OperationContext,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::cli::{AuditCommand, Command, MemberCommand, PiiLookup, UserCommand};
use crate::state::AppState;
use crate::version::BuildInfo;

/// Generate a fresh key as a `version:base64` entry for the key list.
pub fn keygen(key_version: u32) -> Value {
	let key = generate_key();
	let encoded = encode_key(&key);
	json!({
		"version": key_version,
		"entry": format!("{key_version}:{encoded}"),
	})
}

#[instrument(skip_all)]
pub async fn execute(
	state: &AppState,
	ctx: &OperationContext,
	command: Command,
) -> anyhow::Result<Value> {
	match command {
		Command::Version => Ok(json!(BuildInfo::current())),
		Command::Keygen { key_version } => Ok(keygen(key_version)),
		Command::Migrate => {
			run_migrations(&state.pool).await?;
			Ok(json!({ "migrated": true }))
		}
		Command::Reencrypt => {
			let members = state.members.reencrypt_stale().await?;
			let users = state.users.reencrypt_stale().await?;
			info!(
				members_rewritten = members.rewritten,
				users_rewritten = users.rewritten,
				"re-encryption sweep finished"
			);
			Ok(json!({ "members": members, "users": users }))
		}
		Command::Member(command) => member(state, ctx, command).await,
		Command::User(command) => user(state, ctx, command).await,
		Command::Audit(command) => audit(state, command).await,
	}
}

async fn member(
	state: &AppState,
	ctx: &OperationContext,
	command: MemberCommand,
) -> anyhow::Result<Value> {
	let service = &state.members;
	match command {
		MemberCommand::Create(fields) => render(service.create(ctx, fields.into()).await?),
		MemberCommand::Get { id } => render(service.get(id).await?),
		MemberCommand::Update { id, fields } => {
			render(service.update(ctx, id, fields.into()).await?)
		}
		MemberCommand::Delete { id } => {
			service.delete(ctx, id).await?;
			Ok(json!({ "deleted": id }))
		}
		MemberCommand::Find(lookup) => find(service, lookup).await,
		MemberCommand::Exists(lookup) => exists(service, lookup).await,
		MemberCommand::List { search } => list(service, search).await,
	}
}

async fn user(
	state: &AppState,
	ctx: &OperationContext,
	command: UserCommand,
) -> anyhow::Result<Value> {
	let service = &state.users;
	match command {
		UserCommand::Create(fields) => render(service.create(ctx, fields.into()).await?),
		UserCommand::Get { id } => render(service.get(id).await?),
		UserCommand::Update { id, fields } => render(service.update(ctx, id, fields.into()).await?),
		UserCommand::Delete { id } => {
			service.delete(ctx, id).await?;
			Ok(json!({ "deleted": id }))
		}
		UserCommand::Find(lookup) => find(service, lookup).await,
		UserCommand::Exists(lookup) => exists(service, lookup).await,
		UserCommand::List { search } => list(service, search).await,
	}
}

async fn find<R, S>(service: &IdentityService<R, S>, lookup: PiiLookup) -> anyhow::Result<Value>
where
	R: IdentityRecord,
	S: IdentityStore<R>,
{
	let found = match (lookup.email, lookup.phone_number) {
		(Some(email), _) => service.find_by_email(&email).await?,
		(None, Some(phone_number)) => service.find_by_phone_number(&phone_number).await?,
		(None, None) => None,
	};
	match found {
		Some(mapped) => render(mapped),
		None => Ok(Value::Null),
	}
}

async fn exists<R, S>(service: &IdentityService<R, S>, lookup: PiiLookup) -> anyhow::Result<Value>
where
	R: IdentityRecord,
	S: IdentityStore<R>,
{
	let exists = match (lookup.email, lookup.phone_number) {
		(Some(email), _) => service.email_exists(&email).await?,
		(None, Some(phone_number)) => service.phone_number_exists(&phone_number).await?,
		(None, None) => false,
	};
	Ok(json!({ "exists": exists }))
}

async fn list<R, S>(
	service: &IdentityService<R, S>,
	search: Option<String>,
) -> anyhow::Result<Value>
where
	R: IdentityRecord,
	S: IdentityStore<R>,
{
	let records = match search {
		Some(fragment) => service.search_by_name(&fragment).await?,
		None => service.list().await?,
	};
	let bodies: Vec<R::Response> = records.into_iter().map(|m| m.body).collect();
	Ok(serde_json::to_value(bodies)?)
}

async fn audit(state: &AppState, command: AuditCommand) -> anyhow::Result<Value> {
	match command {
		AuditCommand::List {
			entity_type,
			entity_id,
			action,
			from,
			to,
			limit,
			offset,
		} => {
			let query = AuditQuery {
				entity_type,
				entity_id,
				action,
				from,
				to,
				limit: Some(limit),
				offset: Some(offset),
			};
			let (entries, total) = state.audit_log.query_logs(&query).await?;
			Ok(json!({ "entries": entries, "total": total }))
		}
		AuditCommand::Prune { retention_days } => {
			let days = retention_days.unwrap_or(state.audit_retention_days);
			let deleted = state.audit_log.prune_older_than(days).await?;
			info!(retention_days = days, deleted, "pruned audit log");
			Ok(json!({ "retention_days": days, "deleted": deleted }))
		}
	}
}

fn render<T: Serialize>(mapped: Mapped<T>) -> anyhow::Result<Value> {
	if mapped.needs_reencryption() {
		info!(
			fields = ?mapped.stale_fields,
			"record uses a retired key; run `reencrypt` or update it to refresh"
		);
	}
	Ok(serde_json::to_value(mapped.body)?)
}
