// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Command line definitions.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args as ClapArgs, Parser, Subcommand};
use kitchensink_server_audit::AuditAction;
use kitchensink_server_identity::{
	MemberId, MemberRequest, MemberStatus, OperationContext, UserId, UserRequest,
};

#[derive(Parser, Debug)]
#[command(name = "kitchensink-server")]
#[command(about = "Manage kitchensink members, users and their audit trail")]
#[command(version)]
pub struct Args {
	/// TOML config file, layered between defaults and environment.
	#[arg(long, global = true, env = "KITCHENSINK_SERVER_CONFIG")]
	pub config: Option<PathBuf>,

	/// Actor recorded on audit entries. Defaults to SYSTEM.
	#[arg(long, global = true, env = "KITCHENSINK_ACTOR")]
	pub actor: Option<String>,

	#[arg(long, global = true)]
	pub correlation_id: Option<String>,

	#[command(subcommand)]
	pub command: Command,
}

impl Args {
	pub fn operation_context(&self) -> OperationContext {
		let mut ctx = OperationContext::system();
		if let Some(actor) = &self.actor {
			ctx = ctx.with_actor(actor.clone());
		}
		if let Some(correlation_id) = &self.correlation_id {
			ctx = ctx.with_correlation_id(correlation_id.clone());
		}
		ctx
	}
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Print version information.
	Version,
	/// Apply database migrations and exit.
	Migrate,
	/// Generate a new encryption key entry for KITCHENSINK_SERVER_CRYPTO_KEYS.
	Keygen {
		#[arg(long, default_value_t = 1)]
		key_version: u32,
	},
	/// Rewrite ciphertext that is not under the active key.
	Reencrypt,
	#[command(subcommand)]
	Member(MemberCommand),
	#[command(subcommand)]
	User(UserCommand),
	#[command(subcommand)]
	Audit(AuditCommand),
}

/// Email or phone number to look a record up by.
#[derive(ClapArgs, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct PiiLookup {
	#[arg(long)]
	pub email: Option<String>,
	#[arg(long)]
	pub phone_number: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum MemberCommand {
	Create(MemberFields),
	Get {
		id: MemberId,
	},
	/// Patch a member; omitted fields keep their value.
	Update {
		id: MemberId,
		#[command(flatten)]
		fields: MemberFields,
	},
	Delete {
		id: MemberId,
	},
	Find(PiiLookup),
	/// Report whether a member with this email or phone number exists.
	Exists(PiiLookup),
	/// List members ordered by name, optionally filtered by a name fragment.
	List {
		#[arg(long)]
		search: Option<String>,
	},
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct MemberFields {
	#[arg(long)]
	pub name: Option<String>,
	#[arg(long)]
	pub email: Option<String>,
	#[arg(long)]
	pub phone_number: Option<String>,
	#[arg(long)]
	pub status: Option<MemberStatus>,
}

impl From<MemberFields> for MemberRequest {
	fn from(fields: MemberFields) -> Self {
		Self {
			name: fields.name,
			email: fields.email,
			phone_number: fields.phone_number,
			status: fields.status,
		}
	}
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
	Create(UserFields),
	Get {
		id: UserId,
	},
	Update {
		id: UserId,
		#[command(flatten)]
		fields: UserFields,
	},
	Delete {
		id: UserId,
	},
	Find(PiiLookup),
	Exists(PiiLookup),
	List {
		#[arg(long)]
		search: Option<String>,
	},
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct UserFields {
	#[arg(long)]
	pub name: Option<String>,
	#[arg(long)]
	pub email: Option<String>,
	#[arg(long)]
	pub isd_code: Option<String>,
	#[arg(long)]
	pub phone_number: Option<String>,
	/// Date of birth as DD-MM-YYYY.
	#[arg(long)]
	pub date_of_birth: Option<String>,
	#[arg(long)]
	pub address: Option<String>,
	#[arg(long)]
	pub city: Option<String>,
	#[arg(long)]
	pub country: Option<String>,
	#[arg(long)]
	pub status: Option<MemberStatus>,
}

impl From<UserFields> for UserRequest {
	fn from(fields: UserFields) -> Self {
		Self {
			name: fields.name,
			email: fields.email,
			isd_code: fields.isd_code,
			phone_number: fields.phone_number,
			date_of_birth: fields.date_of_birth,
			address: fields.address,
			city: fields.city,
			country: fields.country,
			status: fields.status,
		}
	}
}

#[derive(Subcommand, Debug)]
pub enum AuditCommand {
	/// Query stored audit entries, newest first.
	List {
		#[arg(long)]
		entity_type: Option<String>,
		#[arg(long)]
		entity_id: Option<String>,
		#[arg(long)]
		action: Option<AuditAction>,
		/// RFC 3339 lower bound on the entry timestamp.
		#[arg(long)]
		from: Option<DateTime<Utc>>,
		#[arg(long)]
		to: Option<DateTime<Utc>>,
		#[arg(long, default_value_t = 50)]
		limit: i64,
		#[arg(long, default_value_t = 0)]
		offset: i64,
	},
	/// Delete entries older than the retention window.
	Prune {
		/// Overrides KITCHENSINK_SERVER_AUDIT_RETENTION_DAYS.
		#[arg(long)]
		retention_days: Option<i64>,
	},
}
