// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use kitchensink_server_audit::Snapshot;
use serde::{Deserialize, Serialize};

use crate::error::{IdentityError, IdentityResult};
use crate::record::{pii_hash, DecryptedPii, IdentityRecord, IdentityRequest, RequestMode};
use crate::sanitize::{clean, sanitize_email, sanitize_phone, sanitize_text};
use crate::types::{MemberId, MemberStatus, PiiField, ProtectedValue};
use crate::validation::{
	present, require, validate_email, validate_member_name, validate_member_phone,
};

pub const MEMBER_REST_PATH: &str = "/kitchensink/v1/members";

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
	pub id: Option<MemberId>,
	pub name: String,
	pub email: Option<ProtectedValue>,
	pub phone_number: Option<ProtectedValue>,
	pub status: MemberStatus,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemberRequest {
	pub name: Option<String>,
	pub email: Option<String>,
	pub phone_number: Option<String>,
	pub status: Option<MemberStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberResponse {
	pub id: MemberId,
	pub name: String,
	pub email: Option<String>,
	pub phone_number: Option<String>,
	pub status: MemberStatus,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub rest_url: String,
}

impl IdentityRequest for MemberRequest {
	fn sanitize(&mut self) {
		self.name = clean(self.name.take(), sanitize_text);
		self.email = clean(self.email.take(), sanitize_email);
		self.phone_number = clean(self.phone_number.take(), sanitize_phone);
	}

	fn validate(&self, mode: RequestMode) -> IdentityResult<()> {
		if mode == RequestMode::Create {
			require("name", self.name.as_deref())?;
			require("email", self.email.as_deref())?;
			require("phone_number", self.phone_number.as_deref())?;
		}
		if let Some(name) = present("name", self.name.as_deref())? {
			validate_member_name(name)?;
		}
		if let Some(email) = present("email", self.email.as_deref())? {
			validate_email("email", email)?;
		}
		if let Some(phone) = present("phone_number", self.phone_number.as_deref())? {
			validate_member_phone(phone)?;
		}
		Ok(())
	}

	fn pii(&self, field: PiiField) -> Option<&str> {
		match field {
			PiiField::Email => self.email.as_deref(),
			PiiField::PhoneNumber => self.phone_number.as_deref(),
		}
	}
}

impl IdentityRecord for Member {
	type Id = MemberId;
	type Request = MemberRequest;
	type Response = MemberResponse;

	const ENTITY_TYPE: &'static str = "member";

	fn id(&self) -> Option<MemberId> {
		self.id
	}

	fn assign_id(&mut self, id: MemberId) {
		self.id.get_or_insert(id);
	}

	fn generate_id() -> MemberId {
		MemberId::generate()
	}

	fn name(&self) -> &str {
		&self.name
	}

	fn pii(&self, field: PiiField) -> Option<&ProtectedValue> {
		match field {
			PiiField::Email => self.email.as_ref(),
			PiiField::PhoneNumber => self.phone_number.as_ref(),
		}
	}

	fn set_pii(&mut self, field: PiiField, value: ProtectedValue) {
		match field {
			PiiField::Email => self.email = Some(value),
			PiiField::PhoneNumber => self.phone_number = Some(value),
		}
	}

	fn new_from_request(request: &MemberRequest, now: DateTime<Utc>) -> IdentityResult<Self> {
		let name = request
			.name
			.clone()
			.ok_or_else(|| IdentityError::validation("name", "is required"))?;
		Ok(Self {
			id: None,
			name,
			email: None,
			phone_number: None,
			status: request.status.unwrap_or_default(),
			created_at: now,
			updated_at: now,
		})
	}

	fn apply_request(&mut self, request: &MemberRequest, now: DateTime<Utc>) -> IdentityResult<()> {
		if let Some(name) = &request.name {
			self.name = name.clone();
		}
		if let Some(status) = request.status {
			self.status = status;
		}
		self.updated_at = now;
		Ok(())
	}

	fn to_response(&self, id: MemberId, pii: DecryptedPii) -> MemberResponse {
		MemberResponse {
			id,
			name: self.name.clone(),
			email: pii.email,
			phone_number: pii.phone_number,
			status: self.status,
			created_at: self.created_at,
			updated_at: self.updated_at,
			rest_url: format!("{MEMBER_REST_PATH}/{id}"),
		}
	}

	fn snapshot(&self) -> Snapshot {
		Snapshot::builder(Self::ENTITY_TYPE, self.id.map(|id| id.to_string()))
			.field("name", Some(self.name.clone()))
			.field("email", pii_hash(self, PiiField::Email))
			.field("phone_number", pii_hash(self, PiiField::PhoneNumber))
			.field("status", Some(self.status.to_string()))
			.build()
	}
}
