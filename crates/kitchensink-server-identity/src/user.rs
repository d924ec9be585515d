// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, NaiveDate, Utc};
use kitchensink_server_audit::Snapshot;
use serde::{Deserialize, Serialize};

use crate::error::{IdentityError, IdentityResult};
use crate::record::{pii_hash, DecryptedPii, IdentityRecord, IdentityRequest, RequestMode};
use crate::sanitize::{clean, sanitize_email, sanitize_phone, sanitize_text};
use crate::types::{MemberStatus, PiiField, ProtectedValue, UserId};
use crate::validation::{
	present, require, validate_address, validate_date_of_birth, validate_email, validate_isd_code,
	validate_place, validate_user_name, validate_user_phone,
};

/// `dd-MM-yyyy`, used for dates of birth in requests and responses.
pub const DATE_FORMAT: &str = "%d-%m-%Y";

#[derive(Debug, Clone, PartialEq)]
pub struct User {
	pub id: Option<UserId>,
	pub name: String,
	pub email: Option<ProtectedValue>,
	pub phone_number: Option<ProtectedValue>,
	pub isd_code: Option<String>,
	pub date_of_birth: Option<NaiveDate>,
	pub address: Option<String>,
	pub city: Option<String>,
	pub country: Option<String>,
	pub status: MemberStatus,
	pub registration_date: DateTime<Utc>,
	pub last_login_date: Option<DateTime<Utc>>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserRequest {
	pub name: Option<String>,
	pub email: Option<String>,
	pub isd_code: Option<String>,
	pub phone_number: Option<String>,
	/// `dd-MM-yyyy`
	pub date_of_birth: Option<String>,
	pub address: Option<String>,
	pub city: Option<String>,
	pub country: Option<String>,
	pub status: Option<MemberStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
	pub id: UserId,
	pub name: String,
	pub email: Option<String>,
	pub isd_code: Option<String>,
	pub phone_number: Option<String>,
	pub date_of_birth: Option<String>,
	pub address: Option<String>,
	pub city: Option<String>,
	pub country: Option<String>,
	pub status: MemberStatus,
	pub registration_date: DateTime<Utc>,
	pub last_login_date: Option<DateTime<Utc>>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl UserRequest {
	fn parsed_date_of_birth(&self) -> IdentityResult<Option<NaiveDate>> {
		self.date_of_birth
			.as_deref()
			.map(|raw| validate_date_of_birth(raw, Utc::now().date_naive()))
			.transpose()
	}
}

impl IdentityRequest for UserRequest {
	fn sanitize(&mut self) {
		self.name = clean(self.name.take(), sanitize_text);
		self.email = clean(self.email.take(), sanitize_email);
		self.isd_code = clean(self.isd_code.take(), sanitize_phone);
		self.phone_number = clean(self.phone_number.take(), sanitize_phone);
		self.date_of_birth = clean(self.date_of_birth.take(), sanitize_text);
		self.address = clean(self.address.take(), sanitize_text);
		self.city = clean(self.city.take(), sanitize_text);
		self.country = clean(self.country.take(), sanitize_text);
	}

	fn validate(&self, mode: RequestMode) -> IdentityResult<()> {
		if mode == RequestMode::Create {
			require("name", self.name.as_deref())?;
			require("email", self.email.as_deref())?;
			require("isd_code", self.isd_code.as_deref())?;
			require("phone_number", self.phone_number.as_deref())?;
		}
		if let Some(name) = present("name", self.name.as_deref())? {
			validate_user_name(name)?;
		}
		if let Some(email) = present("email", self.email.as_deref())? {
			validate_email("email", email)?;
		}
		if let Some(isd_code) = present("isd_code", self.isd_code.as_deref())? {
			validate_isd_code(isd_code)?;
		}
		if let Some(phone) = present("phone_number", self.phone_number.as_deref())? {
			validate_user_phone(phone)?;
		}
		present("date_of_birth", self.date_of_birth.as_deref())?;
		self.parsed_date_of_birth()?;
		if let Some(address) = present("address", self.address.as_deref())? {
			validate_address(address)?;
		}
		if let Some(city) = present("city", self.city.as_deref())? {
			validate_place("city", city)?;
		}
		if let Some(country) = present("country", self.country.as_deref())? {
			validate_place("country", country)?;
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

impl IdentityRecord for User {
	type Id = UserId;
	type Request = UserRequest;
	type Response = UserResponse;

	const ENTITY_TYPE: &'static str = "user";

	fn id(&self) -> Option<UserId> {
		self.id
	}

	fn assign_id(&mut self, id: UserId) {
		self.id.get_or_insert(id);
	}

	fn generate_id() -> UserId {
		UserId::generate()
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

	fn new_from_request(request: &UserRequest, now: DateTime<Utc>) -> IdentityResult<Self> {
		let name = request
			.name
			.clone()
			.ok_or_else(|| IdentityError::validation("name", "is required"))?;
		Ok(Self {
			id: None,
			name,
			email: None,
			phone_number: None,
			isd_code: request.isd_code.clone(),
			date_of_birth: request.parsed_date_of_birth()?,
			address: request.address.clone(),
			city: request.city.clone(),
			country: request.country.clone(),
			status: request.status.unwrap_or_default(),
			registration_date: now,
			last_login_date: None,
			created_at: now,
			updated_at: now,
		})
	}

	fn apply_request(&mut self, request: &UserRequest, now: DateTime<Utc>) -> IdentityResult<()> {
		let date_of_birth = request.parsed_date_of_birth()?;

		if let Some(name) = &request.name {
			self.name = name.clone();
		}
		if request.isd_code.is_some() {
			self.isd_code = request.isd_code.clone();
		}
		if date_of_birth.is_some() {
			self.date_of_birth = date_of_birth;
		}
		if request.address.is_some() {
			self.address = request.address.clone();
		}
		if request.city.is_some() {
			self.city = request.city.clone();
		}
		if request.country.is_some() {
			self.country = request.country.clone();
		}
		if let Some(status) = request.status {
			self.status = status;
		}
		self.updated_at = now;
		Ok(())
	}

	fn to_response(&self, id: UserId, pii: DecryptedPii) -> UserResponse {
		UserResponse {
			id,
			name: self.name.clone(),
			email: pii.email,
			isd_code: self.isd_code.clone(),
			phone_number: pii.phone_number,
			date_of_birth: self
				.date_of_birth
				.map(|d| d.format(DATE_FORMAT).to_string()),
			address: self.address.clone(),
			city: self.city.clone(),
			country: self.country.clone(),
			status: self.status,
			registration_date: self.registration_date,
			last_login_date: self.last_login_date,
			created_at: self.created_at,
			updated_at: self.updated_at,
		}
	}

	fn snapshot(&self) -> Snapshot {
		Snapshot::builder(Self::ENTITY_TYPE, self.id.map(|id| id.to_string()))
			.field("name", Some(self.name.clone()))
			.field("email", pii_hash(self, PiiField::Email))
			.field("phone_number", pii_hash(self, PiiField::PhoneNumber))
			.field("status", Some(self.status.to_string()))
			.field("isd_code", self.isd_code.clone())
			.field(
				"date_of_birth",
				self.date_of_birth
					.map(|d| d.format(DATE_FORMAT).to_string()),
			)
			.field("address", self.address.clone())
			.field("city", self.city.clone())
			.field("country", self.country.clone())
			.build()
	}
}
