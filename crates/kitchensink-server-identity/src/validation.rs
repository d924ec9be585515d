// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Field rules for member and user requests.
//!
//! Each function checks an already sanitized value and reports the failing
//! field as an [`IdentityError::Validation`].

use std::sync::LazyLock;

use chrono::{Months, NaiveDate};
use regex::Regex;

use crate::error::{IdentityError, IdentityResult};

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^[a-z0-9._%+-]+@[a-z0-9-]+(\.[a-z0-9-]+)*\.[a-z]{2,}$").unwrap()
});

static MEMBER_PHONE_REGEX: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[0-9]{10,12}$").unwrap());

static INDIAN_MOBILE_REGEX: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[6-9][0-9]{9}$").unwrap());

static ISD_CODE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+?91$").unwrap());

static LETTERS_AND_SPACES: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[A-Za-z ]+$").unwrap());

pub const MEMBER_NAME_MAX: usize = 25;
pub const USER_NAME_MAX: usize = 100;
pub const ADDRESS_MAX: usize = 200;
pub const PLACE_MAX: usize = 50;
pub const MAX_AGE_YEARS: u32 = 100;

/// Fails with a "required" error when a create request lacks the field or
/// sent it blank.
pub fn require<'a>(field: &'static str, value: Option<&'a str>) -> IdentityResult<&'a str> {
	value
		.filter(|v| !v.is_empty())
		.ok_or_else(|| IdentityError::validation(field, "is required"))
}

/// A field that was sent must still carry a value after sanitizing.
pub fn present<'a>(
	field: &'static str,
	value: Option<&'a str>,
) -> IdentityResult<Option<&'a str>> {
	match value {
		Some("") => Err(IdentityError::validation(field, "must not be blank")),
		other => Ok(other),
	}
}

pub fn validate_email(field: &'static str, email: &str) -> IdentityResult<()> {
	if !EMAIL_REGEX.is_match(email) {
		return Err(IdentityError::validation(field, "must be a valid e-mail address"));
	}
	Ok(())
}

pub fn validate_member_name(name: &str) -> IdentityResult<()> {
	if name.chars().count() > MEMBER_NAME_MAX {
		return Err(IdentityError::validation(
			"name",
			format!("must be at most {MEMBER_NAME_MAX} characters"),
		));
	}
	if name.chars().any(|c| c.is_ascii_digit()) {
		return Err(IdentityError::validation("name", "must not contain digits"));
	}
	Ok(())
}

pub fn validate_member_phone(phone: &str) -> IdentityResult<()> {
	if !MEMBER_PHONE_REGEX.is_match(phone) {
		return Err(IdentityError::validation("phone_number", "must be 10 to 12 digits"));
	}
	Ok(())
}

pub fn validate_user_name(name: &str) -> IdentityResult<()> {
	letters_and_spaces("name", name, USER_NAME_MAX)
}

pub fn validate_user_phone(phone: &str) -> IdentityResult<()> {
	if !INDIAN_MOBILE_REGEX.is_match(phone) {
		return Err(IdentityError::validation(
			"phone_number",
			"must be a 10 digit mobile number starting with 6-9",
		));
	}
	Ok(())
}

pub fn validate_isd_code(code: &str) -> IdentityResult<()> {
	if !ISD_CODE_REGEX.is_match(code) {
		return Err(IdentityError::validation("isd_code", "must be +91"));
	}
	Ok(())
}

/// Parses a `dd-MM-yyyy` date of birth and checks it against `today`.
pub fn validate_date_of_birth(raw: &str, today: NaiveDate) -> IdentityResult<NaiveDate> {
	let date = NaiveDate::parse_from_str(raw, crate::user::DATE_FORMAT)
		.map_err(|_| IdentityError::validation("date_of_birth", "must be in dd-MM-yyyy format"))?;

	if date > today {
		return Err(IdentityError::validation("date_of_birth", "must not be in the future"));
	}

	let oldest = today
		.checked_sub_months(Months::new(MAX_AGE_YEARS * 12))
		.unwrap_or(NaiveDate::MIN);
	if date < oldest {
		return Err(IdentityError::validation(
			"date_of_birth",
			format!("must be within the last {MAX_AGE_YEARS} years"),
		));
	}

	Ok(date)
}

pub fn validate_address(address: &str) -> IdentityResult<()> {
	if address.chars().count() > ADDRESS_MAX {
		return Err(IdentityError::validation(
			"address",
			format!("must be at most {ADDRESS_MAX} characters"),
		));
	}
	Ok(())
}

pub fn validate_place(field: &'static str, value: &str) -> IdentityResult<()> {
	letters_and_spaces(field, value, PLACE_MAX)
}

fn letters_and_spaces(field: &'static str, value: &str, max: usize) -> IdentityResult<()> {
	if value.chars().count() > max {
		return Err(IdentityError::validation(
			field,
			format!("must be at most {max} characters"),
		));
	}
	if !LETTERS_AND_SPACES.is_match(value) {
		return Err(IdentityError::validation(
			field,
			"must contain only letters and spaces",
		));
	}
	Ok(())
}
