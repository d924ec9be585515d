// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Input normalization applied before validation and hashing.
//!
//! Hashes are only comparable when the plaintext is normalized the same way on
//! every path, so lookups run through the same functions as writes.

use std::sync::LazyLock;

use regex::Regex;

static SCRIPT_BLOCK: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?is)<script\b.*?</script\s*>").expect("valid regex"));

static HTML_TAG: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

/// Trimmed and lower-cased.
pub fn sanitize_email(raw: &str) -> String {
	raw.trim().to_lowercase()
}

/// Digits and `+` only.
pub fn sanitize_phone(raw: &str) -> String {
	raw.chars()
		.filter(|c| c.is_ascii_digit() || *c == '+')
		.collect()
}

/// Free text with script blocks, tags and quote characters removed.
pub fn sanitize_text(raw: &str) -> String {
	let without_scripts = SCRIPT_BLOCK.replace_all(raw, "");
	let without_tags = HTML_TAG.replace_all(&without_scripts, "");
	without_tags
		.chars()
		.filter(|c| !matches!(c, '<' | '>' | '"' | '\''))
		.collect::<String>()
		.trim()
		.to_string()
}

/// Apply `f` to an optional field.
///
/// A field that was sent stays present even when nothing survives
/// sanitizing, so validation can reject it instead of ignoring it.
pub fn clean(value: Option<String>, f: impl Fn(&str) -> String) -> Option<String> {
	value.map(|v| f(&v))
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn email_is_trimmed_and_lowercased() {
		assert_eq!(sanitize_email("  Alice@Example.COM "), "alice@example.com");
	}

	#[test]
	fn phone_keeps_digits_and_plus() {
		assert_eq!(sanitize_phone("+91 (987) 654-3210"), "+919876543210");
		assert_eq!(sanitize_phone("call me"), "");
	}

	#[test]
	fn text_drops_scripts_and_tags() {
		assert_eq!(
			sanitize_text("Ann<script>alert('x')</script> Smith"),
			"Ann Smith"
		);
		assert_eq!(sanitize_text("<b>Bold</b> move"), "Bold move");
		assert_eq!(sanitize_text("  O'Brien \"Jr\" "), "OBrien Jr");
		assert_eq!(sanitize_text("<SCRIPT type=x>\nbad()\n</Script >ok"), "ok");
	}

	#[test]
	fn clean_keeps_blank_fields_present() {
		assert_eq!(clean(Some("   ".to_string()), sanitize_text).as_deref(), Some(""));
		assert_eq!(clean(Some("---".to_string()), sanitize_phone).as_deref(), Some(""));
		assert_eq!(clean(None, sanitize_text), None);
		assert_eq!(
			clean(Some(" Pune ".to_string()), sanitize_text).as_deref(),
			Some("Pune")
		);
	}

	proptest! {
		#[test]
		fn sanitized_text_has_no_markup_characters(s in ".{0,64}") {
			let out = sanitize_text(&s);
			prop_assert!(!out.contains(['<', '>', '"', '\'']));
			prop_assert_eq!(out.trim(), out.as_str());
		}

		#[test]
		fn sanitizers_are_idempotent(s in ".{0,64}") {
			let email = sanitize_email(&s);
			prop_assert_eq!(sanitize_email(&email), email.clone());
			let phone = sanitize_phone(&s);
			prop_assert_eq!(sanitize_phone(&phone), phone.clone());
		}
	}
}
