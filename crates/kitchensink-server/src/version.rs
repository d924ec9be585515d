// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Build information for kitchensink-server.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
	pub name: &'static str,
	pub version: &'static str,
	pub platform: String,
}

impl BuildInfo {
	pub fn current() -> Self {
		Self {
			name: env!("CARGO_PKG_NAME"),
			version: env!("CARGO_PKG_VERSION"),
			platform: format!("{}-{}", std::env::consts::ARCH, std::env::consts::OS),
		}
	}
}

/// Format version info for display.
pub fn format_version_info() -> String {
	let info = BuildInfo::current();
	format!(
		"{} version: {}\n\
         Platform:                  {}",
		info.name, info.version, info.platform,
	)
}
