// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Admin surface for kitchensink identity records.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod state;
pub mod version;

pub use cli::{Args, Command};
pub use commands::execute;
pub use state::AppState;
