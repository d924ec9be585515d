// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections for the kitchensink server.

pub mod audit;
pub mod crypto;
pub mod database;
pub mod logging;
pub mod runtime;

pub use audit::{AuditConfig, AuditConfigLayer, QueueOverflowPolicy};
pub use crypto::{CryptoConfig, CryptoConfigLayer, KeyEntry};
pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use runtime::{RuntimeConfig, RuntimeConfigLayer};
