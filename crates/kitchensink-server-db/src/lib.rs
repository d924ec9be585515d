// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite persistence for kitchensink.
//!
//! Repositories implement the identity crate's `IdentityStore` so the
//! identity service can run against a real database. PII columns only ever
//! hold hashes and ciphertext.

pub mod audit;
pub mod error;
pub mod member;
pub mod migrations;
pub mod pool;
mod row;
pub mod testing;
pub mod user;

pub use audit::{AuditQuery, AuditRepository};
pub use error::{DbError, Result};
pub use member::MemberRepository;
pub use migrations::run_migrations;
pub use pool::create_pool;
pub use user::UserRepository;
