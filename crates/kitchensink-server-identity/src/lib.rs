// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity records (members and users) whose e-mail and phone number are
//! stored only as a lookup hash plus versioned ciphertext.
//!
//! Every write goes through [`IdentityService`], which runs an explicit
//! pipeline: sanitize, validate, map, uniqueness pre-check, snapshot, save,
//! diff and a best-effort audit append.

pub mod capture;
pub mod error;
pub mod mapper;
pub mod member;
pub mod memory;
pub mod record;
pub mod sanitize;
pub mod service;
pub mod store;
pub mod types;
pub mod user;
pub mod validation;

pub use capture::ChangeCapture;
pub use error::{ErrorBody, ErrorKind, IdentityError, IdentityResult};
pub use mapper::{Mapped, RecordMapper};
pub use member::{Member, MemberRequest, MemberResponse};
pub use memory::MemoryIdentityStore;
pub use record::{DecryptedPii, IdentityRecord, IdentityRequest, RequestMode};
pub use service::{IdentityService, OperationContext, ReencryptReport};
pub use store::{IdentityStore, StoreError};
pub use types::{MemberId, MemberStatus, PiiField, ProtectedValue, UserId};
pub use user::{User, UserRequest, UserResponse, DATE_FORMAT};
