// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! PII protection primitives.
//!
//! - [`PiiHasher`]: keyed, deterministic lookup hash used for uniqueness and search.
//! - [`FieldCipher`]: AES-256-GCM encryption whose output is tagged with the key version.
//! - [`KeyRing`]: the set of decryption keys plus the active encryption version.
//!
//! The hash never depends on the key version, so rotating encryption keys
//! leaves every lookup index intact.

pub mod cipher;
pub mod error;
pub mod hasher;
pub mod keyring;

pub use cipher::{EncryptedValue, FieldCipher};
pub use error::{CryptoError, CryptoResult};
pub use hasher::PiiHasher;
pub use keyring::{encode_key, generate_key, KeyRing, KEY_SIZE};
