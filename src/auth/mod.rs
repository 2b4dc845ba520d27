// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Credential verification for the weather data API.
//!
//! ## Auth Flow
//!
//! Users:
//! 1. Client sends `Authorization: Basic base64(email:password)`
//! 2. Server looks the email up in a short, rolled-back transaction
//! 3. The password is hashed with the stored salt and iteration count and
//!    compared in constant time
//!
//! Agents:
//! 1. Client sends `Authorization: weather-thingy-agent-token <token>` to a
//!    route containing `{agent_id}`
//! 2. Server looks the agent up by the path id, then verifies the token the
//!    same way
//!
//! ## Security
//!
//! - Secrets are stored only as PBKDF2-HMAC-SHA256 digests with a per-record
//!   salt (see [`password`])
//! - Unknown identities, malformed headers and wrong secrets are
//!   indistinguishable to the client
//! - Verified principals reach handlers as typed extractors
//!   ([`UserAuth`], [`AgentAuth`], [`AdminAuth`])

pub mod error;
pub mod extractor;
pub mod password;
pub mod principal;
pub mod verifier;

pub use error::AuthError;
pub use extractor::{AdminAuth, AgentAuth, UserAuth};
pub use principal::{Credentials, Principal};
