// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Salted, iterated secret hashing.
//!
//! Passwords and agent tokens are never stored. Only a [`Credential`] is
//! persisted: a PBKDF2-HMAC-SHA256 digest, the salt it was derived with and
//! the iteration count. The iteration count travels with the record so older
//! credentials stay verifiable after [`DEFAULT_ITERATIONS`] is raised.
//!
//! Secrets are normalized to Unicode NFC before hashing, so the composed and
//! decomposed spellings of the same password produce the same digest.

use std::num::NonZeroU32;

use base64ct::{Base64UrlUnpadded, Encoding};
use ring::{
    pbkdf2,
    rand::{SecureRandom, SystemRandom},
};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use unicode_normalization::UnicodeNormalization;

/// Iteration count applied to every newly created credential.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Width of a generated salt in bytes.
pub const SALT_LEN: usize = 32;

/// Width of a derived digest in bytes (SHA-256 output).
pub const HASH_LEN: usize = 32;

/// Number of random bytes behind an issued agent token.
pub const TOKEN_BYTES: usize = 64;

static PBKDF2_ALGORITHM: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

/// Errors raised while creating credentials.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("system entropy source unavailable")]
    EntropyUnavailable,

    #[error("iteration count must be greater than zero")]
    ZeroIterations,
}

/// A stored secret: digest, salt and the iteration count used to derive it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub hash: Vec<u8>,
    pub salt: Vec<u8>,
    pub iterations: u32,
}

impl Credential {
    /// Derive a credential for `secret` with a fresh salt and the default
    /// iteration count.
    pub fn derive(secret: &str) -> Result<Self, CredentialError> {
        Self::derive_with_iterations(secret, DEFAULT_ITERATIONS)
    }

    /// Derive a credential with an explicit iteration count.
    pub fn derive_with_iterations(secret: &str, iterations: u32) -> Result<Self, CredentialError> {
        let salt = generate_salt()?;
        let hash = hash_secret(secret, &salt, iterations)?;
        Ok(Self {
            hash: hash.to_vec(),
            salt: salt.to_vec(),
            iterations,
        })
    }

    /// Check `candidate` against this credential.
    ///
    /// The candidate is hashed with the stored salt and iteration count and the
    /// digests are compared in constant time. A credential with a zero
    /// iteration count never verifies.
    pub fn verify(&self, candidate: &str) -> bool {
        match hash_secret(candidate, &self.salt, self.iterations) {
            Ok(computed) => digests_match(&computed, &self.hash),
            Err(_) => false,
        }
    }
}

/// Derive the digest of `secret` under `salt` and `iterations`.
///
/// Deterministic: identical inputs always yield identical bytes.
pub fn hash_secret(
    secret: &str,
    salt: &[u8],
    iterations: u32,
) -> Result<[u8; HASH_LEN], CredentialError> {
    let iterations = NonZeroU32::new(iterations).ok_or(CredentialError::ZeroIterations)?;
    let normalized: String = secret.nfc().collect();

    let mut out = [0u8; HASH_LEN];
    pbkdf2::derive(
        PBKDF2_ALGORITHM,
        iterations,
        salt,
        normalized.as_bytes(),
        &mut out,
    );
    Ok(out)
}

/// Generate a random salt from the system CSPRNG.
pub fn generate_salt() -> Result<[u8; SALT_LEN], CredentialError> {
    let mut salt = [0u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| CredentialError::EntropyUnavailable)?;
    Ok(salt)
}

/// Generate a plaintext agent token: 64 random bytes, URL-safe base64 with
/// no padding.
pub fn generate_token() -> Result<String, CredentialError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| CredentialError::EntropyUnavailable)?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Constant-time digest comparison.
///
/// Length mismatch is not secret (every digest is [`HASH_LEN`] bytes), so it
/// is allowed to return early.
pub fn digests_match(computed: &[u8], stored: &[u8]) -> bool {
    computed.len() == stored.len() && bool::from(computed.ct_eq(stored))
}
