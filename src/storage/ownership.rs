// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership and administrator policies.
//!
//! Authentication establishes who the caller is; these checks decide whether
//! that caller may touch a given record. Both policies fail with
//! [`AuthError::Forbidden`] (403).

use crate::auth::AuthError;
use crate::error::ApiError;

use super::{Agent, User};

/// Trait for resources that have an owner.
pub trait OwnedResource {
    fn owner_user_id(&self) -> u64;
}

impl OwnedResource for Agent {
    fn owner_user_id(&self) -> u64 {
        self.owner_user_id
    }
}

/// Trait for enforcing ownership on storage reads.
pub trait OwnershipEnforcer {
    /// Verify that the user owns this resource.
    ///
    /// # Errors
    /// Returns `AuthError::Forbidden` if the user doesn't own the resource.
    fn verify_ownership(&self, user: &User) -> Result<(), AuthError>;
}

impl<T: OwnedResource> OwnershipEnforcer for T {
    fn verify_ownership(&self, user: &User) -> Result<(), AuthError> {
        if self.owner_user_id() == user.id {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

/// Ownership check on an optional lookup result.
pub trait OwnershipCheck<T> {
    /// Return the resource if it exists and the user owns it.
    ///
    /// A missing resource is 404, a foreign one 403.
    fn verify_owner(self, user: &User, what: &str) -> Result<T, ApiError>;
}

impl<T: OwnedResource> OwnershipCheck<T> for Option<T> {
    fn verify_owner(self, user: &User, what: &str) -> Result<T, ApiError> {
        match self {
            Some(resource) => {
                resource.verify_ownership(user)?;
                Ok(resource)
            }
            None => Err(ApiError::not_found(format!("{what} not found"))),
        }
    }
}

/// Administrator policy.
pub fn require_admin(user: &User) -> Result<(), AuthError> {
    if user.is_admin {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}
