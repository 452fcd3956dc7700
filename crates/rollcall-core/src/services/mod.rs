//! # Services
//!
//! Every portal operation, as `impl Portal` blocks grouped by area.
//!
//! Each operation takes the calling [`Actor`](crate::Actor), checks its role
//! with [`rbac::require`](crate::rbac::require), and then does all of its
//! reads and writes in one store transaction. Operations that change state
//! on behalf of an administrator append their audit entry inside that same
//! transaction.

pub mod admin;
pub mod announcements;
pub mod attendance;
pub mod audit;
pub mod auth;
pub mod breaks;
pub mod holidays;
pub mod leaves;
pub mod payroll;
pub mod sessions;
pub mod settings;
pub mod users;

use crate::error::{PortalError, Result};
use crate::model::{User, UserId};
use crate::store::Records;
use std::collections::HashMap;

/// Fetch a user or fail with `NotFound("User not found")`.
pub(crate) fn require_user<R: Records>(r: &R, id: UserId) -> Result<User> {
    r.user(id)?.ok_or_else(|| PortalError::not_found("User not found"))
}

/// All users, keyed by id, for joining summaries onto other records.
pub(crate) fn user_index<R: Records>(r: &R) -> Result<HashMap<UserId, User>> {
    Ok(r.users()?.into_iter().map(|u| (u.id, u)).collect())
}

/// Trimmed, non-empty text or `InvalidInput` naming the field.
pub(crate) fn required_text(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PortalError::invalid(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}
