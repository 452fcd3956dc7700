//! # Role-Based Access Control
//!
//! Two layers decide what a caller may do:
//!
//! 1. **Role groups** gate whole operations (`require`). These are the
//!    checks the services run before touching the store.
//! 2. **Feature keys** describe capabilities shown to clients. Each role has
//!    a default set; per-user overrides replace the default for a single key.

use crate::error::{PortalError, Result};
use crate::model::{Role, User};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// ROLE GROUPS
// =============================================================================

/// System administrators.
pub const ADMIN: &[Role] = &[Role::SuperAdmin, Role::SystemAdmin];

/// Administrators plus HR.
pub const HR: &[Role] = &[Role::SuperAdmin, Role::SystemAdmin, Role::Hr];

/// Administrators plus the CEO.
pub const EXECUTIVE: &[Role] = &[Role::SuperAdmin, Role::SystemAdmin, Role::Ceo];

/// Executives plus HR: dashboards, reports, security reviews.
pub const SECURITY: &[Role] = &[Role::SuperAdmin, Role::SystemAdmin, Role::Ceo, Role::Hr];

/// Fail with `Forbidden` unless `role` is in `allowed`.
pub fn require(role: Role, allowed: &[Role]) -> Result<()> {
    if allowed.contains(&role) {
        Ok(())
    } else {
        Err(PortalError::Forbidden {
            message: "Forbidden: Insufficient permissions".to_string(),
            required: allowed.to_vec(),
            current: role,
        })
    }
}

// =============================================================================
// FEATURE KEYS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeatureKey {
    ViewAttendance,
    EditAttendance,
    ViewLeaves,
    ApproveLeaves,
    ViewPayroll,
    ManagePayroll,
    ViewAuditLogs,
    ManageUsers,
    SystemConfig,
}

/// Capabilities a role has before overrides.
#[must_use]
pub fn role_defaults(role: Role) -> &'static [FeatureKey] {
    use FeatureKey::*;
    match role {
        Role::SuperAdmin => &[
            ViewAttendance,
            EditAttendance,
            ViewLeaves,
            ApproveLeaves,
            ViewPayroll,
            ManagePayroll,
            ViewAuditLogs,
            ManageUsers,
            SystemConfig,
        ],
        Role::SystemAdmin => &[
            ViewAttendance,
            EditAttendance,
            ViewLeaves,
            ApproveLeaves,
            ViewPayroll,
            ManagePayroll,
            ViewAuditLogs,
            ManageUsers,
        ],
        Role::Ceo => &[ViewAttendance, ViewLeaves, ViewPayroll, ViewAuditLogs],
        Role::Hr => &[
            ViewAttendance,
            EditAttendance,
            ViewLeaves,
            ApproveLeaves,
            ViewPayroll,
        ],
        Role::Employee => &[ViewAttendance, ViewLeaves],
    }
}

/// Whether `user` has `feature`, overrides taking precedence.
#[must_use]
pub fn has_access(user: &User, feature: FeatureKey) -> bool {
    user.feature_overrides
        .get(&feature)
        .copied()
        .unwrap_or_else(|| role_defaults(user.role).contains(&feature))
}

/// Every feature available to `user`, sorted.
#[must_use]
pub fn accessible_features(user: &User) -> Vec<FeatureKey> {
    let mut features: BTreeSet<FeatureKey> = role_defaults(user.role).iter().copied().collect();
    for (key, enabled) in &user.feature_overrides {
        if *enabled {
            features.insert(*key);
        } else {
            features.remove(key);
        }
    }
    features.into_iter().collect()
}
