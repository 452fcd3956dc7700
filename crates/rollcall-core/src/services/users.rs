//! # Users
//!
//! Account creation, listing and administrative updates.

use crate::crypto::hash_password_with;
use crate::error::{PortalError, Result};
use crate::model::{AuditAction, ClientInfo, EmployeeProfile, PublicUser, Role, User, UserId};
use crate::portal::{Actor, Page, Portal};
use crate::rbac::{self, FeatureKey};
use crate::services::audit::{self, AuditEvent};
use crate::services::sessions::revoke_user_sessions;
use crate::services::{require_user, required_text};
use crate::store::{Mutations, Records};
use chrono::{DateTime, Utc};
use redb::WriteTransaction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Everything needed to create an account.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default = "default_role")]
    pub role: Role,
    #[serde(default)]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub designation: Option<String>,
    #[serde(default)]
    pub base_salary_cents: i64,
}

fn default_role() -> Role {
    Role::Employee
}

/// Partial update applied by administrators. Absent fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_overrides: Option<BTreeMap<FeatureKey, bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_salary_cents: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
}

/// Normalized (trimmed, lowercased) email, or `InvalidInput`.
pub fn validate_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.contains('@') && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    };
    if !valid {
        return Err(PortalError::invalid("A valid email is required"));
    }
    Ok(email)
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PortalError::invalid(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Create an account inside `txn`. Fails with `Conflict` on a taken email.
pub(crate) fn create_in(
    txn: &WriteTransaction,
    now: DateTime<Utc>,
    new: NewUser,
    hash_iterations: u32,
) -> Result<User> {
    let email = validate_email(&new.email)?;
    validate_password(&new.password)?;
    let first_name = required_text(&new.first_name, "First name")?;
    let last_name = required_text(&new.last_name, "Last name")?;
    if new.base_salary_cents < 0 {
        return Err(PortalError::invalid("Base salary cannot be negative"));
    }
    if txn.user_by_email(&email)?.is_some() {
        return Err(PortalError::conflict("User already exists"));
    }

    let id = UserId(txn.next_id("users")?);
    let employee_id = match new.employee_id.as_deref().map(str::trim) {
        Some(given) if !given.is_empty() => given.to_string(),
        _ => format!("EMP-{:04}", id.0),
    };
    let user = User {
        id,
        email,
        password_hash: hash_password_with(&new.password, hash_iterations)?,
        role: new.role,
        is_active: true,
        feature_overrides: BTreeMap::new(),
        profile: EmployeeProfile {
            first_name,
            last_name,
            employee_id,
            department: new.department.filter(|d| !d.trim().is_empty()),
            designation: new.designation.filter(|d| !d.trim().is_empty()),
            base_salary_cents: new.base_salary_cents,
        },
        created_at: now,
    };
    txn.put_user(&user)?;
    Ok(user)
}

impl Portal {
    /// Create an account with no role check and no audit entry.
    /// Used by registration, bootstrap and tests.
    pub fn insert_user(&self, new: NewUser) -> Result<User> {
        let now = self.now();
        let iterations = self.config.hash_iterations;
        self.store.write(|txn| create_in(txn, now, new, iterations))
    }

    /// Create an account on behalf of an executive. Department defaults to
    /// `Unassigned`.
    pub fn create_user(&self, actor: &Actor, mut new: NewUser, client: &ClientInfo) -> Result<PublicUser> {
        rbac::require(actor.role, rbac::EXECUTIVE)?;
        if new.role == Role::SuperAdmin && actor.role != Role::SuperAdmin {
            return Err(PortalError::Forbidden {
                message: "Only a super admin can create super admins".to_string(),
                required: vec![Role::SuperAdmin],
                current: actor.role,
            });
        }
        if new.department.as_deref().is_none_or(|d| d.trim().is_empty()) {
            new.department = Some("Unassigned".to_string());
        }
        let now = self.now();
        let iterations = self.config.hash_iterations;
        self.store.write(|txn| {
            let user = create_in(txn, now, new, iterations)?;
            audit::append(
                txn,
                now,
                AuditEvent::new(AuditAction::Create, "User")
                    .by(actor.user_id)
                    .target(user.id)
                    .details(serde_json::json!({ "email": user.email, "role": user.role }))
                    .client(client),
            )?;
            Ok(user.public())
        })
    }

    /// Users newest first, optionally filtered by a case-insensitive search
    /// over email, first name and last name.
    pub fn list_users(&self, actor: &Actor, query: &UserQuery) -> Result<Page<PublicUser>> {
        rbac::require(actor.role, rbac::SECURITY)?;
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let needle = query
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let users = self.store.read(|txn| txn.users())?;
        let matching: Vec<PublicUser> = users
            .into_iter()
            .rev()
            .filter(|u| {
                needle.as_deref().is_none_or(|n| {
                    u.email.to_lowercase().contains(n)
                        || u.profile.first_name.to_lowercase().contains(n)
                        || u.profile.last_name.to_lowercase().contains(n)
                })
            })
            .map(|u| u.public())
            .collect();
        Ok(Page::slice(matching, page, limit))
    }

    /// Apply `update` to user `id`. Deactivation revokes every session of
    /// the user in the same transaction.
    pub fn update_user(
        &self,
        actor: &Actor,
        id: UserId,
        update: UserUpdate,
        client: &ClientInfo,
    ) -> Result<PublicUser> {
        rbac::require(actor.role, rbac::ADMIN)?;
        if update.role == Some(Role::SuperAdmin) && actor.role != Role::SuperAdmin {
            return Err(PortalError::Forbidden {
                message: "Only a super admin can grant SUPER_ADMIN".to_string(),
                required: vec![Role::SuperAdmin],
                current: actor.role,
            });
        }
        if update.base_salary_cents.is_some_and(|c| c < 0) {
            return Err(PortalError::invalid("Base salary cannot be negative"));
        }
        let now = self.now();
        self.store.write(|txn| {
            let mut user = require_user(txn, id)?;
            if let Some(role) = update.role {
                user.role = role;
            }
            if let Some(active) = update.is_active {
                user.is_active = active;
            }
            if let Some(overrides) = &update.feature_overrides {
                user.feature_overrides = overrides.clone();
            }
            if let Some(department) = &update.department {
                user.profile.department = Some(department.trim().to_string()).filter(|d| !d.is_empty());
            }
            if let Some(designation) = &update.designation {
                user.profile.designation = Some(designation.trim().to_string()).filter(|d| !d.is_empty());
            }
            if let Some(cents) = update.base_salary_cents {
                user.profile.base_salary_cents = cents;
            }
            txn.put_user(&user)?;

            if update.is_active == Some(false) {
                revoke_user_sessions(txn, user.id)?;
            }
            audit::append(
                txn,
                now,
                AuditEvent::new(AuditAction::Update, "User")
                    .by(actor.user_id)
                    .target(user.id)
                    .details(serde_json::to_value(&update)?)
                    .client(client),
            )?;
            Ok(user.public())
        })
    }
}
