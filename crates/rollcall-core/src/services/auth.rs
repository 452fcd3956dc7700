//! # Authentication
//!
//! Registration, login/logout, token authentication and self-service
//! password reset requests.
//!
//! A login creates a [`Session`] row and returns a signed token naming it.
//! Every authenticated request re-checks that row, so revoking a session or
//! deactivating a user takes effect immediately. The role on the returned
//! [`Actor`] is read from the user record, never from the token.

use crate::crypto::{Claims, hash_password_with, verify_password};
use crate::error::{PortalError, Result};
use crate::model::{
    AuditAction, ClientInfo, PasswordResetRequest, PublicUser, ReviewStatus, Role, Session, UserId,
};
use crate::portal::{Actor, Portal};
use crate::rbac::{self, FeatureKey};
use crate::services::audit::{self, AuditEvent};
use crate::services::require_user;
use crate::services::users::{self, NewUser};
use crate::store::{Mutations, Records};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sessions are touched at most this often, in seconds.
const TOUCH_INTERVAL_SECS: i64 = 60;

const SESSION_GONE: &str = "Session expired or revoked";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutcome {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: PublicUser,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordInput {
    pub email: String,
    pub new_password: String,
}

/// The caller's own account plus what it may see.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Me {
    #[serde(flatten)]
    pub user: PublicUser,
    pub features: Vec<FeatureKey>,
}

impl Portal {
    /// Public self-registration. Only the EMPLOYEE role can be requested.
    pub fn register(&self, input: RegisterInput) -> Result<UserId> {
        let role = input.role.unwrap_or(Role::Employee);
        if role != Role::Employee {
            return Err(PortalError::invalid(
                "Self-registration is limited to the EMPLOYEE role",
            ));
        }
        let now = self.now();
        let iterations = self.config.hash_iterations;
        self.store.write(|txn| {
            let user = users::create_in(
                txn,
                now,
                NewUser {
                    email: input.email,
                    password: input.password,
                    first_name: input.first_name,
                    last_name: input.last_name,
                    role,
                    employee_id: None,
                    department: None,
                    designation: None,
                    base_salary_cents: 0,
                },
                iterations,
            )?;
            audit::append(
                txn,
                now,
                AuditEvent::new(AuditAction::Create, "User")
                    .by(user.id)
                    .target(user.id)
                    .details(serde_json::json!({ "selfRegistered": true })),
            )?;
            Ok(user.id)
        })
    }

    /// Verify credentials, open a session and return its bearer token.
    ///
    /// Unknown email, wrong password and inactive account all produce the
    /// same `Unauthorized("Invalid credentials")`.
    pub fn login(&self, input: LoginInput, client: &ClientInfo) -> Result<LoginOutcome> {
        let invalid = || PortalError::unauthorized("Invalid credentials");
        let user = self
            .store
            .read(|txn| txn.user_by_email(&input.email))?
            .filter(|u| u.is_active)
            .ok_or_else(invalid)?;
        if !verify_password(&input.password, &user.password_hash) {
            return Err(invalid());
        }

        let now = self.now();
        let expires_at = now + self.config.session_ttl;
        let session = self.store.write(|txn| {
            let session = Session {
                id: txn.next_id("sessions")?,
                user_id: user.id,
                expires_at,
                is_valid: true,
                ip_address: client.ip_address.clone(),
                user_agent: client.user_agent.clone(),
                created_at: now,
                last_active: now,
            };
            txn.put_session(&session)?;
            audit::append(
                txn,
                now,
                AuditEvent::new(AuditAction::Login, "Auth")
                    .by(user.id)
                    .target(session.id)
                    .client(client),
            )?;
            Ok(session)
        })?;

        let token = self.signer.sign(&Claims {
            sid: session.id,
            uid: user.id,
            exp: expires_at.timestamp(),
        })?;
        Ok(LoginOutcome {
            token,
            expires_at,
            user: user.public(),
        })
    }

    /// Invalidate the caller's session.
    pub fn logout(&self, actor: &Actor, client: &ClientInfo) -> Result<()> {
        let now = self.now();
        self.store.write(|txn| {
            if let Some(mut session) = txn.session(actor.session_id)? {
                session.is_valid = false;
                txn.put_session(&session)?;
            }
            audit::append(
                txn,
                now,
                AuditEvent::new(AuditAction::Logout, "Auth")
                    .by(actor.user_id)
                    .target(actor.session_id)
                    .client(client),
            )?;
            Ok(())
        })
    }

    /// Resolve a bearer token to an [`Actor`].
    pub fn authenticate(&self, token: &str) -> Result<Actor> {
        let claims = self.signer.verify(token)?;
        let now = self.now();
        if now.timestamp() >= claims.exp {
            return Err(PortalError::unauthorized(SESSION_GONE));
        }

        let (session, user) = self.store.read(|txn| Ok((txn.session(claims.sid)?, txn.user(claims.uid)?)))?;
        let session = session
            .filter(|s| s.is_valid && s.user_id == claims.uid && s.expires_at > now)
            .ok_or_else(|| PortalError::unauthorized(SESSION_GONE))?;
        let user = user
            .filter(|u| u.is_active)
            .ok_or_else(|| PortalError::unauthorized(SESSION_GONE))?;

        if (now - session.last_active).num_seconds() >= TOUCH_INTERVAL_SECS {
            self.store.write(|txn| {
                // Re-read so a concurrent revoke is not overwritten.
                if let Some(mut current) = txn.session(session.id)? {
                    current.last_active = now;
                    txn.put_session(&current)?;
                }
                Ok(())
            })?;
        }

        Ok(Actor {
            user_id: user.id,
            role: user.role,
            session_id: session.id,
        })
    }

    /// File a password reset request for an administrator to approve.
    pub fn forgot_password(&self, input: ForgotPasswordInput) -> Result<u64> {
        users::validate_password(&input.new_password)?;
        let now = self.now();
        let new_password_hash = hash_password_with(&input.new_password, self.config.hash_iterations)?;
        self.store.write(|txn| {
            let user = txn
                .user_by_email(&input.email)?
                .ok_or_else(|| PortalError::not_found("User not found"))?;
            let request = PasswordResetRequest {
                id: txn.next_id("password_requests")?,
                user_id: user.id,
                new_password_hash,
                status: ReviewStatus::Pending,
                decided_by: None,
                created_at: now,
            };
            txn.put_password_request(&request)?;
            Ok(request.id)
        })
    }

    /// The caller's account and effective feature set.
    pub fn me(&self, actor: &Actor) -> Result<Me> {
        let user = self.store.read(|txn| require_user(txn, actor.user_id))?;
        Ok(Me {
            features: rbac::accessible_features(&user),
            user: user.public(),
        })
    }
}
