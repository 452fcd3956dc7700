//! Login sessions: listing and revocation.

use crate::error::{PortalError, Result};
use crate::model::{AuditAction, ClientInfo, SessionWithUser, UserId};
use crate::portal::{Actor, Portal};
use crate::rbac;
use crate::services::audit::{self, AuditEvent};
use crate::services::{require_user, user_index};
use crate::store::{Mutations, Records};
use redb::WriteTransaction;

/// Invalidate every live session of `user`. Returns how many were revoked.
pub(crate) fn revoke_user_sessions(txn: &WriteTransaction, user: UserId) -> Result<usize> {
    let mut revoked = 0;
    for mut session in txn.sessions()? {
        if session.user_id == user && session.is_valid {
            session.is_valid = false;
            txn.put_session(&session)?;
            revoked += 1;
        }
    }
    Ok(revoked)
}

impl Portal {
    /// Valid, unexpired sessions, most recently active first.
    pub fn active_sessions(&self, actor: &Actor) -> Result<Vec<SessionWithUser>> {
        rbac::require(actor.role, rbac::EXECUTIVE)?;
        let now = self.now();
        self.store.read(|txn| {
            let users = user_index(txn)?;
            let mut live: Vec<_> = txn
                .sessions()?
                .into_iter()
                .filter(|s| s.is_valid && s.expires_at > now)
                .collect();
            live.sort_by(|a, b| b.last_active.cmp(&a.last_active).then(b.id.cmp(&a.id)));
            Ok(live
                .into_iter()
                .map(|session| {
                    let user = users.get(&session.user_id).map(|u| u.summary());
                    SessionWithUser { session, user }
                })
                .collect())
        })
    }

    /// Invalidate one session.
    pub fn revoke_session(&self, actor: &Actor, id: u64, client: &ClientInfo) -> Result<()> {
        rbac::require(actor.role, rbac::EXECUTIVE)?;
        let now = self.now();
        self.store.write(|txn| {
            let mut session = txn
                .session(id)?
                .ok_or_else(|| PortalError::not_found("Session not found"))?;
            session.is_valid = false;
            txn.put_session(&session)?;
            audit::append(
                txn,
                now,
                AuditEvent::new(AuditAction::Delete, "Session")
                    .by(actor.user_id)
                    .target(id)
                    .client(client),
            )?;
            Ok(())
        })
    }

    /// Invalidate every session of `user`. Returns the number revoked.
    pub fn revoke_all_sessions(&self, actor: &Actor, user: UserId, client: &ClientInfo) -> Result<usize> {
        rbac::require(actor.role, rbac::EXECUTIVE)?;
        let now = self.now();
        self.store.write(|txn| {
            require_user(txn, user)?;
            let count = revoke_user_sessions(txn, user)?;
            audit::append(
                txn,
                now,
                AuditEvent::new(AuditAction::Delete, "Session")
                    .by(actor.user_id)
                    .target(format!("user:{user}"))
                    .details(serde_json::json!({ "revoked": count }))
                    .client(client),
            )?;
            Ok(count)
        })
    }
}
