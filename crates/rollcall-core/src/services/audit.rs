//! # Audit trail
//!
//! Append-only record of logins, logouts and administrative changes.
//! Entries are written inside the transaction of the change they describe.

use crate::error::{PortalError, Result};
use crate::model::{AuditAction, AuditEntry, AuditLog, ClientInfo, UserId};
use crate::portal::{Actor, Page, Portal};
use crate::rbac;
use crate::store::{Mutations, Records};
use crate::services::user_index;
use chrono::{DateTime, Utc};
use redb::WriteTransaction;
use serde::Deserialize;

/// Default and maximum page sizes for audit queries.
pub const DEFAULT_LIMIT: u32 = 50;
pub const MAX_LIMIT: u32 = 100;

/// An audit entry about to be written.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub action: AuditAction,
    pub resource: String,
    pub resource_id: Option<String>,
    pub user_id: Option<UserId>,
    pub details: Option<serde_json::Value>,
    pub client: ClientInfo,
}

impl AuditEvent {
    pub fn new(action: AuditAction, resource: impl Into<String>) -> Self {
        Self {
            action,
            resource: resource.into(),
            resource_id: None,
            user_id: None,
            details: None,
            client: ClientInfo::default(),
        }
    }

    #[must_use]
    pub fn by(mut self, user: UserId) -> Self {
        self.user_id = Some(user);
        self
    }

    #[must_use]
    pub fn target(mut self, id: impl ToString) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }

    #[must_use]
    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    #[must_use]
    pub fn client(mut self, client: &ClientInfo) -> Self {
        self.client = client.clone();
        self
    }
}

/// Append `event` within `txn`.
pub(crate) fn append(txn: &WriteTransaction, now: DateTime<Utc>, event: AuditEvent) -> Result<AuditLog> {
    let details = event.details.as_ref().map(serde_json::to_string).transpose()?;
    let entry = AuditLog {
        id: txn.next_id("audit")?,
        user_id: event.user_id,
        action: event.action,
        resource: event.resource,
        resource_id: event.resource_id,
        details,
        ip_address: event.client.ip_address,
        user_agent: event.client.user_agent,
        created_at: now,
    };
    txn.put_audit(&entry)?;
    Ok(entry)
}

/// Filters for [`Portal::audit_logs`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditQuery {
    pub user_id: Option<UserId>,
    pub action: Option<AuditAction>,
    pub resource: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl AuditQuery {
    fn matches(&self, log: &AuditLog) -> bool {
        self.user_id.is_none_or(|u| log.user_id == Some(u))
            && self.action.is_none_or(|a| log.action == a)
            && self.resource.as_deref().is_none_or(|r| log.resource == r)
            && self.start_date.is_none_or(|s| log.created_at >= s)
            && self.end_date.is_none_or(|e| log.created_at <= e)
    }
}

pub(crate) fn to_entry(log: AuditLog, user: Option<crate::model::UserSummary>) -> AuditEntry {
    // Stored details were produced by serde_json; anything unparsable is kept as a string.
    let details = log.details.map(|raw| {
        serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw))
    });
    AuditEntry {
        id: log.id,
        user_id: log.user_id,
        action: log.action,
        resource: log.resource,
        resource_id: log.resource_id,
        details,
        ip_address: log.ip_address,
        user_agent: log.user_agent,
        created_at: log.created_at,
        user,
    }
}

impl Portal {
    /// Append a standalone audit entry.
    pub fn log(&self, event: AuditEvent) -> Result<AuditLog> {
        let now = self.now();
        self.store.write(|txn| append(txn, now, event))
    }

    /// Filtered audit entries, newest first. Administrators only.
    pub fn audit_logs(&self, actor: &Actor, query: &AuditQuery) -> Result<Page<AuditEntry>> {
        rbac::require(actor.role, rbac::ADMIN)?;
        let page = query.page.unwrap_or(1);
        let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
        if page < 1 {
            return Err(PortalError::invalid("page must be at least 1"));
        }
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(PortalError::invalid(format!("limit must be between 1 and {MAX_LIMIT}")));
        }

        self.store.read(|txn| {
            let users = user_index(txn)?;
            let matching: Vec<AuditLog> = txn
                .audit_logs()?
                .into_iter()
                .rev()
                .filter(|log| query.matches(log))
                .collect();
            let page = Page::slice(matching, page, limit);
            Ok(Page {
                data: page
                    .data
                    .into_iter()
                    .map(|log| {
                        let user = log.user_id.and_then(|id| users.get(&id)).map(|u| u.summary());
                        to_entry(log, user)
                    })
                    .collect(),
                total: page.total,
                page: page.page,
                limit: page.limit,
            })
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::Role;
    use crate::services::testkit::harness;
    use serde_json::json;

    #[test]
    fn entries_come_back_newest_first_with_details() {
        let h = harness();
        let admin = h.admin();
        h.portal
            .log(AuditEvent::new(AuditAction::Create, "Holiday").by(admin.user_id).target(1))
            .unwrap();
        h.portal
            .log(
                AuditEvent::new(AuditAction::Update, "User")
                    .by(admin.user_id)
                    .details(json!({"isActive": false})),
            )
            .unwrap();

        let page = h.portal.audit_logs(&admin, &AuditQuery::default()).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.data[0].action, AuditAction::Update);
        assert_eq!(page.data[0].details, Some(json!({"isActive": false})));
        assert_eq!(page.data[0].user.as_ref().unwrap().email, "root@corp.test");
        assert_eq!(page.data[1].resource_id.as_deref(), Some("1"));
    }

    #[test]
    fn filters_by_action_and_resource() {
        let h = harness();
        let admin = h.admin();
        for (action, resource) in [
            (AuditAction::Login, "Auth"),
            (AuditAction::Update, "User"),
            (AuditAction::Update, "Settings"),
        ] {
            h.portal.log(AuditEvent::new(action, resource)).unwrap();
        }
        let query = AuditQuery {
            action: Some(AuditAction::Update),
            resource: Some("User".into()),
            ..AuditQuery::default()
        };
        let page = h.portal.audit_logs(&admin, &query).unwrap();
        assert_eq!(page.total, 1);
    }

    #[test]
    fn limit_is_bounded_and_role_checked() {
        let h = harness();
        let admin = h.admin();
        let bad = AuditQuery {
            limit: Some(101),
            ..AuditQuery::default()
        };
        assert!(matches!(h.portal.audit_logs(&admin, &bad), Err(PortalError::InvalidInput(_))));

        let hr = h.user("hr@corp.test", "Hana", Role::Hr);
        assert!(matches!(
            h.portal.audit_logs(&hr, &AuditQuery::default()),
            Err(PortalError::Forbidden { .. })
        ));
    }
}
