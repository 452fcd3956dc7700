//! # Leave requests
//!
//! Employees file inclusive date ranges; HR approves or rejects them.
//! A new request may not overlap any PENDING or APPROVED request of the
//! same user. Rejected requests free their dates again.

use crate::error::{PortalError, Result};
use crate::model::{AuditAction, ClientInfo, Decision, LeaveRequest, LeaveWithUser, ReviewStatus};
use crate::portal::{Actor, Portal};
use crate::rbac;
use crate::services::audit::{self, AuditEvent};
use crate::services::user_index;
use crate::store::{Mutations, Records};
use chrono::NaiveDate;
use serde::Deserialize;

pub const MIN_REASON_LEN: usize = 5;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveInput {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionInput {
    pub status: Decision,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

impl Portal {
    /// File a PENDING leave request for the caller.
    pub fn request_leave(&self, actor: &Actor, input: LeaveInput) -> Result<LeaveRequest> {
        if input.start_date > input.end_date {
            return Err(PortalError::invalid("Start date cannot be after end date"));
        }
        let reason = input.reason.trim().to_string();
        if reason.chars().count() < MIN_REASON_LEN {
            return Err(PortalError::invalid("Reason is required"));
        }
        let now = self.now();
        self.store.write(|txn| {
            let clash = txn.leaves()?.into_iter().any(|l| {
                l.user_id == actor.user_id
                    && l.status != ReviewStatus::Rejected
                    && l.overlaps(input.start_date, input.end_date)
            });
            if clash {
                return Err(PortalError::conflict("Leave request overlaps with an existing request"));
            }
            let leave = LeaveRequest {
                id: txn.next_id("leaves")?,
                user_id: actor.user_id,
                start_date: input.start_date,
                end_date: input.end_date,
                reason,
                status: ReviewStatus::Pending,
                approved_by: None,
                rejection_reason: None,
                created_at: now,
            };
            txn.put_leave(&leave)?;
            Ok(leave)
        })
    }

    /// The caller's requests, newest first.
    pub fn my_leaves(&self, actor: &Actor) -> Result<Vec<LeaveRequest>> {
        let mut mine: Vec<_> = self
            .store
            .read(|txn| txn.leaves())?
            .into_iter()
            .filter(|l| l.user_id == actor.user_id)
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(mine)
    }

    /// Every PENDING request, oldest first, with its requester.
    pub fn pending_leaves(&self, actor: &Actor) -> Result<Vec<LeaveWithUser>> {
        rbac::require(actor.role, rbac::HR)?;
        self.store.read(|txn| {
            let users = user_index(txn)?;
            let mut pending: Vec<_> = txn
                .leaves()?
                .into_iter()
                .filter(|l| l.status == ReviewStatus::Pending)
                .collect();
            pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
            Ok(pending
                .into_iter()
                .map(|leave| {
                    let user = users.get(&leave.user_id).map(|u| u.summary());
                    LeaveWithUser { leave, user }
                })
                .collect())
        })
    }

    /// Approve or reject a PENDING request. A rejection reason is kept only
    /// for rejections.
    pub fn decide_leave(
        &self,
        actor: &Actor,
        id: u64,
        input: DecisionInput,
        client: &ClientInfo,
    ) -> Result<LeaveRequest> {
        rbac::require(actor.role, rbac::HR)?;
        let now = self.now();
        self.store.write(|txn| {
            let mut leave = txn
                .leave(id)?
                .ok_or_else(|| PortalError::not_found("Leave request not found"))?;
            if leave.status != ReviewStatus::Pending {
                return Err(PortalError::conflict("Leave request is not pending"));
            }
            leave.status = input.status.into();
            leave.approved_by = Some(actor.user_id);
            leave.rejection_reason = match input.status {
                Decision::Rejected => input.rejection_reason.clone().filter(|r| !r.trim().is_empty()),
                Decision::Approved => None,
            };
            txn.put_leave(&leave)?;
            audit::append(
                txn,
                now,
                AuditEvent::new(AuditAction::Update, "LeaveRequest")
                    .by(actor.user_id)
                    .target(leave.id)
                    .details(serde_json::json!({ "status": leave.status }))
                    .client(client),
            )?;
            Ok(leave)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::Role;
    use crate::services::testkit::harness;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).unwrap()
    }

    fn input(start: NaiveDate, end: NaiveDate) -> LeaveInput {
        LeaveInput {
            start_date: start,
            end_date: end,
            reason: "Family trip".into(),
        }
    }

    #[test]
    fn reversed_range_and_short_reason_are_rejected() {
        let h = harness();
        let emp = h.user("e@corp.test", "Eve", Role::Employee);
        let err = h.portal.request_leave(&emp, input(d(3, 10), d(3, 9))).unwrap_err();
        assert_eq!(err.to_string(), "Start date cannot be after end date");

        let mut short = input(d(3, 10), d(3, 10));
        short.reason = "flu".into();
        assert!(matches!(h.portal.request_leave(&emp, short), Err(PortalError::InvalidInput(_))));
    }

    #[test]
    fn overlap_is_inclusive_and_per_user() {
        let h = harness();
        let eve = h.user("e@corp.test", "Eve", Role::Employee);
        let bob = h.user("b@corp.test", "Bob", Role::Employee);
        h.portal.request_leave(&eve, input(d(3, 10), d(3, 12))).unwrap();

        let err = h.portal.request_leave(&eve, input(d(3, 12), d(3, 14))).unwrap_err();
        assert!(matches!(err, PortalError::Conflict(_)));
        assert!(h.portal.request_leave(&eve, input(d(3, 13), d(3, 14))).is_ok());
        assert!(h.portal.request_leave(&bob, input(d(3, 10), d(3, 12))).is_ok());
    }

    #[test]
    fn rejected_leave_frees_its_dates() {
        let h = harness();
        let hr = h.user("hr@corp.test", "Hana", Role::Hr);
        let eve = h.user("e@corp.test", "Eve", Role::Employee);
        let leave = h.portal.request_leave(&eve, input(d(3, 10), d(3, 12))).unwrap();
        let decided = h
            .portal
            .decide_leave(
                &hr,
                leave.id,
                DecisionInput {
                    status: Decision::Rejected,
                    rejection_reason: Some("Quarter end".into()),
                },
                &ClientInfo::default(),
            )
            .unwrap();
        assert_eq!(decided.status, ReviewStatus::Rejected);
        assert_eq!(decided.rejection_reason.as_deref(), Some("Quarter end"));
        assert_eq!(decided.approved_by, Some(hr.user_id));

        assert!(h.portal.request_leave(&eve, input(d(3, 11), d(3, 11))).is_ok());
    }

    #[test]
    fn decisions_only_apply_to_pending_requests() {
        let h = harness();
        let hr = h.user("hr@corp.test", "Hana", Role::Hr);
        let eve = h.user("e@corp.test", "Eve", Role::Employee);
        let leave = h.portal.request_leave(&eve, input(d(4, 1), d(4, 2))).unwrap();
        let approve = || DecisionInput {
            status: Decision::Approved,
            rejection_reason: Some("ignored".into()),
        };

        let approved = h
            .portal
            .decide_leave(&hr, leave.id, approve(), &ClientInfo::default())
            .unwrap();
        assert_eq!(approved.rejection_reason, None);

        let again = h.portal.decide_leave(&hr, leave.id, approve(), &ClientInfo::default());
        assert_eq!(again.unwrap_err().to_string(), "Leave request is not pending");

        let missing = h.portal.decide_leave(&hr, 999, approve(), &ClientInfo::default());
        assert!(matches!(missing, Err(PortalError::NotFound(_))));

        let by_employee = h.portal.decide_leave(&eve, leave.id, approve(), &ClientInfo::default());
        assert!(matches!(by_employee, Err(PortalError::Forbidden { .. })));
    }

    #[test]
    fn listings_are_ordered() {
        let h = harness();
        let hr = h.user("hr@corp.test", "Hana", Role::Hr);
        let eve = h.user("e@corp.test", "Eve", Role::Employee);
        let first = h.portal.request_leave(&eve, input(d(5, 1), d(5, 1))).unwrap();
        h.clock.advance(chrono::Duration::minutes(1));
        let second = h.portal.request_leave(&eve, input(d(6, 1), d(6, 1))).unwrap();

        let mine = h.portal.my_leaves(&eve).unwrap();
        assert_eq!(mine[0].id, second.id);

        let pending = h.portal.pending_leaves(&hr).unwrap();
        assert_eq!(pending[0].leave.id, first.id);
        assert_eq!(pending[0].user.as_ref().unwrap().first_name, "Eve");
    }
}
