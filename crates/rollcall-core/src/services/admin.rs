//! # Administration
//!
//! Dashboard figures for executives and HR, password reset reviews, and
//! the data reset.
//!
//! Dashboard counts treat PRESENT, LATE and HALF_DAY rows as attended.
//! Employee totals leave out the two system roles.

use crate::error::{PortalError, Result};
use crate::model::{
    AttendanceStatus, AuditAction, AuditEntry, ClientInfo, LeaveWithUser, PasswordRequestView, ReviewStatus, UserId,
};
use crate::portal::{Actor, Portal};
use crate::rbac;
use crate::services::audit::{self, AuditEvent};
use crate::services::{require_user, user_index};
use crate::store::{Mutations, Records};
use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

pub const DEFAULT_TREND_DAYS: u32 = 7;
pub const MAX_TREND_DAYS: u32 = 30;
pub const DEFAULT_PENDING_LIMIT: usize = 10;
pub const MAX_PENDING_LIMIT: usize = 50;
pub const ACTIVITY_LIMIT: usize = 20;

/// Days without an attended row before someone counts as absent for long.
pub const ABSENCE_WINDOW_DAYS: u64 = 3;
/// Pending leave count above which an alert is raised.
pub const PENDING_ALERT_THRESHOLD: usize = 5;

// =============================================================================
// VIEWS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyStats {
    pub total_employees: usize,
    pub present_today: usize,
    pub late_today: usize,
    pub on_leave: usize,
    pub absent_today: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub present: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentStats {
    pub department: String,
    pub total: usize,
    pub present: usize,
    /// Whole percent, rounded half up.
    pub attendance_rate: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingApprovals {
    pub count: usize,
    pub requests: Vec<LeaveWithUser>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub level: AlertLevel,
    pub title: String,
    pub message: String,
    pub count: usize,
}

fn rate_percent(present: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let p = present as u64;
    let t = total as u64;
    (p.saturating_mul(200).saturating_add(t) / t.saturating_mul(2)) as u32
}

// =============================================================================
// DASHBOARDS
// =============================================================================

impl Portal {
    /// Today's headcount figures.
    pub fn company_stats(&self, actor: &Actor) -> Result<CompanyStats> {
        rbac::require(actor.role, rbac::SECURITY)?;
        let today = self.today();
        self.store.read(|txn| {
            let total_employees = txn
                .users()?
                .iter()
                .filter(|u| !u.role.is_system())
                .count();
            let rows = txn.attendance_on(today)?;
            let present_today = rows.iter().filter(|r| r.status.is_attended()).count();
            let late_today = rows.iter().filter(|r| r.status == AttendanceStatus::Late).count();
            let on_leave = txn
                .leaves()?
                .iter()
                .filter(|l| l.status == ReviewStatus::Approved && l.covers(today))
                .map(|l| l.user_id)
                .collect::<HashSet<_>>()
                .len();
            Ok(CompanyStats {
                total_employees,
                present_today,
                late_today,
                on_leave,
                absent_today: total_employees
                    .saturating_sub(present_today)
                    .saturating_sub(on_leave),
            })
        })
    }

    /// Attended rows per day for the last `days` days, oldest first, ending today.
    pub fn attendance_trends(&self, actor: &Actor, days: Option<u32>) -> Result<Vec<TrendPoint>> {
        rbac::require(actor.role, rbac::SECURITY)?;
        let days = days.unwrap_or(DEFAULT_TREND_DAYS);
        if !(1..=MAX_TREND_DAYS).contains(&days) {
            return Err(PortalError::invalid(format!("days must be between 1 and {MAX_TREND_DAYS}")));
        }
        let today = self.today();
        let from = today
            .checked_sub_days(Days::new(u64::from(days - 1)))
            .ok_or_else(|| PortalError::invalid("days out of range"))?;
        let rows = self.store.read(|txn| txn.attendance_between(from, today))?;

        let mut counts: BTreeMap<NaiveDate, usize> = from
            .iter_days()
            .take(days as usize)
            .map(|d| (d, 0))
            .collect();
        for row in rows.iter().filter(|r| r.status.is_attended()) {
            if let Some(c) = counts.get_mut(&row.date) {
                *c += 1;
            }
        }
        Ok(counts
            .into_iter()
            .map(|(date, present)| TrendPoint { date, present })
            .collect())
    }

    /// Per-department headcount and today's attendance, best rate first.
    pub fn department_stats(&self, actor: &Actor) -> Result<Vec<DepartmentStats>> {
        rbac::require(actor.role, rbac::SECURITY)?;
        let today = self.today();
        self.store.read(|txn| {
            let attended: HashSet<UserId> = txn
                .attendance_on(today)?
                .into_iter()
                .filter(|r| r.status.is_attended())
                .map(|r| r.user_id)
                .collect();

            let mut groups: BTreeMap<String, (usize, usize)> = BTreeMap::new();
            for user in txn.users()?.into_iter().filter(|u| u.is_active) {
                let name = user
                    .profile
                    .department
                    .clone()
                    .unwrap_or_else(|| "Unassigned".to_string());
                let entry = groups.entry(name).or_default();
                entry.0 += 1;
                if attended.contains(&user.id) {
                    entry.1 += 1;
                }
            }

            let mut stats: Vec<DepartmentStats> = groups
                .into_iter()
                .map(|(department, (total, present))| DepartmentStats {
                    department,
                    total,
                    present,
                    attendance_rate: rate_percent(present, total),
                })
                .collect();
            stats.sort_by(|a, b| {
                b.attendance_rate
                    .cmp(&a.attendance_rate)
                    .then_with(|| a.department.cmp(&b.department))
            });
            Ok(stats)
        })
    }

    /// Pending leave count plus the oldest few requests.
    pub fn pending_approvals(&self, actor: &Actor, limit: Option<usize>) -> Result<PendingApprovals> {
        rbac::require(actor.role, rbac::SECURITY)?;
        let limit = limit.unwrap_or(DEFAULT_PENDING_LIMIT);
        if !(1..=MAX_PENDING_LIMIT).contains(&limit) {
            return Err(PortalError::invalid(format!(
                "limit must be between 1 and {MAX_PENDING_LIMIT}"
            )));
        }
        let pending = self.store.read(|txn| {
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
                .collect::<Vec<_>>())
        })?;
        Ok(PendingApprovals {
            count: pending.len(),
            requests: pending.into_iter().take(limit).collect(),
        })
    }

    /// Conditions worth an administrator's attention.
    pub fn alerts(&self, actor: &Actor) -> Result<Vec<Alert>> {
        rbac::require(actor.role, rbac::SECURITY)?;
        let today = self.today();
        let since = today
            .checked_sub_days(Days::new(ABSENCE_WINDOW_DAYS))
            .unwrap_or(today);
        self.store.read(|txn| {
            let seen: HashSet<UserId> = txn
                .attendance_between(since, today)?
                .into_iter()
                .filter(|r| r.status.is_attended())
                .map(|r| r.user_id)
                .collect();
            let absent = txn
                .users()?
                .iter()
                .filter(|u| u.is_active && !u.role.is_system() && !seen.contains(&u.id))
                .count();
            let pending = txn
                .leaves()?
                .iter()
                .filter(|l| l.status == ReviewStatus::Pending)
                .count();

            let mut alerts = Vec::new();
            if absent > 0 {
                alerts.push(Alert {
                    level: AlertLevel::Warning,
                    title: "Extended Absences".to_string(),
                    message: format!(
                        "{absent} employee(s) have not checked in for {ABSENCE_WINDOW_DAYS}+ days"
                    ),
                    count: absent,
                });
            }
            if pending > PENDING_ALERT_THRESHOLD {
                alerts.push(Alert {
                    level: AlertLevel::Info,
                    title: "Pending Approvals".to_string(),
                    message: format!("{pending} leave requests awaiting approval"),
                    count: pending,
                });
            }
            Ok(alerts)
        })
    }

    /// A user's recent logins and logouts, newest first.
    pub fn user_activity(&self, actor: &Actor, user: UserId) -> Result<Vec<AuditEntry>> {
        rbac::require(actor.role, rbac::EXECUTIVE)?;
        self.store.read(|txn| {
            let summary = require_user(txn, user)?.summary();
            Ok(txn
                .audit_logs()?
                .into_iter()
                .rev()
                .filter(|l| {
                    l.user_id == Some(user) && matches!(l.action, AuditAction::Login | AuditAction::Logout)
                })
                .take(ACTIVITY_LIMIT)
                .map(|l| audit::to_entry(l, Some(summary.clone())))
                .collect())
        })
    }
}

// =============================================================================
// PASSWORD RESET REVIEWS
// =============================================================================

const REQUEST_GONE: &str = "Request not found or already processed";

impl Portal {
    /// Pending password reset requests, oldest first.
    pub fn pending_password_requests(&self, actor: &Actor) -> Result<Vec<PasswordRequestView>> {
        rbac::require(actor.role, rbac::SECURITY)?;
        self.store.read(|txn| {
            let users = user_index(txn)?;
            let mut pending: Vec<_> = txn
                .password_requests()?
                .into_iter()
                .filter(|r| r.status == ReviewStatus::Pending)
                .collect();
            pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
            Ok(pending
                .into_iter()
                .map(|r| PasswordRequestView {
                    id: r.id,
                    user_id: r.user_id,
                    status: r.status,
                    decided_by: r.decided_by,
                    created_at: r.created_at,
                    user: users.get(&r.user_id).map(|u| u.summary()),
                })
                .collect())
        })
    }

    /// Apply the requested password and mark the request approved, atomically.
    pub fn approve_password_request(&self, actor: &Actor, id: u64, client: &ClientInfo) -> Result<()> {
        rbac::require(actor.role, rbac::SECURITY)?;
        let now = self.now();
        self.store.write(|txn| {
            let mut request = txn
                .password_request(id)?
                .filter(|r| r.status == ReviewStatus::Pending)
                .ok_or_else(|| PortalError::conflict(REQUEST_GONE))?;
            let mut user = require_user(txn, request.user_id)?;
            user.password_hash.clone_from(&request.new_password_hash);
            txn.put_user(&user)?;

            request.status = ReviewStatus::Approved;
            request.decided_by = Some(actor.user_id);
            txn.put_password_request(&request)?;

            audit::append(
                txn,
                now,
                AuditEvent::new(AuditAction::Update, "User")
                    .by(actor.user_id)
                    .target(user.id)
                    .details(serde_json::json!({
                        "message": "Password reset approved via request",
                        "requestId": id,
                    }))
                    .client(client),
            )?;
            Ok(())
        })
    }

    pub fn reject_password_request(&self, actor: &Actor, id: u64, client: &ClientInfo) -> Result<()> {
        rbac::require(actor.role, rbac::SECURITY)?;
        let now = self.now();
        self.store.write(|txn| {
            let mut request = txn
                .password_request(id)?
                .filter(|r| r.status == ReviewStatus::Pending)
                .ok_or_else(|| PortalError::conflict(REQUEST_GONE))?;
            request.status = ReviewStatus::Rejected;
            request.decided_by = Some(actor.user_id);
            txn.put_password_request(&request)?;
            audit::append(
                txn,
                now,
                AuditEvent::new(AuditAction::Update, "PasswordResetRequest")
                    .by(actor.user_id)
                    .target(id)
                    .details(serde_json::json!({ "status": ReviewStatus::Rejected }))
                    .client(client),
            )?;
            Ok(())
        })
    }

    /// Wipe attendance, breaks, leave, payslips and password requests. Users,
    /// settings, holidays, announcements and the audit trail survive.
    pub fn reset_data(&self, actor: &Actor, client: &ClientInfo) -> Result<()> {
        rbac::require(actor.role, rbac::EXECUTIVE)?;
        let now = self.now();
        self.store.write(|txn| {
            txn.clear_activity()?;
            audit::append(
                txn,
                now,
                AuditEvent::new(AuditAction::Delete, "System")
                    .by(actor.user_id)
                    .target("ALL")
                    .details(serde_json::json!({
                        "message": "SYSTEM RESET PERFORMED. All attendance and leave data wiped.",
                    }))
                    .client(client),
            )?;
            Ok(())
        })
    }
}
