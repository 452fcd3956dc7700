//! # Payroll
//!
//! Monthly payslips derived from attendance and approved leave.
//!
//! ## Computation
//!
//! All quantities are integers: money in cents, days in half-day units.
//!
//! ```text
//! present  = 2 * (PRESENT + LATE) + 1 * HALF_DAY          (halves)
//! leave    = days of approved leave inside the month
//! absent   = max(0, 2 * days_in_month - present - 2 * leave)  (halves)
//! deduct   = base * absent / 60                            (base / 30 per day)
//! net      = max(0, base - deduct)
//! ```
//!
//! Calendar days are used throughout, weekends included. Leave ranges that
//! cross a month boundary contribute only their days inside the month.

use crate::calendar::{self, overlap_days};
use crate::error::{PortalError, Result};
use crate::model::{
    Attendance, AttendanceStatus, AuditAction, ClientInfo, LeaveRequest, Payslip, ReviewStatus, UserId,
};
use crate::portal::{Actor, Portal};
use crate::rbac;
use crate::services::audit::{self, AuditEvent};
use crate::store::{Mutations, Records};
use chrono::NaiveDate;
use serde::Deserialize;

/// Salary is pro-rated over a fixed 30-day month.
pub const PRORATION_DAYS: i64 = 30;

/// Figures for one payslip, before they are stamped and stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayrollFigures {
    pub total_days: u32,
    pub present_halves: u32,
    pub leave_days: u32,
    pub absent_halves: u32,
    pub deductions_cents: i64,
    pub net_pay_cents: i64,
}

/// Half-day units credited for one attendance status.
#[must_use]
pub fn credited_halves(status: AttendanceStatus) -> u32 {
    match status {
        AttendanceStatus::Present | AttendanceStatus::Late => 2,
        AttendanceStatus::HalfDay => 1,
        AttendanceStatus::Absent | AttendanceStatus::OnLeave => 0,
    }
}

/// Days of approved leave falling inside `[from, to]`.
#[must_use]
pub fn leave_days_within(leaves: &[LeaveRequest], from: NaiveDate, to: NaiveDate) -> u32 {
    leaves
        .iter()
        .filter(|l| l.status == ReviewStatus::Approved)
        .map(|l| overlap_days(l.start_date, l.end_date, from, to))
        .fold(0u32, u32::saturating_add)
}

/// Pure payroll arithmetic.
#[must_use]
pub fn compute(
    base_salary_cents: i64,
    total_days: u32,
    statuses: impl IntoIterator<Item = AttendanceStatus>,
    leave_days: u32,
) -> PayrollFigures {
    let base = base_salary_cents.max(0);
    let present_halves = statuses
        .into_iter()
        .map(credited_halves)
        .fold(0u32, u32::saturating_add);
    let absent_halves = total_days
        .saturating_mul(2)
        .saturating_sub(present_halves)
        .saturating_sub(leave_days.saturating_mul(2));

    let deductions = i128::from(base) * i128::from(absent_halves) / i128::from(PRORATION_DAYS * 2);
    let deductions_cents = i64::try_from(deductions).unwrap_or(i64::MAX);
    PayrollFigures {
        total_days,
        present_halves,
        leave_days,
        absent_halves,
        deductions_cents,
        net_pay_cents: base.saturating_sub(deductions_cents).max(0),
    }
}

fn statuses_of(rows: &[Attendance]) -> impl Iterator<Item = AttendanceStatus> + '_ {
    rows.iter().map(|r| r.status)
}

#[derive(Debug, Clone, Deserialize)]
pub struct PeriodInput {
    pub month: u32,
    pub year: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayslipQuery {
    pub month: u32,
    pub year: i32,
    #[serde(default)]
    pub user_id: Option<UserId>,
}

impl Portal {
    /// Compute and store `user`'s payslip for the month, replacing any
    /// earlier one for the same month.
    pub fn generate_payslip(
        &self,
        actor: &Actor,
        user: UserId,
        period: PeriodInput,
        client: &ClientInfo,
    ) -> Result<Payslip> {
        rbac::require(actor.role, rbac::HR)?;
        let (from, to) = calendar::month_bounds(period.year, period.month)?;
        let now = self.now();
        self.store.write(|txn| {
            let employee = txn
                .user(user)?
                .ok_or_else(|| PortalError::not_found("Employee profile not found"))?;
            let rows = txn.user_attendance_between(user, from, to)?;
            let leaves: Vec<_> = txn.leaves()?.into_iter().filter(|l| l.user_id == user).collect();

            let figures = compute(
                employee.profile.base_salary_cents,
                calendar::days_inclusive(from, to),
                statuses_of(&rows),
                leave_days_within(&leaves, from, to),
            );
            let replaced = txn.payslip(user, period.year, period.month)?.is_some();
            let slip = Payslip {
                user_id: user,
                month: period.month,
                year: period.year,
                total_days: figures.total_days,
                present_halves: figures.present_halves,
                leave_days: figures.leave_days,
                absent_halves: figures.absent_halves,
                salary_cents: employee.profile.base_salary_cents,
                deductions_cents: figures.deductions_cents,
                net_pay_cents: figures.net_pay_cents,
                generated_at: now,
                generated_by: actor.user_id,
            };
            txn.put_payslip(&slip)?;
            audit::append(
                txn,
                now,
                AuditEvent::new(
                    if replaced { AuditAction::Update } else { AuditAction::Create },
                    "Payslip",
                )
                .by(actor.user_id)
                .target(format!("{user}:{}-{:02}", period.year, period.month))
                .details(serde_json::json!({ "netPayCents": slip.net_pay_cents }))
                .client(client),
            )?;
            Ok(slip)
        })
    }

    /// A stored payslip. Anyone may read their own; HR roles may read others'.
    pub fn payslip(&self, actor: &Actor, query: PayslipQuery) -> Result<Payslip> {
        let target = query.user_id.unwrap_or(actor.user_id);
        if target != actor.user_id {
            rbac::require(actor.role, rbac::HR)?;
        }
        calendar::month_bounds(query.year, query.month)?;
        self.store
            .read(|txn| txn.payslip(target, query.year, query.month))?
            .ok_or_else(|| PortalError::not_found("Payslip not found"))
    }
}
