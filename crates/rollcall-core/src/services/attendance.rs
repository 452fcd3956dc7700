//! # Attendance
//!
//! The daily check-in/check-out cycle and the administrative views over it.
//!
//! ## Row lifecycle
//!
//! ```text
//! (none) --check_in--> PRESENT | LATE --check_out--> PRESENT | LATE | HALF_DAY
//!                          \                              /
//!                           `-------- override ----------'   (is_finalized = true)
//! ```
//!
//! One row exists per user per UTC day. The existence check and the insert
//! share a write transaction, and the `(user, day)` table key makes a second
//! row for the same day impossible.
//!
//! Status classification:
//! - LATE when the check-in is later than work start plus the late threshold.
//! - HALF_DAY at check-out when worked time minus breaks is under the
//!   half-day threshold. Finalized rows are never reclassified.

use crate::calendar::{self, parse_hhmm};
use crate::error::{PortalError, Result};
use crate::model::{
    Attendance, AttendanceStatus, AttendanceWithUser, AuditAction, ClientInfo, DailyEntry,
    SystemSettings, UserId,
};
use crate::portal::{Actor, Portal};
use crate::rbac;
use crate::services::audit::{self, AuditEvent};
use crate::services::{require_user, user_index};
use crate::store::{Mutations, Records};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_HISTORY_LIMIT: usize = 30;

pub const CSV_HEADER: [&str; 8] = [
    "Employee ID",
    "Name",
    "Department",
    "Date",
    "Check In",
    "Check Out",
    "Status",
    "Email",
];

// =============================================================================
// INPUTS & OUTPUTS
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckOutInput {
    #[serde(default)]
    pub notes: Option<String>,
}

/// Today's row for the caller plus the settings used to classify it.
#[derive(Debug, Clone, Serialize)]
pub struct TodayStatus {
    pub attendance: Option<Attendance>,
    pub config: SystemSettings,
}

/// An administrator's correction of one user's day.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideInput {
    pub user_id: UserId,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub check_in: Option<DateTime<Utc>>,
    #[serde(default)]
    pub check_out: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkEntry {
    pub user_id: UserId,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkInput {
    pub date: NaiveDate,
    pub updates: Vec<BulkEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOutcome {
    pub user_id: UserId,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Whether a check-in at `at` is past work start plus the late threshold.
/// Unparsable work start times never make anyone late.
pub fn is_late(settings: &SystemSettings, at: DateTime<Utc>) -> bool {
    let Ok(start) = parse_hhmm(&settings.work_start_time) else {
        return false;
    };
    let (cutoff, wrapped) =
        start.overflowing_add_signed(chrono::Duration::minutes(i64::from(settings.late_threshold)));
    // A cutoff that wraps past midnight cannot be exceeded on the same day.
    if wrapped != 0 {
        return false;
    }
    at.time() > cutoff
}

/// Minutes worked between check-in and `until`, net of breaks.
pub fn worked_minutes(row: &Attendance, until: DateTime<Utc>) -> i64 {
    let Some(check_in) = row.check_in else {
        return 0;
    };
    let gross = (until - check_in).num_minutes().max(0);
    gross.saturating_sub(row.break_minutes()).max(0)
}

fn close_open_break(row: &mut Attendance, now: DateTime<Utc>) {
    for b in row.breaks.iter_mut().filter(|b| b.is_open()) {
        b.end_time = Some(now);
        b.duration_mins = Some((now - b.start_time).num_minutes().max(0));
    }
}

fn upsert_finalized(
    existing: Option<Attendance>,
    id: impl FnOnce() -> Result<u64>,
    user_id: UserId,
    date: NaiveDate,
    status: AttendanceStatus,
) -> Result<Attendance> {
    Ok(match existing {
        Some(mut row) => {
            row.status = status;
            row.is_finalized = true;
            row
        }
        None => Attendance {
            id: id()?,
            user_id,
            date,
            check_in: None,
            check_out: None,
            status,
            is_finalized: true,
            notes: None,
            breaks: Vec::new(),
        },
    })
}

// =============================================================================
// OPERATIONS
// =============================================================================

impl Portal {
    /// Open today's row for the caller.
    pub fn check_in(&self, actor: &Actor) -> Result<Attendance> {
        let now = self.now();
        let today = now.date_naive();
        self.store.write(|txn| {
            if txn.attendance(actor.user_id, today)?.is_some() {
                return Err(PortalError::conflict("Already checked in for today"));
            }
            let settings = txn.settings()?;
            let status = if is_late(&settings, now) {
                AttendanceStatus::Late
            } else {
                AttendanceStatus::Present
            };
            let row = Attendance {
                id: txn.next_id("attendance")?,
                user_id: actor.user_id,
                date: today,
                check_in: Some(now),
                check_out: None,
                status,
                is_finalized: false,
                notes: None,
                breaks: Vec::new(),
            };
            txn.put_attendance(&row)?;
            Ok(row)
        })
    }

    /// Close today's row for the caller.
    pub fn check_out(&self, actor: &Actor, input: CheckOutInput) -> Result<Attendance> {
        let now = self.now();
        let today = now.date_naive();
        self.store.write(|txn| {
            let mut row = txn
                .attendance(actor.user_id, today)?
                .ok_or_else(|| PortalError::not_found("No check-in record found for today"))?;
            if row.check_out.is_some() {
                return Err(PortalError::conflict("Already checked out for today"));
            }
            close_open_break(&mut row, now);
            row.check_out = Some(now);
            if let Some(notes) = input.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
                row.notes = Some(notes);
            }

            let settings = txn.settings()?;
            let full_day = i64::from(settings.half_day_threshold).saturating_mul(60);
            if !row.is_finalized
                && matches!(row.status, AttendanceStatus::Present | AttendanceStatus::Late)
                && worked_minutes(&row, now) < full_day
            {
                row.status = AttendanceStatus::HalfDay;
            }
            txn.put_attendance(&row)?;
            Ok(row)
        })
    }

    pub fn attendance_today(&self, actor: &Actor) -> Result<TodayStatus> {
        let today = self.today();
        self.store.read(|txn| {
            Ok(TodayStatus {
                attendance: txn.attendance(actor.user_id, today)?,
                config: txn.settings()?,
            })
        })
    }

    /// The caller's most recent rows, newest first.
    pub fn attendance_history(&self, actor: &Actor, limit: Option<usize>) -> Result<Vec<Attendance>> {
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, 366);
        self.store.read(|txn| txn.user_attendance_recent(actor.user_id, limit))
    }

    /// Every row in the month, by date, joined with its user.
    pub fn monthly_report(&self, actor: &Actor, month: u32, year: i32) -> Result<Vec<AttendanceWithUser>> {
        rbac::require(actor.role, rbac::SECURITY)?;
        let (from, to) = calendar::month_bounds(year, month)?;
        self.store.read(|txn| {
            let users = user_index(txn)?;
            Ok(txn
                .attendance_between(from, to)?
                .into_iter()
                .map(|attendance| {
                    let user = users.get(&attendance.user_id).map(|u| u.summary());
                    AttendanceWithUser { attendance, user }
                })
                .collect())
        })
    }

    /// One user's rows in the month. Users may read their own; reading
    /// someone else's needs a security role.
    pub fn user_monthly_report(
        &self,
        actor: &Actor,
        user: Option<UserId>,
        month: u32,
        year: i32,
    ) -> Result<Vec<Attendance>> {
        let target = user.unwrap_or(actor.user_id);
        if target != actor.user_id {
            rbac::require(actor.role, rbac::SECURITY)?;
        }
        let (from, to) = calendar::month_bounds(year, month)?;
        self.store.read(|txn| txn.user_attendance_between(target, from, to))
    }

    /// Set a user's status for a day, creating the row if needed. The row is
    /// finalized and check-in/out are replaced with the given values.
    pub fn override_attendance(
        &self,
        actor: &Actor,
        input: OverrideInput,
        client: &ClientInfo,
    ) -> Result<Attendance> {
        rbac::require(actor.role, rbac::EXECUTIVE)?;
        if matches!((input.check_in, input.check_out), (Some(i), Some(o)) if o < i) {
            return Err(PortalError::invalid("Check-out cannot be before check-in"));
        }
        let now = self.now();
        self.store.write(|txn| {
            require_user(txn, input.user_id)?;
            let existing = txn.attendance(input.user_id, input.date)?;
            let mut row = upsert_finalized(
                existing,
                || txn.next_id("attendance"),
                input.user_id,
                input.date,
                input.status,
            )?;
            row.check_in = input.check_in;
            row.check_out = input.check_out;
            txn.put_attendance(&row)?;

            audit::append(
                txn,
                now,
                AuditEvent::new(AuditAction::Override, "Attendance")
                    .by(actor.user_id)
                    .target(row.id)
                    .details(serde_json::json!({
                        "targetUserId": input.user_id,
                        "date": input.date,
                        "status": input.status,
                        "checkIn": input.check_in,
                        "checkOut": input.check_out,
                    }))
                    .client(client),
            )?;
            Ok(row)
        })
    }

    /// Every active user with their row for `date`, by first name.
    pub fn daily_attendance(&self, actor: &Actor, date: NaiveDate) -> Result<Vec<DailyEntry>> {
        rbac::require(actor.role, rbac::SECURITY)?;
        self.store.read(|txn| {
            let rows = txn.attendance_on(date)?;
            let mut users: Vec<_> = txn.users()?.into_iter().filter(|u| u.is_active).collect();
            users.sort_by(|a, b| {
                a.profile
                    .first_name
                    .to_lowercase()
                    .cmp(&b.profile.first_name.to_lowercase())
                    .then(a.id.cmp(&b.id))
            });
            Ok(users
                .into_iter()
                .map(|u| DailyEntry {
                    attendance: rows.iter().find(|r| r.user_id == u.id).cloned(),
                    user: u.summary(),
                })
                .collect())
        })
    }

    /// Set many users' status for one day. Unknown users are reported as
    /// failures without affecting the others; one audit entry covers the batch.
    pub fn bulk_attendance(&self, actor: &Actor, input: BulkInput, client: &ClientInfo) -> Result<Vec<BulkOutcome>> {
        rbac::require(actor.role, rbac::EXECUTIVE)?;
        let now = self.now();
        self.store.write(|txn| {
            let mut outcomes = Vec::with_capacity(input.updates.len());
            for entry in &input.updates {
                if txn.user(entry.user_id)?.is_none() {
                    outcomes.push(BulkOutcome {
                        user_id: entry.user_id,
                        success: false,
                        id: None,
                    });
                    continue;
                }
                let existing = txn.attendance(entry.user_id, input.date)?;
                let row = upsert_finalized(
                    existing,
                    || txn.next_id("attendance"),
                    entry.user_id,
                    input.date,
                    entry.status,
                )?;
                txn.put_attendance(&row)?;
                outcomes.push(BulkOutcome {
                    user_id: entry.user_id,
                    success: true,
                    id: Some(row.id),
                });
            }

            if let Some(first) = input.updates.first() {
                audit::append(
                    txn,
                    now,
                    AuditEvent::new(AuditAction::Update, "Attendance")
                        .by(actor.user_id)
                        .details(serde_json::json!({
                            "operation": "BULK_UPDATE",
                            "date": input.date,
                            "count": input.updates.len(),
                            "firstId": first.user_id,
                        }))
                        .client(client),
                )?;
            }
            Ok(outcomes)
        })
    }

    /// The month's rows as CSV, one record per row, header first.
    pub fn export_attendance_csv(&self, actor: &Actor, month: u32, year: i32) -> Result<String> {
        let rows = self.monthly_report(actor, month, year)?;
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(CSV_HEADER)?;
        for AttendanceWithUser { attendance, user } in rows {
            let time = |t: Option<DateTime<Utc>>| {
                t.map(|t| t.format("%H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".into())
            };
            let (emp_id, name, dept, email) = match user {
                Some(u) => (
                    u.employee_id,
                    format!("{} {}", u.first_name, u.last_name),
                    u.department.unwrap_or_else(|| "-".to_string()),
                    u.email,
                ),
                None => ("-".into(), "Unknown".into(), "-".into(), "-".into()),
            };
            wtr.write_record([
                emp_id,
                name,
                dept,
                attendance.date.format("%Y-%m-%d").to_string(),
                time(attendance.check_in),
                time(attendance.check_out),
                attendance.status.as_str().to_string(),
                email,
            ])?;
        }
        let buf = wtr
            .into_inner()
            .map_err(|e| PortalError::Encoding(e.error().to_string()))?;
        String::from_utf8(buf).map_err(|e| PortalError::Encoding(e.to_string()))
    }
}
