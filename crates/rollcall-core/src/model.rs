//! # Domain Model
//!
//! Records persisted by the store and the views handed to callers.
//!
//! Stored records are encoded with postcard, so they avoid serde features
//! that need a self-describing format (`skip_serializing_if`, `flatten`,
//! untagged enums, `serde_json::Value`). Anything that must be hidden from
//! API callers (password hashes) or joined from several tables is exposed
//! through a separate view type instead.

use crate::rbac::FeatureKey;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// ROLES
// =============================================================================

/// Account role. Ordering carries no meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    SystemAdmin,
    Ceo,
    Hr,
    Employee,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::SuperAdmin,
        Role::SystemAdmin,
        Role::Ceo,
        Role::Hr,
        Role::Employee,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::SystemAdmin => "SYSTEM_ADMIN",
            Role::Ceo => "CEO",
            Role::Hr => "HR",
            Role::Employee => "EMPLOYEE",
        }
    }

    /// System accounts are excluded from head counts.
    #[must_use]
    pub fn is_system(self) -> bool {
        matches!(self, Role::SuperAdmin | Role::SystemAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown role: {s}"))
    }
}

// =============================================================================
// USERS
// =============================================================================

/// HR profile attached to every account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeProfile {
    pub first_name: String,
    pub last_name: String,
    pub employee_id: String,
    pub department: Option<String>,
    pub designation: Option<String>,
    /// Monthly base salary in minor currency units.
    pub base_salary_cents: i64,
}

impl EmployeeProfile {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Stored user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub feature_overrides: BTreeMap<FeatureKey, bool>,
    pub profile: EmployeeProfile,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// The account as seen by API callers (no password hash).
    #[must_use]
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            email: self.email.clone(),
            role: self.role,
            is_active: self.is_active,
            feature_overrides: self.feature_overrides.clone(),
            employee_profile: self.profile.clone(),
            created_at: self.created_at,
        }
    }

    #[must_use]
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            email: self.email.clone(),
            role: self.role,
            first_name: self.profile.first_name.clone(),
            last_name: self.profile.last_name.clone(),
            department: self.profile.department.clone(),
            employee_id: self.profile.employee_id.clone(),
        }
    }
}

/// Account view without credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: UserId,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub feature_overrides: BTreeMap<FeatureKey, bool>,
    pub employee_profile: EmployeeProfile,
    pub created_at: DateTime<Utc>,
}

/// Compact user reference embedded in joined listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    pub email: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub department: Option<String>,
    pub employee_id: String,
}

// =============================================================================
// ATTENDANCE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
    HalfDay,
    Late,
    OnLeave,
}

impl AttendanceStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Present => "PRESENT",
            Self::Absent => "ABSENT",
            Self::HalfDay => "HALF_DAY",
            Self::Late => "LATE",
            Self::OnLeave => "ON_LEAVE",
        }
    }

    /// Whether the day counts as attended on dashboards.
    #[must_use]
    pub fn is_attended(self) -> bool {
        matches!(self, Self::Present | Self::Late | Self::HalfDay)
    }
}

/// A break taken during an attendance day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Break {
    pub id: u64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_mins: Option<i64>,
}

impl Break {
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }
}

/// One row per user per calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    pub id: u64,
    pub user_id: UserId,
    pub date: NaiveDate,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
    pub is_finalized: bool,
    pub notes: Option<String>,
    pub breaks: Vec<Break>,
}

impl Attendance {
    #[must_use]
    pub fn open_break(&self) -> Option<&Break> {
        self.breaks.iter().find(|b| b.is_open())
    }

    /// Total closed break time in minutes.
    #[must_use]
    pub fn break_minutes(&self) -> i64 {
        self.breaks.iter().filter_map(|b| b.duration_mins).sum()
    }
}

/// Attendance row joined with its owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceWithUser {
    #[serde(flatten)]
    pub attendance: Attendance,
    pub user: Option<UserSummary>,
}

/// A user and their row for one day, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyEntry {
    pub user: UserSummary,
    pub attendance: Option<Attendance>,
}

// =============================================================================
// REVIEWED REQUESTS (leave, password reset)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

/// Decision an approver may take on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approved,
    Rejected,
}

impl From<Decision> for ReviewStatus {
    fn from(d: Decision) -> Self {
        match d {
            Decision::Approved => ReviewStatus::Approved,
            Decision::Rejected => ReviewStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    pub id: u64,
    pub user_id: UserId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub status: ReviewStatus,
    pub approved_by: Option<UserId>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LeaveRequest {
    /// Inclusive range overlap.
    #[must_use]
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && self.end_date >= start
    }

    #[must_use]
    pub fn covers(&self, day: NaiveDate) -> bool {
        self.start_date <= day && day <= self.end_date
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveWithUser {
    #[serde(flatten)]
    pub leave: LeaveRequest,
    pub user: Option<UserSummary>,
}

/// Stored password reset request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordResetRequest {
    pub id: u64,
    pub user_id: UserId,
    pub new_password_hash: String,
    pub status: ReviewStatus,
    pub decided_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// Password reset request as shown to reviewers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordRequestView {
    pub id: u64,
    pub user_id: UserId,
    pub status: ReviewStatus,
    pub decided_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub user: Option<UserSummary>,
}

// =============================================================================
// PAYROLL
// =============================================================================

/// Monthly payslip. Day counts that can be fractional are kept in half days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payslip {
    pub user_id: UserId,
    pub month: u32,
    pub year: i32,
    pub total_days: u32,
    pub present_halves: u32,
    pub leave_days: u32,
    pub absent_halves: u32,
    pub salary_cents: i64,
    pub deductions_cents: i64,
    pub net_pay_cents: i64,
    pub generated_at: DateTime<Utc>,
    pub generated_by: UserId,
}

// =============================================================================
// AUDIT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Login,
    Logout,
    Create,
    Update,
    Delete,
    Override,
}

/// Stored audit record. `details` holds a JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: u64,
    pub user_id: Option<UserId>,
    pub action: AuditAction,
    pub resource: String,
    pub resource_id: Option<String>,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Audit record as returned by queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: u64,
    pub user_id: Option<UserId>,
    pub action: AuditAction,
    pub resource: String,
    pub resource_id: Option<String>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub user: Option<UserSummary>,
}

// =============================================================================
// SESSIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: u64,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub is_valid: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionWithUser {
    #[serde(flatten)]
    pub session: Session,
    pub user: Option<UserSummary>,
}

/// Request metadata recorded with sessions and audit entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

// =============================================================================
// CALENDAR & NOTICES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holiday {
    pub id: u64,
    pub date: NaiveDate,
    pub name: String,
    pub description: Option<String>,
    pub is_optional: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnouncementKind {
    Info,
    Warning,
    Success,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: u64,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: AnnouncementKind,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_by: UserId,
}

impl Announcement {
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|exp| exp > now)
    }
}

// =============================================================================
// SETTINGS
// =============================================================================

/// Company-wide working-time configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSettings {
    pub company_name: String,
    /// `HH:MM`, UTC.
    pub work_start_time: String,
    /// `HH:MM`, UTC.
    pub work_end_time: String,
    /// Minutes after work start before a check-in counts as late.
    pub late_threshold: u32,
    /// Minimum worked hours for a full day.
    pub half_day_threshold: u32,
    /// Days of week, 0 = Sunday.
    pub working_days: Vec<u8>,
    pub currency: String,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            company_name: "My Company".to_string(),
            work_start_time: "09:00".to_string(),
            work_end_time: "18:00".to_string(),
            late_threshold: 15,
            half_day_threshold: 4,
            working_days: vec![1, 2, 3, 4, 5],
            currency: "USD".to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_its_name() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert!("JANITOR".parse::<Role>().is_err());
    }

    #[test]
    fn role_serializes_screaming_snake() {
        let json = serde_json::to_string(&Role::SuperAdmin).unwrap();
        assert_eq!(json, "\"SUPER_ADMIN\"");
    }

    #[test]
    fn leave_overlap_is_inclusive() {
        let d = |day| NaiveDate::from_ymd_opt(2025, 6, day).unwrap();
        let leave = LeaveRequest {
            id: 1,
            user_id: UserId(1),
            start_date: d(10),
            end_date: d(12),
            reason: "family".into(),
            status: ReviewStatus::Pending,
            approved_by: None,
            rejection_reason: None,
            created_at: Utc::now(),
        };
        assert!(leave.overlaps(d(12), d(14)));
        assert!(leave.overlaps(d(1), d(10)));
        assert!(!leave.overlaps(d(13), d(20)));
        assert!(leave.covers(d(11)));
    }

    #[test]
    fn stored_user_survives_postcard() {
        let user = User {
            id: UserId(7),
            email: "a@b.c".into(),
            password_hash: "h".into(),
            role: Role::Hr,
            is_active: true,
            feature_overrides: BTreeMap::from([(FeatureKey::ManagePayroll, true)]),
            profile: EmployeeProfile {
                first_name: "Ada".into(),
                last_name: "L".into(),
                employee_id: "EMP-7".into(),
                department: None,
                designation: None,
                base_salary_cents: 300_000,
            },
            created_at: Utc::now(),
        };
        let bytes = postcard::to_allocvec(&user).unwrap();
        let back: User = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(back, user);
    }
}
