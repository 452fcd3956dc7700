//! Table layout.
//!
//! Values are postcard-encoded records. Composite keys carry the
//! uniqueness rules: `(user, day)` for attendance and `(user, year*100+month)`
//! for payslips.

use crate::error::Result;
use redb::{TableDefinition, WriteTransaction};

pub(crate) type IdTable = TableDefinition<'static, u64, &'static [u8]>;
pub(crate) type UserDayTable = TableDefinition<'static, (u64, i32), &'static [u8]>;

pub(crate) const USERS: IdTable = TableDefinition::new("users");
pub(crate) const EMAILS: TableDefinition<'static, &'static str, u64> = TableDefinition::new("emails");

/// `(user, day number)` -> attendance row.
pub(crate) const ATTENDANCE: UserDayTable = TableDefinition::new("attendance");
/// `(day number, user)` -> (). Lets per-day scans avoid a full table walk.
pub(crate) const ATTENDANCE_BY_DAY: TableDefinition<'static, (i32, u64), ()> =
    TableDefinition::new("attendance_by_day");

pub(crate) const LEAVES: IdTable = TableDefinition::new("leaves");
/// `(user, year * 100 + month)` -> payslip.
pub(crate) const PAYSLIPS: UserDayTable = TableDefinition::new("payslips");
pub(crate) const AUDIT: IdTable = TableDefinition::new("audit");
pub(crate) const SESSIONS: IdTable = TableDefinition::new("sessions");
pub(crate) const PASSWORD_REQUESTS: IdTable = TableDefinition::new("password_requests");
pub(crate) const HOLIDAYS: IdTable = TableDefinition::new("holidays");
pub(crate) const ANNOUNCEMENTS: IdTable = TableDefinition::new("announcements");
pub(crate) const SETTINGS: TableDefinition<'static, &'static str, &'static [u8]> =
    TableDefinition::new("settings");
pub(crate) const COUNTERS: TableDefinition<'static, &'static str, u64> = TableDefinition::new("counters");

pub(crate) const SETTINGS_KEY: &str = "system";

/// Open every table once so later read transactions never see a missing table.
pub(crate) fn create_all(txn: &WriteTransaction) -> Result<()> {
    for def in [USERS, LEAVES, AUDIT, SESSIONS, PASSWORD_REQUESTS, HOLIDAYS, ANNOUNCEMENTS] {
        txn.open_table(def)?;
    }
    txn.open_table(EMAILS)?;
    txn.open_table(ATTENDANCE)?;
    txn.open_table(ATTENDANCE_BY_DAY)?;
    txn.open_table(PAYSLIPS)?;
    txn.open_table(SETTINGS)?;
    txn.open_table(COUNTERS)?;
    Ok(())
}
