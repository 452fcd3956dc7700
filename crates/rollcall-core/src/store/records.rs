//! Typed access to the tables.
//!
//! [`Records`] holds every lookup and works on any [`Reader`].
//! [`Mutations`] holds every write and only exists for write transactions.

use super::tables::{
    ANNOUNCEMENTS, ATTENDANCE, ATTENDANCE_BY_DAY, AUDIT, COUNTERS, EMAILS, HOLIDAYS, IdTable, LEAVES,
    PASSWORD_REQUESTS, PAYSLIPS, SESSIONS, SETTINGS, SETTINGS_KEY, USERS,
};
use super::{Reader, StoreCounts};
use crate::error::Result;
use crate::model::{
    Announcement, Attendance, AuditLog, Holiday, LeaveRequest, PasswordResetRequest, Payslip, Session,
    SystemSettings, User, UserId,
};
use chrono::{Datelike, NaiveDate};
use redb::{ReadableTable, ReadableTableMetadata, WriteTransaction};
use serde::Serialize;
use serde::de::DeserializeOwned;

// =============================================================================
// KEYS & ENCODING
// =============================================================================

pub(crate) fn day_key(date: NaiveDate) -> i32 {
    date.num_days_from_ce()
}

fn month_key(year: i32, month: u32) -> i32 {
    year.saturating_mul(100).saturating_add(month as i32)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(postcard::to_allocvec(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(postcard::from_bytes(bytes)?)
}

fn get_by_id<R: Reader, T: DeserializeOwned>(r: &R, def: IdTable, id: u64) -> Result<Option<T>> {
    let table = r.table(def)?;
    let found = table.get(id)?;
    found.map(|guard| decode(guard.value())).transpose()
}

fn all_by_id<R: Reader, T: DeserializeOwned>(r: &R, def: IdTable) -> Result<Vec<T>> {
    let table = r.table(def)?;
    let mut out = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        out.push(decode(value.value())?);
    }
    Ok(out)
}

fn put_by_id<T: Serialize>(txn: &WriteTransaction, def: IdTable, id: u64, value: &T) -> Result<()> {
    let bytes = encode(value)?;
    let mut table = txn.open_table(def)?;
    table.insert(id, bytes.as_slice())?;
    Ok(())
}

fn remove_by_id(txn: &WriteTransaction, def: IdTable, id: u64) -> Result<bool> {
    let mut table = txn.open_table(def)?;
    let removed = table.remove(id)?.is_some();
    Ok(removed)
}

// =============================================================================
// READS
// =============================================================================

/// Typed lookups, available on read and write transactions alike.
pub trait Records: Reader + Sized {
    fn user(&self, id: UserId) -> Result<Option<User>> {
        get_by_id(self, USERS, id.0)
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let id = {
            let emails = self.table(EMAILS)?;
            let found = emails.get(normalize_email(email).as_str())?;
            found.map(|g| g.value())
        };
        match id {
            Some(id) => self.user(UserId(id)),
            None => Ok(None),
        }
    }

    /// All users in creation order.
    fn users(&self) -> Result<Vec<User>> {
        all_by_id(self, USERS)
    }

    fn attendance(&self, user: UserId, date: NaiveDate) -> Result<Option<Attendance>> {
        let table = self.table(ATTENDANCE)?;
        let found = table.get((user.0, day_key(date)))?;
        found.map(|guard| decode(guard.value())).transpose()
    }

    /// One user's rows in `[from, to]`, oldest first.
    fn user_attendance_between(
        &self,
        user: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Attendance>> {
        let mut out = Vec::new();
        if from > to {
            return Ok(out);
        }
        let table = self.table(ATTENDANCE)?;
        for entry in table.range((user.0, day_key(from))..=(user.0, day_key(to)))? {
            let (_, value) = entry?;
            out.push(decode(value.value())?);
        }
        Ok(out)
    }

    /// One user's most recent rows, newest first.
    fn user_attendance_recent(&self, user: UserId, limit: usize) -> Result<Vec<Attendance>> {
        let table = self.table(ATTENDANCE)?;
        let mut out = Vec::new();
        for entry in table
            .range((user.0, i32::MIN)..=(user.0, i32::MAX))?
            .rev()
            .take(limit)
        {
            let (_, value) = entry?;
            out.push(decode(value.value())?);
        }
        Ok(out)
    }

    /// Every row on `date`, ordered by user id.
    fn attendance_on(&self, date: NaiveDate) -> Result<Vec<Attendance>> {
        self.attendance_between(date, date)
    }

    /// Every row in `[from, to]`, ordered by date then user id.
    fn attendance_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Attendance>> {
        let mut out = Vec::new();
        if from > to {
            return Ok(out);
        }
        let index = self.table(ATTENDANCE_BY_DAY)?;
        let rows = self.table(ATTENDANCE)?;
        for entry in index.range((day_key(from), 0u64)..=(day_key(to), u64::MAX))? {
            let (key, _) = entry?;
            let (day, user) = key.value();
            if let Some(guard) = rows.get((user, day))? {
                out.push(decode(guard.value())?);
            }
        }
        Ok(out)
    }

    fn leave(&self, id: u64) -> Result<Option<LeaveRequest>> {
        get_by_id(self, LEAVES, id)
    }

    /// All leave requests in creation order.
    fn leaves(&self) -> Result<Vec<LeaveRequest>> {
        all_by_id(self, LEAVES)
    }

    fn payslip(&self, user: UserId, year: i32, month: u32) -> Result<Option<Payslip>> {
        let table = self.table(PAYSLIPS)?;
        let found = table.get((user.0, month_key(year, month)))?;
        found.map(|guard| decode(guard.value())).transpose()
    }

    /// All audit entries in creation order.
    fn audit_logs(&self) -> Result<Vec<AuditLog>> {
        all_by_id(self, AUDIT)
    }

    fn session(&self, id: u64) -> Result<Option<Session>> {
        get_by_id(self, SESSIONS, id)
    }

    fn sessions(&self) -> Result<Vec<Session>> {
        all_by_id(self, SESSIONS)
    }

    fn password_request(&self, id: u64) -> Result<Option<PasswordResetRequest>> {
        get_by_id(self, PASSWORD_REQUESTS, id)
    }

    fn password_requests(&self) -> Result<Vec<PasswordResetRequest>> {
        all_by_id(self, PASSWORD_REQUESTS)
    }

    fn holidays(&self) -> Result<Vec<Holiday>> {
        all_by_id(self, HOLIDAYS)
    }

    fn announcements(&self) -> Result<Vec<Announcement>> {
        all_by_id(self, ANNOUNCEMENTS)
    }

    /// Stored settings, or the defaults if none were ever saved.
    fn settings(&self) -> Result<SystemSettings> {
        let table = self.table(SETTINGS)?;
        let found = table.get(SETTINGS_KEY)?;
        match found {
            Some(guard) => decode(guard.value()),
            None => Ok(SystemSettings::default()),
        }
    }

    fn counts(&self) -> Result<StoreCounts> {
        Ok(StoreCounts {
            users: self.table(USERS)?.len()?,
            attendance: self.table(ATTENDANCE)?.len()?,
            leaves: self.table(LEAVES)?.len()?,
            payslips: self.table(PAYSLIPS)?.len()?,
            audit_logs: self.table(AUDIT)?.len()?,
            sessions: self.table(SESSIONS)?.len()?,
            holidays: self.table(HOLIDAYS)?.len()?,
            announcements: self.table(ANNOUNCEMENTS)?.len()?,
        })
    }
}

impl<T: Reader> Records for T {}

// =============================================================================
// WRITES
// =============================================================================

/// Writes. Each call opens and releases its tables, so calls compose freely
/// inside one transaction.
pub trait Mutations {
    /// Allocate the next id for `kind`, starting at 1.
    fn next_id(&self, kind: &str) -> Result<u64>;
    fn put_user(&self, user: &User) -> Result<()>;
    fn put_attendance(&self, row: &Attendance) -> Result<()>;
    fn put_leave(&self, leave: &LeaveRequest) -> Result<()>;
    fn put_payslip(&self, slip: &Payslip) -> Result<()>;
    fn put_audit(&self, entry: &AuditLog) -> Result<()>;
    fn put_session(&self, session: &Session) -> Result<()>;
    fn put_password_request(&self, request: &PasswordResetRequest) -> Result<()>;
    fn put_holiday(&self, holiday: &Holiday) -> Result<()>;
    fn remove_holiday(&self, id: u64) -> Result<bool>;
    fn put_announcement(&self, announcement: &Announcement) -> Result<()>;
    fn remove_announcement(&self, id: u64) -> Result<bool>;
    fn put_settings(&self, settings: &SystemSettings) -> Result<()>;
    /// Drop attendance, leave, payslip and password request data.
    fn clear_activity(&self) -> Result<()>;
}

impl Mutations for WriteTransaction {
    fn next_id(&self, kind: &str) -> Result<u64> {
        let mut table = self.open_table(COUNTERS)?;
        let current = table.get(kind)?.map(|g| g.value()).unwrap_or(0);
        let next = current.saturating_add(1);
        table.insert(kind, next)?;
        Ok(next)
    }

    fn put_user(&self, user: &User) -> Result<()> {
        put_by_id(self, USERS, user.id.0, user)?;
        let mut emails = self.open_table(EMAILS)?;
        emails.insert(normalize_email(&user.email).as_str(), user.id.0)?;
        Ok(())
    }

    fn put_attendance(&self, row: &Attendance) -> Result<()> {
        let bytes = encode(row)?;
        let day = day_key(row.date);
        let mut rows = self.open_table(ATTENDANCE)?;
        rows.insert((row.user_id.0, day), bytes.as_slice())?;
        let mut index = self.open_table(ATTENDANCE_BY_DAY)?;
        index.insert((day, row.user_id.0), ())?;
        Ok(())
    }

    fn put_leave(&self, leave: &LeaveRequest) -> Result<()> {
        put_by_id(self, LEAVES, leave.id, leave)
    }

    fn put_payslip(&self, slip: &Payslip) -> Result<()> {
        let bytes = encode(slip)?;
        let mut table = self.open_table(PAYSLIPS)?;
        table.insert((slip.user_id.0, month_key(slip.year, slip.month)), bytes.as_slice())?;
        Ok(())
    }

    fn put_audit(&self, entry: &AuditLog) -> Result<()> {
        put_by_id(self, AUDIT, entry.id, entry)
    }

    fn put_session(&self, session: &Session) -> Result<()> {
        put_by_id(self, SESSIONS, session.id, session)
    }

    fn put_password_request(&self, request: &PasswordResetRequest) -> Result<()> {
        put_by_id(self, PASSWORD_REQUESTS, request.id, request)
    }

    fn put_holiday(&self, holiday: &Holiday) -> Result<()> {
        put_by_id(self, HOLIDAYS, holiday.id, holiday)
    }

    fn remove_holiday(&self, id: u64) -> Result<bool> {
        remove_by_id(self, HOLIDAYS, id)
    }

    fn put_announcement(&self, announcement: &Announcement) -> Result<()> {
        put_by_id(self, ANNOUNCEMENTS, announcement.id, announcement)
    }

    fn remove_announcement(&self, id: u64) -> Result<bool> {
        remove_by_id(self, ANNOUNCEMENTS, id)
    }

    fn put_settings(&self, settings: &SystemSettings) -> Result<()> {
        let bytes = encode(settings)?;
        let mut table = self.open_table(SETTINGS)?;
        table.insert(SETTINGS_KEY, bytes.as_slice())?;
        Ok(())
    }

    fn clear_activity(&self) -> Result<()> {
        self.open_table(ATTENDANCE)?.retain(|_, _| false)?;
        self.open_table(ATTENDANCE_BY_DAY)?.retain(|_, _| false)?;
        self.open_table(LEAVES)?.retain(|_, _| false)?;
        self.open_table(PAYSLIPS)?.retain(|_, _| false)?;
        self.open_table(PASSWORD_REQUESTS)?.retain(|_, _| false)?;
        Ok(())
    }
}
