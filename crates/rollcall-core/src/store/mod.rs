//! # Storage Module
//!
//! Durable storage for every portal record, backed by redb.
//!
//! Uses redb embedded database for:
//! - ACID transactions (multi-record updates commit together or not at all)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! The single-writer model is what serializes concurrent check-ins: the
//! existence test and the insert for an attendance row run inside one write
//! transaction, and the `(user, day)` key makes a second row impossible.

mod records;
mod tables;

pub use records::{Mutations, Records};

use crate::error::Result;
use redb::{Database, Key, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition, Value, WriteTransaction};
use std::path::Path;

// =============================================================================
// READER ABSTRACTION
// =============================================================================

/// Anything that can open tables for reading: read and write transactions.
///
/// Typed lookups in [`Records`] are written once against this trait, so a
/// write transaction sees its own uncommitted changes through the same code.
pub trait Reader {
    fn table<K: Key + 'static, V: Value + 'static>(
        &self,
        def: TableDefinition<'_, K, V>,
    ) -> Result<impl ReadableTable<K, V> + '_>;
}

impl Reader for ReadTransaction {
    fn table<K: Key + 'static, V: Value + 'static>(
        &self,
        def: TableDefinition<'_, K, V>,
    ) -> Result<impl ReadableTable<K, V> + '_> {
        Ok(self.open_table(def)?)
    }
}

impl Reader for WriteTransaction {
    fn table<K: Key + 'static, V: Value + 'static>(
        &self,
        def: TableDefinition<'_, K, V>,
    ) -> Result<impl ReadableTable<K, V> + '_> {
        Ok(self.open_table(def)?)
    }
}

// =============================================================================
// STORE
// =============================================================================

/// The portal database.
pub struct Store {
    db: Database,
}

impl Store {
    /// Open the database at `path`, creating the file and tables if needed.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::create(path.as_ref())?;
        let store = Self { db };
        store.ensure_tables()?;
        Ok(store)
    }

    /// Open an existing database. Fails if the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::open(path.as_ref())?;
        let store = Self { db };
        store.ensure_tables()?;
        Ok(store)
    }

    /// Run `f` against a consistent snapshot.
    pub fn read<R>(&self, f: impl FnOnce(&ReadTransaction) -> Result<R>) -> Result<R> {
        let txn = self.db.begin_read()?;
        f(&txn)
    }

    /// Run `f` in a write transaction, committing only if it succeeds.
    pub fn write<R>(&self, f: impl FnOnce(&WriteTransaction) -> Result<R>) -> Result<R> {
        let txn = self.db.begin_write()?;
        let out = f(&txn)?;
        txn.commit()?;
        Ok(out)
    }

    /// Per-table record counts, for status reporting.
    pub fn counts(&self) -> Result<StoreCounts> {
        self.read(|txn| txn.counts())
    }

    fn ensure_tables(&self) -> Result<()> {
        self.write(|txn| tables::create_all(txn))
    }
}

/// Number of records per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreCounts {
    pub users: u64,
    pub attendance: u64,
    pub leaves: u64,
    pub payslips: u64,
    pub audit_logs: u64,
    pub sessions: u64,
    pub holidays: u64,
    pub announcements: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Attendance, AttendanceStatus, UserId};
    use chrono::NaiveDate;

    fn row(id: u64, user: u64, date: NaiveDate) -> Attendance {
        Attendance {
            id,
            user_id: UserId(user),
            date,
            check_in: None,
            check_out: None,
            status: AttendanceStatus::Present,
            is_finalized: false,
            notes: None,
            breaks: Vec::new(),
        }
    }

    #[test]
    fn create_then_open_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portal.redb");
        {
            let store = Store::create(&path).unwrap();
            assert_eq!(store.counts().unwrap(), StoreCounts::default());
        }
        assert!(Store::open(&path).is_ok());
    }

    #[test]
    fn open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Store::open(dir.path().join("missing.redb")).is_err());
    }

    #[test]
    fn failed_write_is_rolled_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::create(dir.path().join("p.redb")).unwrap();
        let day = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();

        let result: Result<()> = store.write(|txn| {
            txn.put_attendance(&row(1, 1, day))?;
            Err(crate::PortalError::conflict("abort"))
        });
        assert!(result.is_err());

        let found = store.read(|txn| txn.attendance(UserId(1), day)).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn attendance_is_indexed_by_day() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::create(dir.path().join("p.redb")).unwrap();
        let d1 = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2025, 1, 3).unwrap();

        store
            .write(|txn| {
                txn.put_attendance(&row(1, 1, d1))?;
                txn.put_attendance(&row(2, 2, d1))?;
                txn.put_attendance(&row(3, 1, d2))
            })
            .unwrap();

        let on_d1 = store.read(|txn| txn.attendance_on(d1)).unwrap();
        assert_eq!(on_d1.len(), 2);

        let span = store.read(|txn| txn.attendance_between(d1, d2)).unwrap();
        assert_eq!(span.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1, 2, 3]);

        let mine = store
            .read(|txn| txn.user_attendance_between(UserId(1), d1, d2))
            .unwrap();
        assert_eq!(mine.len(), 2);
    }

    #[test]
    fn ids_are_monotonic_per_kind() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::create(dir.path().join("p.redb")).unwrap();
        let ids = store
            .write(|txn| {
                Ok((
                    txn.next_id("users")?,
                    txn.next_id("users")?,
                    txn.next_id("leaves")?,
                ))
            })
            .unwrap();
        assert_eq!(ids, (1, 2, 1));
    }
}
