//! Breaks within today's attendance row. At most one break is open at a time.

use crate::error::{PortalError, Result};
use crate::model::Break;
use crate::portal::{Actor, Portal};
use crate::store::{Mutations, Records};

impl Portal {
    /// Open a break on the caller's row for today.
    pub fn start_break(&self, actor: &Actor) -> Result<Break> {
        let now = self.now();
        let today = now.date_naive();
        self.store.write(|txn| {
            let mut row = txn
                .attendance(actor.user_id, today)?
                .ok_or_else(|| PortalError::not_found("Must check in before taking a break"))?;
            if row.check_out.is_some() {
                return Err(PortalError::conflict("Already checked out for the day"));
            }
            if row.open_break().is_some() {
                return Err(PortalError::conflict("Already on a break"));
            }
            let opened = Break {
                id: txn.next_id("breaks")?,
                start_time: now,
                end_time: None,
                duration_mins: None,
            };
            row.breaks.push(opened.clone());
            txn.put_attendance(&row)?;
            Ok(opened)
        })
    }

    /// Close the open break, recording its length in whole minutes.
    pub fn end_break(&self, actor: &Actor) -> Result<Break> {
        let now = self.now();
        let today = now.date_naive();
        self.store.write(|txn| {
            let mut row = txn
                .attendance(actor.user_id, today)?
                .ok_or_else(|| PortalError::not_found("Attendance record not found"))?;
            let open = row
                .breaks
                .iter_mut()
                .find(|b| b.is_open())
                .ok_or_else(|| PortalError::not_found("No open break found"))?;
            open.end_time = Some(now);
            open.duration_mins = Some((now - open.start_time).num_minutes().max(0));
            let closed = open.clone();
            txn.put_attendance(&row)?;
            Ok(closed)
        })
    }

    /// Today's breaks in start order; empty before check-in.
    pub fn breaks_today(&self, actor: &Actor) -> Result<Vec<Break>> {
        let today = self.today();
        let row = self.store.read(|txn| txn.attendance(actor.user_id, today))?;
        let mut breaks = row.map(|r| r.breaks).unwrap_or_default();
        breaks.sort_by_key(|b| b.start_time);
        Ok(breaks)
    }
}
