//! Company holiday calendar.

use crate::error::{PortalError, Result};
use crate::model::{AuditAction, ClientInfo, Holiday};
use crate::portal::{Actor, Portal};
use crate::rbac;
use crate::services::audit::{self, AuditEvent};
use crate::services::required_text;
use crate::store::{Mutations, Records};
use chrono::NaiveDate;
use serde::Deserialize;

/// How many holidays [`Portal::upcoming_holidays`] returns.
pub const UPCOMING_COUNT: usize = 5;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolidayInput {
    pub date: NaiveDate,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_optional: bool,
}

impl Portal {
    /// Every holiday, by date.
    pub fn holidays(&self) -> Result<Vec<Holiday>> {
        let mut all = self.store.read(|txn| txn.holidays())?;
        all.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    /// The next few holidays from today, inclusive.
    pub fn upcoming_holidays(&self) -> Result<Vec<Holiday>> {
        let today = self.today();
        Ok(self
            .holidays()?
            .into_iter()
            .filter(|h| h.date >= today)
            .take(UPCOMING_COUNT)
            .collect())
    }

    pub fn create_holiday(&self, actor: &Actor, input: HolidayInput, client: &ClientInfo) -> Result<Holiday> {
        rbac::require(actor.role, rbac::SECURITY)?;
        let name = required_text(&input.name, "Name")?;
        let now = self.now();
        self.store.write(|txn| {
            let holiday = Holiday {
                id: txn.next_id("holidays")?,
                date: input.date,
                name,
                description: input.description.filter(|d| !d.trim().is_empty()),
                is_optional: input.is_optional,
            };
            txn.put_holiday(&holiday)?;
            audit::append(
                txn,
                now,
                AuditEvent::new(AuditAction::Create, "Holiday")
                    .by(actor.user_id)
                    .target(holiday.id)
                    .client(client),
            )?;
            Ok(holiday)
        })
    }

    pub fn delete_holiday(&self, actor: &Actor, id: u64, client: &ClientInfo) -> Result<()> {
        rbac::require(actor.role, rbac::SECURITY)?;
        let now = self.now();
        self.store.write(|txn| {
            if !txn.remove_holiday(id)? {
                return Err(PortalError::not_found("Holiday not found"));
            }
            audit::append(
                txn,
                now,
                AuditEvent::new(AuditAction::Delete, "Holiday")
                    .by(actor.user_id)
                    .target(id)
                    .client(client),
            )?;
            Ok(())
        })
    }
}
