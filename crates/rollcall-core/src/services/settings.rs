//! Company-wide working-time settings.

use crate::calendar::parse_hhmm;
use crate::error::{PortalError, Result};
use crate::model::{AuditAction, ClientInfo, SystemSettings};
use crate::portal::{Actor, Portal};
use crate::rbac;
use crate::services::audit::{self, AuditEvent};
use crate::store::{Mutations, Records};
use serde::{Deserialize, Serialize};

/// Partial settings update. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub late_threshold: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub half_day_threshold: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_days: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl SettingsUpdate {
    fn apply(&self, mut s: SystemSettings) -> SystemSettings {
        if let Some(v) = &self.company_name {
            s.company_name = v.trim().to_string();
        }
        if let Some(v) = &self.work_start_time {
            s.work_start_time.clone_from(v);
        }
        if let Some(v) = &self.work_end_time {
            s.work_end_time.clone_from(v);
        }
        if let Some(v) = self.late_threshold {
            s.late_threshold = v;
        }
        if let Some(v) = self.half_day_threshold {
            s.half_day_threshold = v;
        }
        if let Some(v) = &self.working_days {
            let mut days = v.clone();
            days.sort_unstable();
            days.dedup();
            s.working_days = days;
        }
        if let Some(v) = &self.currency {
            s.currency = v.trim().to_uppercase();
        }
        s
    }
}

/// Reject settings that would make attendance classification meaningless.
pub fn validate(s: &SystemSettings) -> Result<()> {
    if s.company_name.is_empty() {
        return Err(PortalError::invalid("Company name is required"));
    }
    let start = parse_hhmm(&s.work_start_time)?;
    let end = parse_hhmm(&s.work_end_time)?;
    if end <= start {
        return Err(PortalError::invalid("Work end time must be after work start time"));
    }
    if s.late_threshold >= 24 * 60 {
        return Err(PortalError::invalid("Late threshold must be under 1440 minutes"));
    }
    if !(1..=24).contains(&s.half_day_threshold) {
        return Err(PortalError::invalid("Half-day threshold must be between 1 and 24 hours"));
    }
    if s.working_days.iter().any(|d| *d > 6) {
        return Err(PortalError::invalid("Working days must be between 0 (Sunday) and 6"));
    }
    if s.currency.len() != 3 || !s.currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(PortalError::invalid("Currency must be a 3-letter code"));
    }
    Ok(())
}

impl Portal {
    /// Current settings, or the defaults if none were saved.
    pub fn settings(&self, actor: &Actor) -> Result<SystemSettings> {
        rbac::require(actor.role, rbac::EXECUTIVE)?;
        self.store.read(|txn| txn.settings())
    }

    pub fn update_settings(
        &self,
        actor: &Actor,
        update: SettingsUpdate,
        client: &ClientInfo,
    ) -> Result<SystemSettings> {
        rbac::require(actor.role, rbac::ADMIN)?;
        let now = self.now();
        self.store.write(|txn| {
            let next = update.apply(txn.settings()?);
            validate(&next)?;
            txn.put_settings(&next)?;
            audit::append(
                txn,
                now,
                AuditEvent::new(AuditAction::Update, "Settings")
                    .by(actor.user_id)
                    .details(serde_json::to_value(&update)?)
                    .client(client),
            )?;
            Ok(next)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::Role;
    use crate::services::testkit::harness;

    #[test]
    fn defaults_until_updated() {
        let h = harness();
        let admin = h.admin();
        assert_eq!(h.portal.settings(&admin).unwrap(), SystemSettings::default());

        let saved = h
            .portal
            .update_settings(
                &admin,
                SettingsUpdate {
                    work_start_time: Some("08:00".into()),
                    working_days: Some(vec![5, 1, 1, 2]),
                    currency: Some("eur".into()),
                    ..SettingsUpdate::default()
                },
                &ClientInfo::default(),
            )
            .unwrap();
        assert_eq!(saved.work_start_time, "08:00");
        assert_eq!(saved.working_days, vec![1, 2, 5]);
        assert_eq!(saved.currency, "EUR");
        assert_eq!(h.portal.settings(&admin).unwrap(), saved);
    }

    #[test]
    fn invalid_updates_leave_settings_untouched() {
        let h = harness();
        let admin = h.admin();
        for bad in [
            SettingsUpdate {
                work_end_time: Some("08:00".into()),
                ..SettingsUpdate::default()
            },
            SettingsUpdate {
                work_start_time: Some("9am".into()),
                ..SettingsUpdate::default()
            },
            SettingsUpdate {
                working_days: Some(vec![7]),
                ..SettingsUpdate::default()
            },
            SettingsUpdate {
                currency: Some("EURO".into()),
                ..SettingsUpdate::default()
            },
            SettingsUpdate {
                half_day_threshold: Some(0),
                ..SettingsUpdate::default()
            },
            SettingsUpdate {
                late_threshold: Some(24 * 60),
                ..SettingsUpdate::default()
            },
        ] {
            let err = h.portal.update_settings(&admin, bad, &ClientInfo::default());
            assert!(matches!(err, Err(PortalError::InvalidInput(_))));
        }
        assert_eq!(h.portal.settings(&admin).unwrap(), SystemSettings::default());
    }

    #[test]
    fn later_start_time_moves_the_late_cutoff() {
        let h = harness();
        let admin = h.admin();
        let emp = h.user("e@corp.test", "Eve", Role::Employee);
        h.portal
            .update_settings(
                &admin,
                SettingsUpdate {
                    work_start_time: Some("08:00".into()),
                    late_threshold: Some(10),
                    ..SettingsUpdate::default()
                },
                &ClientInfo::default(),
            )
            .unwrap();
        // harness clock is 08:30
        let row = h.portal.check_in(&emp).unwrap();
        assert_eq!(row.status, crate::model::AttendanceStatus::Late);
    }

    #[test]
    fn hr_cannot_read_settings() {
        let h = harness();
        let hr = h.user("hr@corp.test", "Hana", Role::Hr);
        let err = h.portal.settings(&hr);
        assert!(matches!(err, Err(PortalError::Forbidden { .. })));
        // the daily view still carries them
        assert!(h.portal.attendance_today(&hr).is_ok());
    }

    #[test]
    fn only_admins_update() {
        let h = harness();
        let ceo = h.user("c@corp.test", "Cy", Role::Ceo);
        assert!(h.portal.settings(&ceo).is_ok());
        let err = h
            .portal
            .update_settings(&ceo, SettingsUpdate::default(), &ClientInfo::default());
        assert!(matches!(err, Err(PortalError::Forbidden { .. })));
    }
}
