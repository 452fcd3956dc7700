//! Company-wide announcements with optional expiry.

use crate::error::{PortalError, Result};
use crate::model::{Announcement, AnnouncementKind, AuditAction, ClientInfo};
use crate::portal::{Actor, Portal};
use crate::rbac;
use crate::services::audit::{self, AuditEvent};
use crate::services::required_text;
use crate::store::{Mutations, Records};
use serde::Deserialize;

pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_MESSAGE_LEN: usize = 500;
pub const MAX_EXPIRY_HOURS: u32 = 720;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementInput {
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: AnnouncementKind,
    #[serde(default)]
    pub expires_in_hours: Option<u32>,
}

fn bounded(value: &str, field: &str, max: usize) -> Result<String> {
    let text = required_text(value, field)?;
    if text.chars().count() > max {
        return Err(PortalError::invalid(format!("{field} must be at most {max} characters")));
    }
    Ok(text)
}

fn newest_first(mut list: Vec<Announcement>) -> Vec<Announcement> {
    list.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    list
}

impl Portal {
    /// Unexpired announcements, newest first. Visible to every user.
    pub fn active_announcements(&self) -> Result<Vec<Announcement>> {
        let now = self.now();
        let all = self.store.read(|txn| txn.announcements())?;
        Ok(newest_first(all.into_iter().filter(|a| a.is_active_at(now)).collect()))
    }

    /// Every announcement, expired ones included.
    pub fn all_announcements(&self, actor: &Actor) -> Result<Vec<Announcement>> {
        rbac::require(actor.role, rbac::ADMIN)?;
        Ok(newest_first(self.store.read(|txn| txn.announcements())?))
    }

    pub fn create_announcement(
        &self,
        actor: &Actor,
        input: AnnouncementInput,
        client: &ClientInfo,
    ) -> Result<Announcement> {
        rbac::require(actor.role, rbac::ADMIN)?;
        let title = bounded(&input.title, "Title", MAX_TITLE_LEN)?;
        let message = bounded(&input.message, "Message", MAX_MESSAGE_LEN)?;
        if input
            .expires_in_hours
            .is_some_and(|hours| !(1..=MAX_EXPIRY_HOURS).contains(&hours))
        {
            return Err(PortalError::invalid(format!(
                "expiresInHours must be between 1 and {MAX_EXPIRY_HOURS}"
            )));
        }
        let now = self.now();
        self.store.write(|txn| {
            let announcement = Announcement {
                id: txn.next_id("announcements")?,
                title,
                message,
                kind: input.kind,
                created_at: now,
                expires_at: input
                    .expires_in_hours
                    .map(|h| now + chrono::Duration::hours(i64::from(h))),
                created_by: actor.user_id,
            };
            txn.put_announcement(&announcement)?;
            audit::append(
                txn,
                now,
                AuditEvent::new(AuditAction::Create, "Announcement")
                    .by(actor.user_id)
                    .target(announcement.id)
                    .client(client),
            )?;
            Ok(announcement)
        })
    }

    pub fn delete_announcement(&self, actor: &Actor, id: u64, client: &ClientInfo) -> Result<()> {
        rbac::require(actor.role, rbac::ADMIN)?;
        let now = self.now();
        self.store.write(|txn| {
            if !txn.remove_announcement(id)? {
                return Err(PortalError::not_found("Announcement not found"));
            }
            audit::append(
                txn,
                now,
                AuditEvent::new(AuditAction::Delete, "Announcement")
                    .by(actor.user_id)
                    .target(id)
                    .client(client),
            )?;
            Ok(())
        })
    }
}
