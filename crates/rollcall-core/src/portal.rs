//! The service handle every operation hangs off.

use crate::clock::Clock;
use crate::crypto::{HASH_ITERATIONS, TokenSigner};
use crate::model::{Role, UserId};
use crate::store::Store;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Tunables that are not business settings.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// Lifetime of a login session.
    pub session_ttl: chrono::Duration,
    /// PBKDF2 work factor for new password hashes.
    pub hash_iterations: u32,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            session_ttl: chrono::Duration::days(7),
            hash_iterations: HASH_ITERATIONS,
        }
    }
}

/// The portal: a store, a clock and a token signer.
///
/// Services are implemented as `impl Portal` blocks in [`crate::services`].
/// `Portal` is `Send + Sync`; the HTTP layer shares it behind an `Arc`.
pub struct Portal {
    pub(crate) store: Store,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) signer: TokenSigner,
    pub(crate) config: PortalConfig,
}

impl Portal {
    #[must_use]
    pub fn new(store: Store, clock: Arc<dyn Clock>, signer: TokenSigner, config: PortalConfig) -> Self {
        Self {
            store,
            clock,
            signer,
            config,
        }
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn today(&self) -> NaiveDate {
        self.clock.today()
    }
}

/// An authenticated caller, produced by [`Portal::authenticate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
    pub session_id: u64,
}

/// One page of a larger listing.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: usize,
    pub page: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    /// Slice `items` into page `page` (1-based) of size `limit`.
    pub(crate) fn slice(items: Vec<T>, page: u32, limit: u32) -> Self {
        let total = items.len();
        let skip = (page.saturating_sub(1) as usize).saturating_mul(limit as usize);
        let data = items.into_iter().skip(skip).take(limit as usize).collect();
        Self {
            data,
            total,
            page,
            limit,
        }
    }
}
