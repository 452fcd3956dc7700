//! # Rollcall Core
//!
//! Business core of the Rollcall attendance and HR portal.
//!
//! This crate owns everything that is not HTTP:
//!
//! - **model**: stored records and the views returned to callers
//! - **rbac**: role groups and per-user feature access
//! - **store**: the redb database and typed table access
//! - **crypto**: password hashes and signed bearer tokens
//! - **services**: every portal operation, as methods on [`Portal`]
//!
//! All operations are synchronous. Each one is a short sequence of reads and
//! writes inside a single redb transaction, so a failed operation leaves no
//! partial state behind.
//!
//! ## Example
//!
//! ```rust,ignore
//! use rollcall_core::{Portal, PortalConfig, Store, SystemClock, TokenSigner};
//! use std::sync::Arc;
//!
//! let store = Store::create("portal.redb")?;
//! let portal = Portal::new(store, Arc::new(SystemClock), TokenSigner::random(), PortalConfig::default());
//! let actor = portal.authenticate(&token)?;
//! let row = portal.check_in(&actor)?;
//! ```

pub mod calendar;
pub mod clock;
pub mod crypto;
pub mod error;
pub mod model;
pub mod rbac;
pub mod services;
pub mod store;

mod portal;

pub use clock::{Clock, FixedClock, SystemClock};
pub use crypto::TokenSigner;
pub use error::{PortalError, Result};
pub use model::*;
pub use portal::{Actor, Page, Portal, PortalConfig};
pub use rbac::FeatureKey;
pub use store::{Store, StoreCounts};
