//! Server configuration.
//!
//! Every option is a `serve` flag with a `ROLLCALL_*` environment fallback.
//! Business settings (work hours, thresholds, currency) are not here; they
//! live in the store and are edited through `/api/settings`.

use clap::Args;
use rollcall_core::{PortalConfig, TokenSigner};
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::path::PathBuf;
use tracing::warn;

pub const DEFAULT_DB: &str = "rollcall.redb";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3001;

#[derive(Debug, Clone, Args)]
pub struct ServerConfig {
    /// Database file
    #[arg(long, env = "ROLLCALL_DB", default_value = DEFAULT_DB)]
    pub db: PathBuf,

    /// Interface to bind
    #[arg(long, env = "ROLLCALL_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to bind
    #[arg(short, long, env = "ROLLCALL_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Secret used to sign bearer tokens. Random per process when unset.
    #[arg(long, env = "ROLLCALL_TOKEN_SECRET", hide_env_values = true)]
    pub token_secret: Option<String>,

    /// Session lifetime in hours
    #[arg(long, env = "ROLLCALL_SESSION_TTL_HOURS", default_value_t = 168)]
    pub session_ttl_hours: u32,

    /// Login attempts allowed per minute, process-wide
    #[arg(long, env = "ROLLCALL_LOGIN_RATE_PER_MINUTE", default_value_t = 20)]
    pub login_rate_per_minute: u32,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| format!("Invalid bind address {}:{}: {e}", self.host, self.port))
    }

    /// Token signer from the configured secret.
    pub fn signer(&self) -> TokenSigner {
        match self.token_secret.as_deref().filter(|s| !s.is_empty()) {
            Some(secret) => TokenSigner::new(secret.as_bytes().to_vec()),
            None => {
                warn!("ROLLCALL_TOKEN_SECRET not set, using a random secret; sessions will not survive a restart");
                TokenSigner::random()
            }
        }
    }

    pub fn portal_config(&self) -> Result<PortalConfig, String> {
        if self.session_ttl_hours == 0 {
            return Err("Session TTL must be at least one hour".to_string());
        }
        Ok(PortalConfig {
            session_ttl: chrono::Duration::hours(i64::from(self.session_ttl_hours)),
            ..PortalConfig::default()
        })
    }

    pub fn login_quota(&self) -> Result<NonZeroU32, String> {
        NonZeroU32::new(self.login_rate_per_minute)
            .ok_or_else(|| "Login rate must be at least one per minute".to_string())
    }
}
