//! # CLI
//!
//! `rollcall init` creates a database with its first SUPER_ADMIN,
//! `rollcall serve` runs the API and `rollcall status` prints record counts.

use crate::api::{self, AppState};
use crate::config::{DEFAULT_DB, ServerConfig};
use clap::{Parser, Subcommand};
use rollcall_core::services::audit::AuditEvent;
use rollcall_core::services::users::{self, NewUser};
use rollcall_core::{
    AuditAction, Portal, PortalConfig, PublicUser, Role, Store, StoreCounts, SystemClock, TokenSigner,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Debug, Parser)]
#[command(name = "rollcall", version, about = "Attendance and HR portal server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a database and its first administrator
    Init {
        #[arg(long, env = "ROLLCALL_DB", default_value = DEFAULT_DB)]
        db: PathBuf,
        #[arg(long)]
        admin_email: String,
        #[arg(long, env = "ROLLCALL_ADMIN_PASSWORD", hide_env_values = true)]
        admin_password: String,
        /// Overwrite an existing database
        #[arg(long)]
        force: bool,
    },
    /// Run the HTTP API
    Serve(ServerConfig),
    /// Print record counts
    Status {
        #[arg(long, env = "ROLLCALL_DB", default_value = DEFAULT_DB)]
        db: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Init {
            db,
            admin_email,
            admin_password,
            force,
        } => {
            let admin = cmd_init(&db, &admin_email, &admin_password, force)?;
            println!("Initialized {} with administrator {}", db.display(), admin.email);
            Ok(())
        }
        Commands::Serve(config) => cmd_serve(config).await,
        Commands::Status { db, json } => {
            println!("{}", cmd_status(&db, json)?);
            Ok(())
        }
    }
}

fn portal_on(store: Store, signer: TokenSigner, config: PortalConfig) -> Portal {
    Portal::new(store, Arc::new(SystemClock), signer, config)
}

/// Create the database at `db` with one SUPER_ADMIN account.
///
/// The new database is built next to the target and renamed into place
/// only once the administrator exists, so a failed run leaves any
/// existing file untouched.
pub fn cmd_init(db: &Path, admin_email: &str, admin_password: &str, force: bool) -> CliResult<PublicUser> {
    users::validate_email(admin_email)?;
    users::validate_password(admin_password)?;
    if db.exists() && !force {
        return Err(format!("Database already exists at {}. Use --force to overwrite", db.display()).into());
    }

    let staging = staging_path(db);
    if staging.exists() {
        std::fs::remove_file(&staging)?;
    }
    let admin = match bootstrap(&staging, admin_email, admin_password) {
        Ok(admin) => admin,
        Err(e) => {
            // best effort
            let _ = std::fs::remove_file(&staging);
            return Err(e);
        }
    };

    if db.exists() {
        warn!(path = %db.display(), "overwriting existing database");
        std::fs::remove_file(db)?;
    }
    std::fs::rename(&staging, db)?;
    info!(path = %db.display(), admin = %admin.email, "database initialized");
    Ok(admin)
}

fn staging_path(db: &Path) -> PathBuf {
    let mut name = db.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".init");
    db.with_file_name(name)
}

fn bootstrap(path: &Path, admin_email: &str, admin_password: &str) -> CliResult<PublicUser> {
    let portal = portal_on(Store::create(path)?, TokenSigner::random(), PortalConfig::default());
    let admin = portal.insert_user(NewUser {
        email: admin_email.to_string(),
        password: admin_password.to_string(),
        first_name: "System".to_string(),
        last_name: "Administrator".to_string(),
        role: Role::SuperAdmin,
        employee_id: Some("ADMIN-0001".to_string()),
        department: Some("Administration".to_string()),
        designation: None,
        base_salary_cents: 0,
    })?;
    portal.log(
        AuditEvent::new(AuditAction::Create, "User")
            .target(admin.id)
            .details(serde_json::json!({ "message": "Initial administrator created" })),
    )?;
    Ok(admin.public())
}

pub fn render_counts(counts: &StoreCounts) -> String {
    [
        ("Users", counts.users),
        ("Attendance rows", counts.attendance),
        ("Leave requests", counts.leaves),
        ("Payslips", counts.payslips),
        ("Sessions", counts.sessions),
        ("Holidays", counts.holidays),
        ("Announcements", counts.announcements),
        ("Audit entries", counts.audit_logs),
    ]
    .iter()
    .map(|(label, n)| format!("{label:<16} {n}"))
    .collect::<Vec<_>>()
    .join("\n")
}

/// Record counts of an existing database, as text or JSON.
pub fn cmd_status(db: &Path, json: bool) -> CliResult<String> {
    let counts = Store::open(db)?.counts()?;
    if json {
        Ok(serde_json::to_string_pretty(&counts)?)
    } else {
        Ok(format!("Database: {}\n{}", db.display(), render_counts(&counts)))
    }
}

pub async fn cmd_serve(config: ServerConfig) -> CliResult<()> {
    let addr = config.bind_addr()?;
    let portal_config = config.portal_config()?;
    let quota = config.login_quota()?;

    let store = if config.db.exists() {
        Store::open(&config.db)?
    } else {
        warn!(path = %config.db.display(), "database not found, creating an empty one; run `rollcall init` to add an administrator");
        Store::create(&config.db)?
    };
    let portal = portal_on(store, config.signer(), portal_config);

    let listener = TcpListener::bind(addr).await?;
    api::serve(listener, AppState::new(portal, quota)).await?;
    Ok(())
}
