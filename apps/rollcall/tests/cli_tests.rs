//! Integration tests for Rollcall CLI commands.
//!
//! Uses tempfile for testing file-based operations.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use clap::Parser;
use rollcall::cli::{Cli, Commands, cmd_init, cmd_status};
use rollcall::rollcall_core::{Role, Store};
use serde_json::Value;
use tempfile::TempDir;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Create a temporary directory for tests.
fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

// =============================================================================
// INIT COMMAND TESTS
// =============================================================================

#[test]
fn test_init_creates_database_with_super_admin() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("portal.redb");

    let admin = cmd_init(&db_path, "root@corp.test", "password123", false).unwrap();
    assert!(db_path.exists());
    assert_eq!(admin.role, Role::SuperAdmin);
    assert_eq!(admin.employee_profile.employee_id, "ADMIN-0001");

    let counts = Store::open(&db_path).unwrap().counts().unwrap();
    assert_eq!(counts.users, 1);
    assert_eq!(counts.audit_logs, 1);
}

#[test]
fn test_init_fails_if_exists_without_force() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("portal.redb");

    // First init
    cmd_init(&db_path, "root@corp.test", "password123", false).unwrap();

    // Second init should fail
    let result = cmd_init(&db_path, "root@corp.test", "password123", false);
    assert!(result.is_err());
}

#[test]
fn test_init_succeeds_with_force() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("portal.redb");

    cmd_init(&db_path, "first@corp.test", "password123", false).unwrap();
    let admin = cmd_init(&db_path, "second@corp.test", "password123", true).unwrap();
    assert_eq!(admin.email, "second@corp.test");

    // the old account is gone with the old file
    let counts = Store::open(&db_path).unwrap().counts().unwrap();
    assert_eq!(counts.users, 1);
}

#[test]
fn test_init_rejects_short_password() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("portal.redb");
    assert!(cmd_init(&db_path, "root@corp.test", "short", false).is_err());
    // nothing is left behind, so a corrected retry goes through
    assert!(!db_path.exists());
    cmd_init(&db_path, "root@corp.test", "password123", false).unwrap();
}

#[test]
fn test_forced_init_with_bad_credentials_keeps_existing_database() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("portal.redb");
    cmd_init(&db_path, "root@corp.test", "password123", false).unwrap();

    assert!(cmd_init(&db_path, "root@corp.test", "short", true).is_err());
    assert!(cmd_init(&db_path, "not-an-email", "password123", true).is_err());

    let counts = Store::open(&db_path).unwrap().counts().unwrap();
    assert_eq!(counts.users, 1);
    assert_eq!(counts.audit_logs, 1);
    assert!(!temp.path().join("portal.redb.init").exists());
}

// =============================================================================
// STATUS COMMAND TESTS
// =============================================================================

#[test]
fn test_status_on_missing_database_fails() {
    let temp = create_temp_dir();
    let result = cmd_status(&temp.path().join("nonexistent.redb"), false);
    assert!(result.is_err());
}

#[test]
fn test_status_text_and_json() {
    let temp = create_temp_dir();
    let db_path = temp.path().join("portal.redb");
    cmd_init(&db_path, "root@corp.test", "password123", false).unwrap();

    let text = cmd_status(&db_path, false).unwrap();
    assert!(text.contains("Users"));
    assert!(text.lines().any(|l| l.starts_with("Users") && l.ends_with(" 1")));

    let json: Value = serde_json::from_str(&cmd_status(&db_path, true).unwrap()).unwrap();
    assert_eq!(json["users"], 1);
    assert_eq!(json["attendance"], 0);
}

// =============================================================================
// ARGUMENT PARSING
// =============================================================================

#[test]
fn test_serve_flags_parse() {
    let cli = Cli::try_parse_from([
        "rollcall",
        "serve",
        "--db",
        "custom.redb",
        "--port",
        "8080",
        "--login-rate-per-minute",
        "5",
    ])
    .unwrap();
    match cli.command {
        Commands::Serve(config) => {
            assert_eq!(config.port, 8080);
            assert_eq!(config.login_rate_per_minute, 5);
            assert_eq!(config.db.to_str(), Some("custom.redb"));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn test_init_requires_admin_email() {
    let result = Cli::try_parse_from(["rollcall", "init", "--admin-password", "password123"]);
    assert!(result.is_err());
}
