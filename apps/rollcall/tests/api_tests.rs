//! Integration tests for the HTTP API.
//!
//! Drives the full router in process with axum-test, over a temp-file store
//! and a pinned clock.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::{TimeZone, Utc};
use rollcall::api::{AppState, build_router};
use rollcall::rollcall_core::services::users::NewUser;
use rollcall::rollcall_core::{FixedClock, Portal, PortalConfig, Role, Store, TokenSigner};
use serde_json::{Value, json};
use std::num::NonZeroU32;
use std::sync::Arc;
use tempfile::TempDir;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

struct TestApp {
    server: TestServer,
    _dir: TempDir,
}

/// Monday 2025-03-03 08:30 UTC, with an admin, an HR user and an employee.
fn app_with_quota(logins_per_minute: u32) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::create(dir.path().join("api.redb")).unwrap();
    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 3, 3, 8, 30, 0).unwrap()));
    let config = PortalConfig {
        hash_iterations: 2,
        ..PortalConfig::default()
    };
    let portal = Portal::new(store, clock, TokenSigner::new(b"api-test".to_vec()), config);

    for (email, first, role, dept) in [
        ("admin@corp.test", "Ada", Role::SuperAdmin, "Administration"),
        ("hr@corp.test", "Hana", Role::Hr, "People"),
        ("emp@corp.test", "Eve", Role::Employee, "Engineering"),
    ] {
        portal
            .insert_user(NewUser {
                email: email.to_string(),
                password: "password123".to_string(),
                first_name: first.to_string(),
                last_name: "Tester".to_string(),
                role,
                employee_id: None,
                department: Some(dept.to_string()),
                designation: None,
                base_salary_cents: 3_000_000,
            })
            .unwrap();
    }

    let state = AppState::new(portal, NonZeroU32::new(logins_per_minute).unwrap());
    TestApp {
        server: TestServer::new(build_router(state)).unwrap(),
        _dir: dir,
    }
}

fn app() -> TestApp {
    app_with_quota(100)
}

async fn login(server: &TestServer, email: &str) -> String {
    let response = server
        .post("/api/auth/login")
        .json(&json!({ "email": email, "password": "password123" }))
        .await;
    response.assert_status_ok();
    response.json::<Value>()["token"].as_str().unwrap().to_string()
}

fn user_id(body: &Value) -> u64 {
    body["id"].as_u64().unwrap()
}

// =============================================================================
// HEALTH & AUTH
// =============================================================================

#[tokio::test]
async fn test_health_needs_no_token() {
    let t = app();
    let response = t.server.get("/health").await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["status"], "ok");
    assert!(body["uptime"].is_u64());
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_bad_credentials_use_error_body() {
    let t = app();
    let response = t
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "emp@corp.test", "password": "wrong-password" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body = response.json::<Value>();
    assert_eq!(body["statusCode"], 401);
    assert_eq!(body["error"], "Unauthorized");
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
async fn test_protected_route_without_token_is_401() {
    let t = app();
    let response = t.server.get("/api/attendance/me").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["message"], "Missing bearer token");

    let response = t
        .server
        .get("/api/attendance/me")
        .authorization_bearer("v1.garbage.token")
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_then_login_and_me() {
    let t = app();
    let response = t
        .server
        .post("/api/auth/register")
        .json(&json!({
            "email": "new@corp.test",
            "password": "password123",
            "firstName": "Nia",
            "lastName": "Newcomer",
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    assert_eq!(response.json::<Value>()["message"], "User created");

    let token = login(&t.server, "new@corp.test").await;
    let me = t.server.get("/api/auth/me").authorization_bearer(&token).await;
    me.assert_status_ok();
    let body = me.json::<Value>();
    assert_eq!(body["email"], "new@corp.test");
    assert_eq!(body["role"], "EMPLOYEE");
    assert!(body["features"].as_array().unwrap().iter().any(|f| f == "VIEW_ATTENDANCE"));
}

#[tokio::test]
async fn test_register_rejects_privileged_role() {
    let t = app();
    let response = t
        .server
        .post("/api/auth/register")
        .json(&json!({
            "email": "sneaky@corp.test",
            "password": "password123",
            "firstName": "Sam",
            "lastName": "Sneaky",
            "role": "SUPER_ADMIN",
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_is_400_with_error_body() {
    let t = app();
    let response = t
        .server
        .post("/api/auth/login")
        .content_type("application/json")
        .bytes("{not json".into())
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["statusCode"], 400);
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let t = app();
    let token = login(&t.server, "emp@corp.test").await;
    t.server
        .post("/api/auth/logout")
        .authorization_bearer(&token)
        .await
        .assert_status_ok();
    let response = t.server.get("/api/auth/me").authorization_bearer(&token).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["message"], "Session expired or revoked");
}

#[tokio::test]
async fn test_login_rate_limit_returns_429() {
    let t = app_with_quota(2);
    login(&t.server, "emp@corp.test").await;
    login(&t.server, "emp@corp.test").await;
    let response = t
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "emp@corp.test", "password": "password123" }))
        .await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.json::<Value>()["statusCode"], 429);
}

// =============================================================================
// ATTENDANCE
// =============================================================================

#[tokio::test]
async fn test_check_in_out_cycle() {
    let t = app();
    let token = login(&t.server, "emp@corp.test").await;

    let response = t
        .server
        .post("/api/attendance/check-in")
        .authorization_bearer(&token)
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "PRESENT");

    let again = t
        .server
        .post("/api/attendance/check-in")
        .authorization_bearer(&token)
        .await;
    again.assert_status(StatusCode::CONFLICT);
    assert_eq!(again.json::<Value>()["message"], "Already checked in for today");

    t.server
        .post("/api/breaks/start")
        .authorization_bearer(&token)
        .await
        .assert_status_ok();

    // no body at all is accepted
    let out = t
        .server
        .post("/api/attendance/check-out")
        .authorization_bearer(&token)
        .await;
    out.assert_status_ok();
    let row = out.json::<Value>();
    assert!(row["checkOut"].is_string());
    assert!(row["breaks"][0]["endTime"].is_string());

    let today = t.server.get("/api/attendance/me").authorization_bearer(&token).await;
    today.assert_status_ok();
    let body = today.json::<Value>();
    assert_eq!(body["config"]["workStartTime"], "09:00");
    assert!(body["attendance"]["checkIn"].is_string());
}

#[tokio::test]
async fn test_employee_cannot_read_dashboards() {
    let t = app();
    let token = login(&t.server, "emp@corp.test").await;
    for path in ["/api/admin/stats", "/api/audit", "/api/users", "/api/leaves/pending"] {
        let response = t.server.get(path).authorization_bearer(&token).await;
        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(response.json::<Value>()["statusCode"], 403);
    }
}

#[tokio::test]
async fn test_export_serves_csv_attachment() {
    let t = app();
    let emp = login(&t.server, "emp@corp.test").await;
    t.server
        .post("/api/attendance/check-in")
        .authorization_bearer(&emp)
        .await
        .assert_status_ok();

    let hr = login(&t.server, "hr@corp.test").await;
    let response = t
        .server
        .get("/api/attendance/export")
        .add_query_param("month", 3)
        .add_query_param("year", 2025)
        .authorization_bearer(&hr)
        .await;
    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "text/csv");
    assert_eq!(
        response.header("content-disposition"),
        "attachment; filename=\"attendance_report_2025_3.csv\""
    );
    let csv = response.text();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("Employee ID,Name,Department,Date,Check In,Check Out,Status,Email")
    );
    let row = lines.next().unwrap();
    assert!(row.contains(",Eve Tester,"));
    assert!(row.ends_with("emp@corp.test"));
}

#[tokio::test]
async fn test_export_rejects_bad_month() {
    let t = app();
    let hr = login(&t.server, "hr@corp.test").await;
    let response = t
        .server
        .get("/api/attendance/export")
        .add_query_param("month", 13)
        .add_query_param("year", 2025)
        .authorization_bearer(&hr)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

// =============================================================================
// LEAVES, PAYROLL, ADMIN
// =============================================================================

#[tokio::test]
async fn test_leave_request_and_approval() {
    let t = app();
    let emp = login(&t.server, "emp@corp.test").await;
    let hr = login(&t.server, "hr@corp.test").await;

    let created = t
        .server
        .post("/api/leaves")
        .authorization_bearer(&emp)
        .json(&json!({ "startDate": "2025-03-10", "endDate": "2025-03-12", "reason": "Family visit" }))
        .await;
    created.assert_status(StatusCode::CREATED);
    let id = user_id(&created.json::<Value>());

    let overlap = t
        .server
        .post("/api/leaves")
        .authorization_bearer(&emp)
        .json(&json!({ "startDate": "2025-03-12", "endDate": "2025-03-14", "reason": "Another trip" }))
        .await;
    overlap.assert_status(StatusCode::CONFLICT);

    let pending = t.server.get("/api/leaves/pending").authorization_bearer(&hr).await;
    pending.assert_status_ok();
    assert_eq!(pending.json::<Value>().as_array().unwrap().len(), 1);

    let decided = t
        .server
        .post(&format!("/api/leaves/{id}/approve"))
        .authorization_bearer(&hr)
        .json(&json!({ "status": "APPROVED" }))
        .await;
    decided.assert_status_ok();
    assert_eq!(decided.json::<Value>()["status"], "APPROVED");

    let twice = t
        .server
        .post(&format!("/api/leaves/{id}/approve"))
        .authorization_bearer(&hr)
        .json(&json!({ "status": "REJECTED" }))
        .await;
    twice.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_payslip_generation_and_visibility() {
    let t = app();
    let hr = login(&t.server, "hr@corp.test").await;
    let emp = login(&t.server, "emp@corp.test").await;
    let me = t.server.get("/api/auth/me").authorization_bearer(&emp).await.json::<Value>();
    let emp_id = user_id(&me);

    let slip = t
        .server
        .post(&format!("/api/payroll/generate/{emp_id}"))
        .authorization_bearer(&hr)
        .json(&json!({ "month": 2, "year": 2025 }))
        .await;
    slip.assert_status_ok();
    let body = slip.json::<Value>();
    assert_eq!(body["totalDays"], 28);
    // no attendance at all: 28 absent days of a 30-day month
    assert_eq!(body["deductionsCents"], 2_800_000);
    assert_eq!(body["netPayCents"], 200_000);

    let own = t
        .server
        .get("/api/payroll")
        .add_query_param("month", 2)
        .add_query_param("year", 2025)
        .authorization_bearer(&emp)
        .await;
    own.assert_status_ok();

    let missing = t
        .server
        .get("/api/payroll")
        .add_query_param("month", 1)
        .add_query_param("year", 2025)
        .authorization_bearer(&emp)
        .await;
    missing.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(missing.json::<Value>()["message"], "Payslip not found");
}

#[tokio::test]
async fn test_admin_creates_user_and_reads_stats() {
    let t = app();
    let admin = login(&t.server, "admin@corp.test").await;
    let created = t
        .server
        .post("/api/admin/users")
        .authorization_bearer(&admin)
        .json(&json!({
            "email": "ops@corp.test",
            "password": "password123",
            "firstName": "Oz",
            "lastName": "Ops",
        }))
        .await;
    created.assert_status(StatusCode::CREATED);
    assert_eq!(created.json::<Value>()["employeeProfile"]["department"], "Unassigned");

    let duplicate = t
        .server
        .post("/api/admin/users")
        .authorization_bearer(&admin)
        .json(&json!({
            "email": "ops@corp.test",
            "password": "password123",
            "firstName": "Oz",
            "lastName": "Ops",
        }))
        .await;
    duplicate.assert_status(StatusCode::CONFLICT);

    let stats = t.server.get("/api/admin/stats").authorization_bearer(&admin).await;
    stats.assert_status_ok();
    let body = stats.json::<Value>();
    // HR, employee and the new account; the super admin is not counted
    assert_eq!(body["totalEmployees"], 3);
    assert_eq!(body["absentToday"], 3);

    let trends = t
        .server
        .get("/api/admin/trends")
        .add_query_param("days", 40)
        .authorization_bearer(&admin)
        .await;
    trends.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_password_request_approval_flow() {
    let t = app();
    let requested = t
        .server
        .post("/api/auth/forgot-password")
        .json(&json!({ "email": "emp@corp.test", "newPassword": "fresh-password" }))
        .await;
    requested.assert_status(StatusCode::CREATED);

    let unknown = t
        .server
        .post("/api/auth/forgot-password")
        .json(&json!({ "email": "nobody@corp.test", "newPassword": "fresh-password" }))
        .await;
    unknown.assert_status(StatusCode::NOT_FOUND);

    let admin = login(&t.server, "admin@corp.test").await;
    let pending = t
        .server
        .get("/api/admin/password-requests/pending")
        .authorization_bearer(&admin)
        .await
        .json::<Value>();
    let id = pending[0]["id"].as_u64().unwrap();

    t.server
        .post(&format!("/api/admin/password-requests/{id}/approve"))
        .authorization_bearer(&admin)
        .await
        .assert_status_ok();

    let response = t
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "emp@corp.test", "password": "fresh-password" }))
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_deactivating_user_revokes_sessions() {
    let t = app();
    let admin = login(&t.server, "admin@corp.test").await;
    let emp = login(&t.server, "emp@corp.test").await;
    let emp_id = user_id(&t.server.get("/api/auth/me").authorization_bearer(&emp).await.json::<Value>());

    let sessions = t.server.get("/api/sessions").authorization_bearer(&admin).await;
    sessions.assert_status_ok();
    assert_eq!(sessions.json::<Value>().as_array().unwrap().len(), 2);

    t.server
        .patch(&format!("/api/users/{emp_id}"))
        .authorization_bearer(&admin)
        .json(&json!({ "isActive": false }))
        .await
        .assert_status_ok();

    t.server
        .get("/api/auth/me")
        .authorization_bearer(&emp)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

// =============================================================================
// COMPANY DATA
// =============================================================================

#[tokio::test]
async fn test_settings_holidays_and_announcements() {
    let t = app();
    let admin = login(&t.server, "admin@corp.test").await;
    let emp = login(&t.server, "emp@corp.test").await;

    let updated = t
        .server
        .patch("/api/settings")
        .authorization_bearer(&admin)
        .json(&json!({ "companyName": "Acme", "lateThreshold": 5 }))
        .await;
    updated.assert_status_ok();
    assert_eq!(updated.json::<Value>()["companyName"], "Acme");

    t.server
        .patch("/api/settings")
        .authorization_bearer(&emp)
        .json(&json!({ "companyName": "Mine" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let holiday = t
        .server
        .post("/api/holidays")
        .authorization_bearer(&admin)
        .json(&json!({ "date": "2025-05-01", "name": "Labour Day" }))
        .await;
    holiday.assert_status_ok();
    let holiday_id = holiday.json::<Value>()["id"].as_u64().unwrap();

    let upcoming = t.server.get("/api/holidays/upcoming").authorization_bearer(&emp).await;
    assert_eq!(upcoming.json::<Value>().as_array().unwrap().len(), 1);

    t.server
        .delete(&format!("/api/holidays/{holiday_id}"))
        .authorization_bearer(&admin)
        .await
        .assert_status_ok();
    t.server
        .delete(&format!("/api/holidays/{holiday_id}"))
        .authorization_bearer(&admin)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let posted = t
        .server
        .post("/api/announcements")
        .authorization_bearer(&admin)
        .json(&json!({ "title": "Welcome", "message": "Hello all", "type": "info", "expiresInHours": 24 }))
        .await;
    posted.assert_status(StatusCode::CREATED);

    let visible = t.server.get("/api/announcements").authorization_bearer(&emp).await;
    assert_eq!(visible.json::<Value>()[0]["title"], "Welcome");
    t.server
        .get("/api/announcements/all")
        .authorization_bearer(&emp)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_audit_log_records_admin_actions() {
    let t = app();
    let admin = login(&t.server, "admin@corp.test").await;
    t.server
        .delete("/api/admin/data/reset")
        .authorization_bearer(&admin)
        .await
        .assert_status_ok();

    let logs = t
        .server
        .get("/api/audit")
        .add_query_param("action", "DELETE")
        .authorization_bearer(&admin)
        .await;
    logs.assert_status_ok();
    let body = logs.json::<Value>();
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["resource"], "System");
    assert_eq!(body["data"][0]["resourceId"], "ALL");
}
