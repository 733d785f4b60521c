//! # 休暇承認フローの結合テスト
//!
//! `build_app` で組み立てた本番と同じルーター（モック依存）に対して、
//! 申請から 3 段階の推薦を経て承認されるまでを HTTP 経由で検証する。
//!
//! - 申請 → Director → DepartmentalHead → HrDirector で `approved`
//! - 承認後に年次休暇残数が減る
//! - 管理者 API はロールで保護され、監査ログに操作が残る
//! - レスポンスに `x-request-id` が付与される

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
    response::Response,
};
use chrono::{DateTime, TimeZone, Utc};
use leaveflow_api::{
    app_builder::{AppDeps, build_app},
    live::EventHub,
};
use leaveflow_domain::{
    clock::FixedClock,
    leave::LeavePolicy,
    password::PasswordHash,
    user::{Email, NewUser, User, UserId, UserRole},
    value_objects::{AnnualEntitlement, DepartmentName, UserName},
};
use leaveflow_infra::{
    Argon2PasswordChecker,
    SessionData,
    SessionManager,
    mock::{
        MockAuditLogRepository,
        MockLeaveRequestRepository,
        MockRosterRepository,
        MockSessionManager,
        MockTransactionManager,
        MockUserRepository,
    },
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

fn user(role: UserRole, department: &str) -> User {
    User::new(NewUser {
        id: UserId::new(),
        email: Email::new(format!("{}@example.com", UserId::new())).unwrap(),
        name: UserName::new(role.to_string()).unwrap(),
        department: DepartmentName::new(department).unwrap(),
        role,
        annual_entitlement: AnnualEntitlement::default(),
        now: now(),
    })
}

/// ロールごとのセッション ID
struct Sessions {
    employee: String,
    director: String,
    head:     String,
    hr:       String,
    admin:    String,
}

async fn setup() -> (Router, Sessions) {
    let user_repo = MockUserRepository::new();
    let session_manager = MockSessionManager::new();

    let mut sids = Vec::new();
    for (role, department) in [
        (UserRole::Employee, "Engineering"),
        (UserRole::Director, "Engineering"),
        (UserRole::DepartmentalHead, "Engineering"),
        (UserRole::HrDirector, "HR"),
        (UserRole::Admin, "IT"),
    ] {
        let u = user(role, department);
        user_repo.add_user(u.clone(), PasswordHash::new("hash"));
        sids.push(
            session_manager
                .create(&SessionData::for_user(&u, now()))
                .await
                .unwrap(),
        );
    }
    let [employee, director, head, hr, admin]: [String; 5] = sids.try_into().unwrap();

    let app = build_app(AppDeps {
        user_repo:        Arc::new(user_repo),
        leave_repo:       Arc::new(MockLeaveRequestRepository::new()),
        roster_repo:      Arc::new(MockRosterRepository::new()),
        audit_log_repo:   Arc::new(MockAuditLogRepository::new()),
        tx_manager:       Arc::new(MockTransactionManager),
        session_manager:  Arc::new(session_manager),
        password_checker: Arc::new(Argon2PasswordChecker::new()),
        clock:            Arc::new(FixedClock::new(now())),
        hub:              EventHub::new(16),
        policy:           LeavePolicy::default(),
        secure_cookie:    false,
    });

    (
        app,
        Sessions {
            employee,
            director,
            head,
            hr,
            admin,
        },
    )
}

fn request(method: Method, uri: &str, sid: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Cookie", format!("session_id={sid}"));
    match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response: Response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn submit(app: &Router, sid: &str) -> Value {
    let (status, body) = send(
        app,
        request(
            Method::POST,
            "/api/v1/leaves",
            sid,
            Some(json!({
                "leave_type": "annual",
                "start_date": "2026-03-09",
                "end_date": "2026-03-13",
                "reason": "家族旅行",
                "relief_officer": "佐藤"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"].clone()
}

async fn recommend(app: &Router, sid: &str, leave: &Value) -> (StatusCode, Value) {
    send(
        app,
        request(
            Method::POST,
            &format!("/api/v1/leaves/{}/recommend", leave["id"].as_str().unwrap()),
            sid,
            Some(json!({ "version": leave["version"] })),
        ),
    )
    .await
}

#[tokio::test]
async fn test_3段階の推薦で休暇申請が承認される() {
    let (app, s) = setup().await;
    let leave = submit(&app, &s.employee).await;
    assert_eq!(leave["current_stage"], "director");

    // 段階を飛ばした推薦は拒否される
    let (status, _) = recommend(&app, &s.hr, &leave).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = recommend(&app, &s.director, &leave).await;
    assert_eq!(status, StatusCode::OK);
    let leave = body["data"].clone();
    assert_eq!(leave["current_stage"], "departmental_head");

    let (status, body) = recommend(&app, &s.head, &leave).await;
    assert_eq!(status, StatusCode::OK);
    let leave = body["data"].clone();
    assert_eq!(leave["current_stage"], "hr_director");

    let (status, body) = recommend(&app, &s.hr, &leave).await;
    assert_eq!(status, StatusCode::OK);
    let leave = body["data"].clone();
    assert_eq!(leave["status"], "approved");
    assert_eq!(leave["current_stage"], Value::Null);
    assert_eq!(leave["recommendations"].as_array().unwrap().len(), 3);
    assert_eq!(leave["version"], 4);

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/v1/leaves/balance?year=2026", &s.employee, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["used"], 5);
}

#[tokio::test]
async fn test_古いバージョンでの推薦は409を返す() {
    let (app, s) = setup().await;
    let leave = submit(&app, &s.employee).await;

    let (status, _) = recommend(&app, &s.director, &leave).await;
    assert_eq!(status, StatusCode::OK);

    // version 1 のまま次段階を推薦する
    let (status, _) = recommend(&app, &s.head, &leave).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_承認待ち一覧には担当段階の申請だけが並ぶ() {
    let (app, s) = setup().await;
    let leave = submit(&app, &s.employee).await;

    let (_, director_view) = send(
        &app,
        request(Method::GET, "/api/v1/approvals", &s.director, None),
    )
    .await;
    let (_, head_view) = send(&app, request(Method::GET, "/api/v1/approvals", &s.head, None)).await;

    assert_eq!(director_view["data"][0]["id"], leave["id"]);
    assert_eq!(head_view["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_管理者apiはadminロール以外に403を返す() {
    let (app, s) = setup().await;

    for uri in [
        "/api/v1/admin/users",
        "/api/v1/admin/leaves",
        "/api/v1/admin/audit-logs",
    ] {
        let (status, _) = send(&app, request(Method::GET, uri, &s.employee, None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");

        let (status, _) = send(&app, request(Method::GET, uri, "unknown-session", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn test_管理者は監査ログで申請と推薦を確認できる() {
    let (app, s) = setup().await;
    let leave = submit(&app, &s.employee).await;
    recommend(&app, &s.director, &leave).await;

    let (status, body) = send(
        &app,
        request(
            Method::GET,
            "/api/v1/admin/audit-logs?action=leave.submit,leave.recommend",
            &s.admin,
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let mut actions: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["action"].as_str().unwrap())
        .collect();
    actions.sort();
    assert_eq!(actions, vec!["leave.recommend", "leave.submit"]);
}

#[tokio::test]
async fn test_レスポンスにx_request_idが付与される() {
    let (app, _) = setup().await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}
