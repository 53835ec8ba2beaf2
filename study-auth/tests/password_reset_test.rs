mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;
use study_auth::models::OtpPurpose;

#[tokio::test]
async fn reset_flow_changes_password_once() {
    let app = TestApp::new();
    let id = app.verified_user("alice", "a@x.com", "p1").await;

    let (status, _) = app.request_password_reset("a@x.com").await;
    assert_eq!(status, StatusCode::OK);
    let code = app.code_for(id, OtpPurpose::PasswordReset, 2).await;

    let confirm = json!({ "subject_id": id, "code": code, "new_password": "p2" });
    let (status, _) = app
        .post("/auth/password-reset/confirm", confirm.clone())
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.sign_in("alice", "p1").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.sign_in("alice", "p2").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.post("/auth/password-reset/confirm", confirm).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_email_is_silent() {
    let app = TestApp::new();

    let (status, body) = app.request_password_reset("ghost@x.com").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    common::settle().await;
    assert!(app.mailer.sent().is_empty());
}

#[tokio::test]
async fn reset_code_outlives_verification_lifetime() {
    let app = TestApp::new();
    let id = app.verified_user("alice", "a@x.com", "p1").await;

    app.request_password_reset("a@x.com").await;
    let code = app.code_for(id, OtpPurpose::PasswordReset, 2).await;

    app.clock.advance(chrono::Duration::hours(23));
    let (status, _) = app
        .post(
            "/auth/password-reset/confirm",
            json!({ "subject_id": id, "code": code, "new_password": "p2" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn verification_code_cannot_reset_password() {
    let app = TestApp::new();
    let id = app.sign_up("alice", "a@x.com", "p1").await;
    let code = app.code_for(id, OtpPurpose::EmailVerification, 1).await;

    let (status, _) = app
        .post(
            "/auth/password-reset/confirm",
            json!({ "subject_id": id, "code": code, "new_password": "p2" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
