mod common;

use axum::http::StatusCode;
use chrono::Duration;
use common::TestApp;
use serde_json::json;
use study_auth::models::OtpPurpose;
use study_auth::services::OtpStore;

#[tokio::test]
async fn code_is_single_use() {
    let app = TestApp::new();
    let id = app.sign_up("alice", "a@x.com", "p1").await;
    let code = app.code_for(id, OtpPurpose::EmailVerification, 1).await;

    let (status, body) = app.verify(id, &code).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email_verified"], true);

    let (status, body) = app.verify(id, &code).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn expired_code_is_invalid() {
    let app = TestApp::new();
    let id = app.sign_up("alice", "a@x.com", "p1").await;
    let code = app.code_for(id, OtpPurpose::EmailVerification, 1).await;

    app.clock.advance(Duration::seconds(301));

    let (status, _) = app.verify(id, &code).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wrong_code_is_invalid_and_keeps_the_real_one() {
    let app = TestApp::new();
    let id = app.sign_up("alice", "a@x.com", "p1").await;
    let code = app.code_for(id, OtpPurpose::EmailVerification, 1).await;

    let (status, _) = app.verify(id, "WRONGCODE0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.verify(id, &code).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn stored_value_is_not_the_code() {
    let app = TestApp::new();
    let id = app.sign_up("alice", "a@x.com", "p1").await;
    let code = app.code_for(id, OtpPurpose::EmailVerification, 1).await;

    let stored = app
        .otp_store
        .get(&OtpPurpose::EmailVerification.store_key(id))
        .await
        .unwrap()
        .unwrap();
    assert_ne!(stored, code);
    assert_eq!(stored.len(), 64);
}

#[tokio::test]
async fn resend_replaces_previous_code() {
    let app = TestApp::new();
    let id = app.sign_up("alice", "a@x.com", "p1").await;
    let first = app.code_for(id, OtpPurpose::EmailVerification, 1).await;

    let (status, _) = app
        .post("/auth/otp/send", json!({ "email": "a@x.com" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let second = app.code_for(id, OtpPurpose::EmailVerification, 2).await;

    if first != second {
        let (status, _) = app.verify(id, &first).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, _) = app.verify(id, &second).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn resend_restarts_the_lifetime() {
    let app = TestApp::new();
    let id = app.sign_up("alice", "a@x.com", "p1").await;
    app.code_for(id, OtpPurpose::EmailVerification, 1).await;

    app.clock.advance(Duration::seconds(250));
    app.post("/auth/otp/send", json!({ "email": "a@x.com" }))
        .await;
    let code = app.code_for(id, OtpPurpose::EmailVerification, 2).await;

    app.clock.advance(Duration::seconds(250));
    let (status, _) = app.verify(id, &code).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn resend_requires_an_unverified_account() {
    let app = TestApp::new();
    app.verified_user("alice", "a@x.com", "p1").await;

    let (status, _) = app
        .post("/auth/otp/send", json!({ "email": "a@x.com" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post("/auth/otp/send", json!({ "email": "ghost@x.com" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn code_for_deleted_account_conflicts() {
    let app = TestApp::new();
    let id = app.sign_up("alice", "a@x.com", "p1").await;
    let code = app.code_for(id, OtpPurpose::EmailVerification, 1).await;

    app.state.registry.delete(id).await.unwrap();

    let (status, _) = app.verify(id, &code).await;
    assert_eq!(status, StatusCode::CONFLICT);
}
