mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;
use study_auth::models::OtpPurpose;

#[tokio::test]
async fn sign_up_verify_sign_in_end_to_end() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/auth/sign-up",
            json!({ "username": "alice", "email": "a@x.com", "password": "p1" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["email_verified"], false);
    assert_eq!(body["data"]["roles"], json!(["ROLE_MEMBER"]));
    assert!(body["data"].get("password_hash").is_none());
    let id = body["data"]["id"].as_i64().unwrap();

    let code = app.code_for(id, OtpPurpose::EmailVerification, 1).await;
    let (status, body) = app.verify(id, &code).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email_verified"], true);

    let (status, body) = app.sign_in("alice", "p1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["token"].as_str().unwrap().is_empty());
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["id"], id);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["email"], "a@x.com");
    assert_eq!(body["roles"], json!(["ROLE_MEMBER"]));
    assert!(body["expires_at"].is_string());
}

#[tokio::test]
async fn wrong_password_issues_no_token() {
    let app = TestApp::new();
    app.verified_user("alice", "a@x.com", "p1").await;

    let (status, body) = app.sign_in("alice", "wrong").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert!(body.get("token").is_none());

    let (status, _) = app.sign_in("nobody", "p1").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unverified_account_cannot_sign_in() {
    let app = TestApp::new();
    app.sign_up("alice", "a@x.com", "p1").await;

    let (status, body) = app.sign_in("alice", "p1").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.get("token").is_none());
}

#[tokio::test]
async fn unverified_account_signs_in_when_verification_is_optional() {
    let mut config = common::test_config();
    config.otp.email_verification_required = false;
    let app = TestApp::with_config(config);
    app.sign_up("alice", "a@x.com", "p1").await;

    let (status, _) = app.sign_in("alice", "p1").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn email_identifier_signs_in_case_insensitively() {
    let app = TestApp::new();
    app.verified_user("alice", "Alice@X.com", "p1").await;

    let (status, body) = app.sign_in("alice@x.com", "p1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
}

#[tokio::test]
async fn duplicate_username_or_email_conflicts() {
    let app = TestApp::new();
    app.sign_up("alice", "a@x.com", "p1").await;

    let (status, body) = app
        .post(
            "/auth/sign-up",
            json!({ "username": "alice", "email": "other@x.com", "password": "p1" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (status, _) = app
        .post(
            "/auth/sign-up",
            json!({ "username": "alice2", "email": "a@x.com", "password": "p1" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn requested_roles_go_through_token_table() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/auth/sign-up",
            json!({
                "username": "lead",
                "email": "l@x.com",
                "password": "p1",
                "roles": ["mod", "user"]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["roles"], json!(["ROLE_LEADER", "ROLE_MEMBER"]));

    let (status, _) = app
        .post(
            "/auth/sign-up",
            json!({ "username": "odd", "email": "o@x.com", "password": "p1", "roles": ["owner"] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_sign_up_body_is_rejected() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/auth/sign-up",
            json!({ "username": "alice", "email": "not-an-email", "password": "p1" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);

    let (status, _) = app
        .post("/auth/sign-up", json!({ "username": "alice" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn username_with_at_sign_is_rejected_at_sign_up() {
    let mut config = common::test_config();
    config.otp.email_verification_required = false;
    let app = TestApp::with_config(config);

    let (status, body) = app
        .post(
            "/auth/sign-up",
            json!({ "username": "bob@home", "email": "b@x.com", "password": "p1" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);

    let (status, _) = app.sign_in("b@x.com", "p1").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    app.sign_up("bob", "b@x.com", "p1").await;
    let (status, _) = app.sign_in("bob", "p1").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn sign_in_body_must_carry_identifier() {
    let app = TestApp::new();
    app.verified_user("alice", "a@x.com", "p1").await;

    let (status, body) = app
        .post(
            "/auth/sign-in",
            json!({ "username": "alice", "email": "a@x.com", "password": "p1" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}
