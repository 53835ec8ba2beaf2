//! Shared setup for study-auth integration tests.
//!
//! Every test gets its own in-memory credential and OTP stores, a manual clock
//! and a mailer that records codes instead of sending them.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use secrecy::Secret;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use study_auth::{
    build_router,
    config::{
        AuthConfig, DatabaseConfig, Environment, MailConfig, OtpConfig, RateLimitConfig,
        RedisConfig, SecurityConfig, SwaggerConfig, TokenConfig,
    },
    models::{OtpPurpose, Role, SubjectId},
    services::{InMemoryCredentialStore, InMemoryOtpStore, ManualClock, RecordingMailer, SentMail},
    AppState,
};
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test-signing-secret-0123456789abcdef";

pub fn test_config() -> AuthConfig {
    AuthConfig {
        common: service_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "study-auth-test".to_string(),
        service_version: "0.0.0".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: Secret::new("postgres://unused".to_string()),
            max_connections: 1,
            min_connections: 1,
        },
        redis: RedisConfig {
            url: "redis://unused".to_string(),
        },
        token: TokenConfig {
            signing_secret: Secret::new(TEST_SECRET.to_string()),
            lifetime_minutes: 60,
            issuer: "study-auth".to_string(),
        },
        otp: OtpConfig {
            code_lifetime_seconds: 300,
            confirmation_lifetime_hours: 24,
            code_length: 10,
            email_verification_required: true,
        },
        mail: MailConfig {
            smtp_host: "localhost".to_string(),
            smtp_port: 1025,
            smtp_user: String::new(),
            smtp_password: Secret::new(String::new()),
            from_address: "noreply@example.com".to_string(),
            public_base_url: "http://localhost:8080".to_string(),
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        swagger: SwaggerConfig { enabled: false },
        rate_limit: RateLimitConfig {
            sign_in_attempts: 100,
            sign_in_window_seconds: 60,
            global_ip_limit: 1000,
            global_ip_window_seconds: 60,
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub clock: ManualClock,
    pub mailer: RecordingMailer,
    pub otp_store: Arc<InMemoryOtpStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AuthConfig) -> Self {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        let mailer = RecordingMailer::new();
        let otp_store = Arc::new(InMemoryOtpStore::new(Arc::new(clock.clone())));

        let state = AppState::new(
            config,
            Arc::new(InMemoryCredentialStore::new()),
            otp_store.clone(),
            Arc::new(mailer.clone()),
            Arc::new(clock.clone()),
        );

        Self {
            router: build_router(state.clone()),
            state,
            clock,
            mailer,
            otp_store,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body), None).await
    }

    pub async fn sign_up(&self, username: &str, email: &str, password: &str) -> SubjectId {
        let (status, body) = self
            .post(
                "/auth/sign-up",
                json!({ "username": username, "email": email, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "sign-up failed: {}", body);
        body["data"]["id"].as_i64().unwrap()
    }

    /// Wait until `count` mails have been dispatched and return them.
    pub async fn sent_mail(&self, count: usize) -> Vec<SentMail> {
        let sent = self.mailer.wait_for(count).await;
        assert!(
            sent.len() >= count,
            "expected {} mails, got {}",
            count,
            sent.len()
        );
        sent
    }

    /// The latest code mailed to `subject_id`, once `count` mails have gone out.
    pub async fn code_for(
        &self,
        subject_id: SubjectId,
        purpose: OtpPurpose,
        count: usize,
    ) -> String {
        self.sent_mail(count)
            .await
            .into_iter()
            .rev()
            .find(|m| m.subject_id == subject_id && m.purpose == purpose)
            .map(|m| m.code)
            .expect("no code mailed for subject")
    }

    pub async fn verify(&self, subject_id: SubjectId, code: &str) -> (StatusCode, Value) {
        self.post(
            "/auth/otp/verify",
            json!({ "subject_id": subject_id, "code": code }),
        )
        .await
    }

    /// Sign up and verify; returns the subject id.
    pub async fn verified_user(&self, username: &str, email: &str, password: &str) -> SubjectId {
        let before = self.mailer.sent().len();
        let id = self.sign_up(username, email, password).await;
        let code = self
            .code_for(id, OtpPurpose::EmailVerification, before + 1)
            .await;
        let (status, body) = self.verify(id, &code).await;
        assert_eq!(status, StatusCode::OK, "verification failed: {}", body);
        id
    }

    pub async fn sign_in(&self, identifier: &str, password: &str) -> (StatusCode, Value) {
        self.post(
            "/auth/sign-in",
            json!({ "identifier": identifier, "password": password }),
        )
        .await
    }

    pub async fn request_password_reset(&self, email: &str) -> (StatusCode, Value) {
        self.post("/auth/password-reset/request", json!({ "email": email }))
            .await
    }

    pub async fn token_for(&self, identifier: &str, password: &str) -> String {
        let (status, body) = self.sign_in(identifier, password).await;
        assert_eq!(status, StatusCode::OK, "sign-in failed: {}", body);
        body["token"].as_str().unwrap().to_string()
    }

    /// Give `subject_id` the ADMIN role directly through the registry.
    pub async fn make_admin(&self, subject_id: SubjectId) {
        self.state
            .registry
            .set_roles(subject_id, BTreeSet::from([Role::Member, Role::Admin]))
            .await
            .unwrap();
    }
}

pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}
