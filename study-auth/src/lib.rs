pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use service_core::axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AuthConfig;
use crate::services::{
    AuthenticationService, Clock, CredentialRegistry, CredentialStore, Mailer, OneTimeCodes,
    OtpStore, OtpVerificationFlow, PasswordResetFlow, PromotionService, TokenService,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::auth::sign_up,
        handlers::auth::sign_in,
        handlers::otp::send_code,
        handlers::otp::verify_code,
        handlers::password::request_password_reset,
        handlers::password::confirm_password_reset,
        handlers::user::get_me,
        handlers::user::delete_me,
        handlers::admin::grant_admin,
        handlers::admin::revoke_admin,
        handlers::admin::grant_leader,
        handlers::admin::revoke_leader,
    ),
    components(
        schemas(
            dtos::auth::SignUpRequest,
            dtos::auth::SignUpResponse,
            dtos::auth::SignInRequest,
            dtos::auth::SignInResponse,
            dtos::auth::SendOtpRequest,
            dtos::auth::VerifyOtpRequest,
            dtos::auth::PasswordResetRequest,
            dtos::auth::PasswordResetConfirm,
            dtos::MessageResponse,
            dtos::ErrorResponse,
            models::UserResponse,
            models::Role,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Sign-up, sign-in and one-time codes"),
        (name = "User", description = "Current user"),
        (name = "Admin", description = "Role promotion"),
        (name = "Observability", description = "Service health and monitoring"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: AuthConfig,
    pub registry: CredentialRegistry,
    pub tokens: TokenService,
    pub auth: AuthenticationService,
    pub verification: Arc<OtpVerificationFlow>,
    pub password_reset: PasswordResetFlow,
    pub promotion: PromotionService,
    pub otp_store: Arc<dyn OtpStore>,
    pub sign_in_rate_limiter: IpRateLimiter,
    pub ip_rate_limiter: IpRateLimiter,
}

impl AppState {
    /// Wire the services over the given storage, mail and time backends.
    pub fn new(
        config: AuthConfig,
        credentials: Arc<dyn CredentialStore>,
        otp_store: Arc<dyn OtpStore>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let registry = CredentialRegistry::new(credentials);
        let tokens = TokenService::with_clock(&config.token, clock);
        let codes = OneTimeCodes::new(otp_store.clone(), config.otp.code_length);

        let verification = Arc::new(OtpVerificationFlow::new(
            codes.clone(),
            registry.clone(),
            mailer.clone(),
            &config.otp,
        ));
        let password_reset = PasswordResetFlow::new(codes, registry.clone(), mailer, &config.otp);
        let auth = AuthenticationService::new(
            registry.clone(),
            verification.clone(),
            tokens.clone(),
            config.otp.email_verification_required,
        );
        let promotion = PromotionService::new(registry.clone());

        let sign_in_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.sign_in_attempts,
            config.rate_limit.sign_in_window_seconds,
        );
        let ip_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.global_ip_limit,
            config.rate_limit.global_ip_window_seconds,
        );

        Self {
            config,
            registry,
            tokens,
            auth,
            verification,
            password_reset,
            promotion,
            otp_store,
            sign_in_rate_limiter,
            ip_rate_limiter,
        }
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed_origins.iter().filter_map(|o| {
            o.parse::<HeaderValue>()
                .map_err(|e| tracing::error!("Invalid CORS origin '{}': {}", o, e))
                .ok()
        }))
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

pub fn build_router(state: AppState) -> Router {
    let sign_in_route = Router::new()
        .route("/auth/sign-in", post(handlers::sign_in))
        .layer(from_fn_with_state(
            state.sign_in_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let mut app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics));

    if state.config.swagger.enabled {
        app = app.merge(
            SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()),
        );
    }

    app.route("/auth/sign-up", post(handlers::sign_up))
        .merge(sign_in_route)
        .route("/auth/otp/send", post(handlers::send_code))
        .route("/auth/otp/verify", post(handlers::verify_code))
        .route(
            "/auth/password-reset/request",
            post(handlers::request_password_reset),
        )
        .route(
            "/auth/password-reset/confirm",
            post(handlers::confirm_password_reset),
        )
        .route(
            "/users/me",
            get(handlers::get_me).delete(handlers::delete_me),
        )
        .route(
            "/admin/users/:id/admin",
            post(handlers::grant_admin).delete(handlers::revoke_admin),
        )
        .route(
            "/admin/users/:id/leader",
            post(handlers::grant_leader).delete(handlers::revoke_leader),
        )
        .layer(from_fn_with_state(state.clone(), middleware::authenticate))
        .with_state(state.clone())
        .layer(from_fn_with_state(
            state.ip_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ))
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &service_core::axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config.security.allowed_origins))
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 503, description = "A dependency is down")
    ),
    tag = "Observability"
)]
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.registry.store().health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Credential store health check failed");
        AppError::ServiceUnavailable
    })?;

    state.otp_store.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "OTP store health check failed");
        AppError::ServiceUnavailable
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "credentials": "up",
            "otp_store": "up"
        }
    })))
}
