use secrecy::{ExposeSecret, Secret};
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub token: TokenConfig,
    pub otp: OtpConfig,
    pub mail: MailConfig,
    pub security: SecurityConfig,
    pub swagger: SwaggerConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// HMAC key shared by every request worker; read-only after start-up.
    pub signing_secret: Secret<String>,
    pub lifetime_minutes: i64,
    pub issuer: String,
}

#[derive(Debug, Clone)]
pub struct OtpConfig {
    pub code_lifetime_seconds: i64,
    pub confirmation_lifetime_hours: i64,
    pub code_length: usize,
    pub email_verification_required: bool,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_password: Secret<String>,
    pub from_address: String,
    pub public_base_url: String,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub sign_in_attempts: u32,
    pub sign_in_window_seconds: u64,
    pub global_ip_limit: u32,
    pub global_ip_window_seconds: u64,
}

const MIN_SIGNING_SECRET_LEN: usize = 32;

impl AuthConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = AuthConfig {
            common: common_config,
            environment: environment.clone(),
            service_name: get_env("SERVICE_NAME", Some("study-auth"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            database: DatabaseConfig {
                url: Secret::new(get_env("DATABASE_URL", None, is_prod)?),
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", Some("10"), is_prod)?,
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", Some("1"), is_prod)?,
            },
            redis: RedisConfig {
                url: get_env("REDIS_URL", Some("redis://localhost:6379"), is_prod)?,
            },
            token: TokenConfig {
                signing_secret: Secret::new(get_env("TOKEN_SIGNING_SECRET", None, true)?),
                lifetime_minutes: parse_env("TOKEN_LIFETIME_MINUTES", Some("60"), is_prod)?,
                issuer: get_env("TOKEN_ISSUER", Some("study-auth"), is_prod)?,
            },
            otp: OtpConfig {
                code_lifetime_seconds: parse_env("OTP_LIFETIME_SECONDS", Some("300"), is_prod)?,
                confirmation_lifetime_hours: parse_env(
                    "CONFIRMATION_LIFETIME_HOURS",
                    Some("24"),
                    is_prod,
                )?,
                code_length: parse_env("OTP_CODE_LENGTH", Some("10"), is_prod)?,
                email_verification_required: parse_env(
                    "EMAIL_VERIFICATION_REQUIRED",
                    Some("true"),
                    is_prod,
                )?,
            },
            mail: MailConfig {
                smtp_host: get_env("SMTP_HOST", Some("localhost"), is_prod)?,
                smtp_port: parse_env("SMTP_PORT", Some("1025"), is_prod)?,
                smtp_user: get_env("SMTP_USER", Some(""), is_prod)?,
                smtp_password: Secret::new(get_env("SMTP_PASSWORD", Some(""), is_prod)?),
                from_address: get_env("MAIL_FROM", Some("noreply@study.local"), is_prod)?,
                public_base_url: get_env(
                    "PUBLIC_BASE_URL",
                    Some("http://localhost:8080"),
                    is_prod,
                )?,
            },
            security: SecurityConfig {
                allowed_origins: get_env(
                    "ALLOWED_ORIGINS",
                    Some("http://localhost:3000"),
                    is_prod,
                )?
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            },
            swagger: SwaggerConfig {
                enabled: parse_env("SWAGGER_ENABLED", Some("true"), is_prod)?,
            },
            rate_limit: RateLimitConfig {
                sign_in_attempts: parse_env("RATE_LIMIT_SIGN_IN_ATTEMPTS", Some("5"), is_prod)?,
                sign_in_window_seconds: parse_env(
                    "RATE_LIMIT_SIGN_IN_WINDOW_SECONDS",
                    Some("900"),
                    is_prod,
                )?,
                global_ip_limit: parse_env("RATE_LIMIT_GLOBAL_IP_LIMIT", Some("100"), is_prod)?,
                global_ip_window_seconds: parse_env(
                    "RATE_LIMIT_GLOBAL_IP_WINDOW_SECONDS",
                    Some("60"),
                    is_prod,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.token.signing_secret.expose_secret().len() < MIN_SIGNING_SECRET_LEN {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "TOKEN_SIGNING_SECRET must be at least {} bytes",
                MIN_SIGNING_SECRET_LEN
            )));
        }

        if self.token.lifetime_minutes <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "TOKEN_LIFETIME_MINUTES must be positive"
            )));
        }

        if self.otp.code_lifetime_seconds <= 0 || self.otp.confirmation_lifetime_hours <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "OTP_LIFETIME_SECONDS and CONFIRMATION_LIFETIME_HOURS must be positive"
            )));
        }

        if !(6..=64).contains(&self.otp.code_length) {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "OTP_CODE_LENGTH must be between 6 and 64"
            )));
        }

        if self.environment == Environment::Prod
            && self.security.allowed_origins.iter().any(|o| o == "*")
        {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Wildcard CORS origin not allowed in production"
            )));
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: Option<&str>, is_prod: bool) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, default, is_prod)?.trim().parse().map_err(|e: T::Err| {
        AppError::ConfigError(anyhow::anyhow!("{} has an invalid value: {}", key, e))
    })
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample_config() -> AuthConfig {
        AuthConfig {
            common: core_config::Config::default(),
            environment: Environment::Dev,
            service_name: "study-auth-test".to_string(),
            service_version: "0.0.0".to_string(),
            log_level: "debug".to_string(),
            otlp_endpoint: None,
            database: DatabaseConfig {
                url: Secret::new("postgres://localhost/study_auth".to_string()),
                max_connections: 5,
                min_connections: 1,
            },
            redis: RedisConfig {
                url: "redis://localhost:6379".to_string(),
            },
            token: TokenConfig {
                signing_secret: Secret::new("0123456789abcdef0123456789abcdef".to_string()),
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
                smtp_host: "smtp.example.com".to_string(),
                smtp_port: 587,
                smtp_user: "mailer".to_string(),
                smtp_password: Secret::new("secret".to_string()),
                from_address: "noreply@example.com".to_string(),
                public_base_url: "http://localhost:8080".to_string(),
            },
            security: SecurityConfig {
                allowed_origins: vec!["http://localhost:3000".to_string()],
            },
            swagger: SwaggerConfig { enabled: false },
            rate_limit: RateLimitConfig {
                sign_in_attempts: 5,
                sign_in_window_seconds: 900,
                global_ip_limit: 100,
                global_ip_window_seconds: 60,
            },
        }
    }

    #[test]
    fn accepts_sample_config() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn rejects_short_signing_secret() {
        let mut config = sample_config();
        config.token.signing_secret = Secret::new("short".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_code_length() {
        let mut config = sample_config();
        config.otp.code_length = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_wildcard_origin_in_prod() {
        let mut config = sample_config();
        config.environment = Environment::Prod;
        config.security.allowed_origins = vec!["*".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_environment_names() {
        assert_eq!("PROD".parse::<Environment>().unwrap(), Environment::Prod);
        assert!("staging".parse::<Environment>().is_err());
    }
}
