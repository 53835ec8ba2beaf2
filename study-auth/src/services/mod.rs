pub mod auth;
pub mod authz;
pub mod clock;
pub mod credential_store;
pub mod database;
pub mod email;
pub mod error;
pub mod metrics;
pub mod otp;
pub mod otp_store;
pub mod password_reset;
pub mod promotion;
pub mod registry;
pub mod token;

pub use auth::{AuthenticationService, Session, SignUp};
pub use authz::AuthorizationResolver;
pub use clock::{Clock, ManualClock, SystemClock};
pub use credential_store::{CredentialStore, InMemoryCredentialStore};
pub use database::PgCredentialStore;
pub use email::{Mailer, RecordingMailer, SentMail, SmtpMailer};
pub use error::AuthError;
pub use otp::{OneTimeCodes, OtpVerificationFlow};
pub use otp_store::{InMemoryOtpStore, OtpStore, RedisOtpStore};
pub use password_reset::PasswordResetFlow;
pub use promotion::PromotionService;
pub use registry::{is_valid_username, CreateCredential, CredentialRegistry};
pub use token::{IssuedToken, SessionClaims, TokenError, TokenService};
