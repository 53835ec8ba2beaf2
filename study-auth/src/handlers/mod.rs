pub mod admin;
pub mod auth;
pub mod metrics;
pub mod otp;
pub mod password;
pub mod user;

pub use admin::{grant_admin, grant_leader, revoke_admin, revoke_leader};
pub use auth::{sign_in, sign_up};
pub use otp::{send_code, verify_code};
pub use password::{confirm_password_reset, request_password_reset};
pub use user::{delete_me, get_me};
