pub mod capability;
pub mod otp_code;
pub mod principal;
pub mod role;
pub mod user;

pub use capability::{Capability, OwnershipFacts};
pub use otp_code::OtpPurpose;
pub use principal::Principal;
pub use role::{default_roles, parse_roles, Role};
pub use user::{Credential, NewCredential, SubjectId, UserResponse};
