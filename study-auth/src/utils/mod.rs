pub mod password;
pub mod validation;

pub use password::{
    hash_password, verify_password, verify_password_for_missing_account, Password,
    PasswordHashString,
};
pub use validation::ValidatedJson;
