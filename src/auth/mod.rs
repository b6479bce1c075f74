//! Authentication primitives: password hashing, JWTs, one-time codes and the
//! request extractor that resolves the calling user.

pub mod extractor;
pub mod otp;
pub mod password;
pub mod token;

pub use extractor::CurrentUser;
pub use otp::{generate_code, hash_code};
pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenPair, TokenService, TokenType};
