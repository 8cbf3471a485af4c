//! Credential hashing and session tokens for the ticket desk

pub mod jwt;
pub mod password;

pub use jwt::{IssuedToken, JwtError, SessionClaims, SessionTokens};
pub use password::{hash_password, verify_password, PasswordError};
