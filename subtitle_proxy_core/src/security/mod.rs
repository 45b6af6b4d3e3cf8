//! Credential protection

pub mod secure_string;

pub use secure_string::SecureString;
