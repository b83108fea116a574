//! Secret handling utilities.
//!
//! Re-exports the secrecy types used for account tokens.

pub use secrecy::{ExposeSecret, SecretString};
