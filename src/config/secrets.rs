//! Secret handling utilities.
//!
//! Re-exports the secrecy types used to carry the findings database URL.

pub use secrecy::{ExposeSecret, SecretString};
