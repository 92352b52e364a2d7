//! Bearer credentials consumed by the HTTP pipeline.
//!
//! Acquiring tokens (device code, client secret, managed identity) is out of
//! scope here: callers bring a [`TokenCredential`]. The pipeline asks the
//! [`TokenCache`] first and only reaches the credential when the cached token
//! is missing or close to expiry.

pub mod credential;
pub mod token_cache;

pub use credential::{AccessToken, EnvTokenCredential, StaticTokenCredential, TokenCredential};
pub use token_cache::TokenCache;
