//! Small helpers shared by the credential and configuration code.
//!
//! ```no_run
//! use client::utils::EnvUtils;
//!
//! if EnvUtils::has_non_empty_var("AZPAGER_TOKEN") {
//!     let token = EnvUtils::get_validated_var("AZPAGER_TOKEN")?;
//!     println!("token has {} characters", token.len());
//! }
//! # Ok::<(), client::utils::EnvVarError>(())
//! ```

pub mod env;

pub use env::{EnvUtils, EnvVarError};
