//! # azpager command-line driver
//!
//! Thin front end over the `azpager-client` library:
//!
//! - [`args`] - Command-line definition
//! - [`config`] - Layered configuration (user file, `azpager.toml`, `AZPAGER__*` environment)
//! - [`logger`] - fern logging to stderr or a file
//! - [`commands`] - `list`, `run` and `get`

pub mod args;
pub mod commands;
pub mod config;
pub mod logger;
