//! Assembly of a ready-to-use [`ServiceClient`] from a [`ClientConfig`].
//!
//! ```no_run
//! use client::auth::EnvTokenCredential;
//! use client::builder::{ClientBuilder, ClientConfig, ListOptions};
//!
//! # async fn run() -> client::common::ClientResult<()> {
//! let config = ClientConfig::new("https://management.azure.com")
//!     .with_api_version("2022-12-01");
//! let client = ClientBuilder::new(config)
//!     .credential(EnvTokenCredential::new())
//!     .build()?;
//!
//! let subscriptions: Vec<serde_json::Value> = client
//!     .list("subscriptions", ListOptions::default())?
//!     .collect_all()
//!     .await?;
//! println!("{} subscriptions", subscriptions.len());
//! # Ok(())
//! # }
//! ```

pub mod client_builder;
pub mod config;
pub mod service_client;

pub use client_builder::ClientBuilder;
pub use config::{ClientConfig, ConfigValidationError};
pub use service_client::{ListOptions, LroOptions, ServiceClient};
