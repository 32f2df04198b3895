//! # uilog-extras
//!
//! Optional integrations for `uilog`, opt-in via Cargo feature flags.
//!
//! ## Features
//!
//! - `layer` - `NetworkCaptureLayer`, a tower layer that records outbound
//!   HTTP calls for error correlation
//! - `client` - `InstrumentedClient`, a `reqwest::Client` wrapper doing the same
//! - `config` - Session configuration from environment variables and `.env` files
//! - `full` - All features enabled
//!
//! ## Example
//!
//! ```toml
//! [dependencies]
//! uilog-extras = { version = "0.1", features = ["layer", "config"] }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// Request body previews shared by the capture integrations
pub mod preview;

// Tower layer for outbound services
#[cfg(feature = "layer")]
pub mod layer;

// Instrumented reqwest client
#[cfg(feature = "client")]
pub mod client;

// Configuration management module
#[cfg(feature = "config")]
pub mod config;

pub use preview::BodyPreview;

#[cfg(feature = "layer")]
pub use layer::{NetworkCaptureLayer, NetworkCaptureService};

#[cfg(feature = "client")]
pub use client::InstrumentedClient;

#[cfg(feature = "config")]
pub use config::{load_dotenv, load_dotenv_from, session_config_from_env, ConfigError};
