//! Shared foundation for the salescope workspace.
//!
//! This crate holds the pieces every other crate leans on:
//! - `config` - layered configuration (defaults, `salescope.toml`, env, overrides)
//! - `credentials` - scoped credential provider with an explicit lifecycle
//! - `errors` - application/interface error taxonomy for the HTTP boundary
//! - `profile` - agent profile definitions and product-based routing

pub mod config;
pub mod credentials;
pub mod errors;
pub mod profile;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
pub use credentials::{
    AccessToken, CredentialError, CredentialProvider, StaticTokenSource, TokenSource,
};
pub use errors::{ApplicationError, InterfaceError};
pub use profile::{AgentProfile, ColumnDoc, ProfileRouter};
