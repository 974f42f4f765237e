//! Configuration module.
//!
//! This module provides configuration management with support for:
//! - JSON configuration files
//! - Environment variable overrides
//! - Stdin input
//! - Sensible defaults
//!
//! # Module Structure
//!
//! - [`types`]: Root `Config` struct
//! - [`server`]: Room restrictions and ratelimit rules
//! - [`security`]: CORS and TLS settings
//! - [`logging`]: Logging configuration
//! - [`loader`]: Configuration loading functions
//! - [`validation`]: Configuration validation functions
//! - [`defaults`]: Default value functions

pub mod defaults;
pub mod loader;
pub mod logging;
pub mod security;
pub mod server;
pub mod types;
pub mod validation;

pub use loader::load;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use security::{SecurityConfig, TlsServerConfig};
pub use server::{LevelRestrictions, RestrictionsConfig, UsernameRestrictions};
pub use types::Config;
pub use validation::validate_config_security;
