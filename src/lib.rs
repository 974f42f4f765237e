#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_excessive_bools,
    clippy::too_many_arguments,
    clippy::too_many_lines,
    clippy::similar_names
)]

//! # Bonk Room Server
//!
//! A single-room, in-memory WebSocket game server speaking the legacy
//! `bonk.io`-style opcode-array protocol. No database, no cloud services —
//! run the binary and connect via WebSocket.

/// Optimized broadcast message handling
pub mod broadcast;

/// Server configuration and environment variables
pub mod config;

/// Admin console (stdin command loop)
pub mod console;

/// Structured logging configuration
pub mod logging;

/// WebSocket message protocol definitions
pub mod protocol;

/// Rate limiting implementation
pub mod rate_limit;

/// Room state, admission, dispatch, and admin operations
pub mod room;

/// TLS termination (`tls` feature)
#[cfg(feature = "tls")]
pub mod security;

/// WebSocket connection handling
pub mod websocket;
