//! TLS termination, gated behind the `tls` feature.

#[cfg(feature = "tls")]
pub mod tls;

#[cfg(feature = "tls")]
pub use tls::build_rustls_config;
