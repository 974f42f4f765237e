//! Wire protocol: the opcode-array codec and the literal error codes it
//! carries. See the opcode tables in SPEC_FULL.md §6 for the authoritative
//! inbound/outbound vocabulary; this module only provides the generic
//! envelope, not per-opcode payload types — the dispatcher (`crate::room`)
//! builds and consumes `serde_json::Value` args directly, since payload
//! shapes vary per opcode and several fields (`avatar`, `map`) are opaque
//! blobs that must round-trip byte-for-byte.

pub mod codec;
pub mod error_codes;

pub use codec::{decode, encode, CodecError, Frame};
pub use error_codes::ErrorCode;
