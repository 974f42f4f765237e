//! Default value functions for configuration fields.
//!
//! Organized by category, same split the teacher uses, so every
//! `#[serde(default = ...)]` attribute has a named, documented function
//! instead of an inline literal.

use super::logging::LogFormat;

// =============================================================================
// Root Config
// =============================================================================

pub const fn default_port() -> u16 {
    3000
}

pub const fn default_use_https() -> bool {
    false
}

pub fn default_room_name_on_startup() -> String {
    "Room".to_string()
}

pub const fn default_max_players() -> u8 {
    8
}

pub const fn default_auto_assign_host() -> bool {
    true
}

pub fn default_time_stamp_format() -> String {
    "%Y-%m-%d %H:%M:%S".to_string()
}

// =============================================================================
// Username Restriction Defaults
// =============================================================================

pub const fn default_no_duplicates() -> bool {
    true
}

pub const fn default_no_empty_names() -> bool {
    true
}

pub const fn default_max_length() -> usize {
    15
}

// =============================================================================
// Level Restriction Defaults
// =============================================================================

pub const fn default_min_level() -> i64 {
    0
}

pub const fn default_max_level() -> i64 {
    i64::MAX
}

pub const fn default_only_allow_numbers() -> bool {
    false
}

pub const fn default_censor_levels() -> bool {
    false
}

// =============================================================================
// Chat Defaults
// =============================================================================

pub const fn default_max_chat_message_length() -> usize {
    140
}

// =============================================================================
// Logging Defaults
// =============================================================================

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "server.log".to_string()
}

pub fn default_rotation() -> String {
    "daily".to_string()
}

pub const fn default_enable_file_logging() -> bool {
    false
}

pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

// =============================================================================
// Security Defaults
// =============================================================================

pub fn default_cors_origins() -> String {
    "*".to_string()
}
