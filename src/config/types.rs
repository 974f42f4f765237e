//! Root configuration type.

use super::defaults::{
    default_auto_assign_host, default_max_players, default_port, default_room_name_on_startup,
    default_time_stamp_format, default_use_https,
};
use super::logging::LoggingConfig;
use super::security::SecurityConfig;
use super::server::RestrictionsConfig;
use crate::room::state::GameSettings;
use serde::{Deserialize, Serialize};

/// Root configuration struct, mirroring spec §6's Configuration block.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_use_https")]
    pub use_https: bool,
    #[serde(default = "default_room_name_on_startup")]
    pub room_name_on_startup: String,
    #[serde(default)]
    pub room_password_on_startup: Option<String>,
    #[serde(default)]
    pub default_game_settings: GameSettings,
    #[serde(default = "default_max_players")]
    pub max_players: u8,
    #[serde(default = "default_auto_assign_host")]
    pub auto_assign_host: bool,
    #[serde(default = "default_time_stamp_format")]
    pub time_stamp_format: String,
    #[serde(default)]
    pub restrictions: RestrictionsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            use_https: default_use_https(),
            room_name_on_startup: default_room_name_on_startup(),
            room_password_on_startup: None,
            default_game_settings: GameSettings::default(),
            max_players: default_max_players(),
            auto_assign_host: default_auto_assign_host(),
            time_stamp_format: default_time_stamp_format(),
            restrictions: RestrictionsConfig::default(),
            logging: LoggingConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}
