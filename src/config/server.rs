//! Room restriction and ratelimit configuration.
//!
//! Mirrors spec §6's `restrictions.{usernames, levels, maxChatMessageLength,
//! ratelimits}` block exactly. Consulted by `room::admission` and
//! `rate_limit::RateLimiter`.

use super::defaults::{
    default_censor_levels, default_max_chat_message_length, default_max_length,
    default_max_level, default_min_level, default_no_duplicates, default_no_empty_names,
    default_only_allow_numbers,
};
use crate::rate_limit::{ActionClass, RatelimitRule};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RestrictionsConfig {
    #[serde(default)]
    pub usernames: UsernameRestrictions,
    #[serde(default)]
    pub levels: LevelRestrictions,
    #[serde(default = "default_max_chat_message_length")]
    pub max_chat_message_length: usize,
    #[serde(default = "default_ratelimits")]
    pub ratelimits: HashMap<ActionClass, RatelimitRule>,
}

impl Default for RestrictionsConfig {
    fn default() -> Self {
        Self {
            usernames: UsernameRestrictions::default(),
            levels: LevelRestrictions::default(),
            max_chat_message_length: default_max_chat_message_length(),
            ratelimits: default_ratelimits(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UsernameRestrictions {
    #[serde(default = "default_no_duplicates")]
    pub no_duplicates: bool,
    #[serde(default = "default_no_empty_names")]
    pub no_empty_names: bool,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    /// Optional regex a username must NOT match to be accepted.
    #[serde(default)]
    pub disallow_regex: Option<String>,
}

impl Default for UsernameRestrictions {
    fn default() -> Self {
        Self {
            no_duplicates: default_no_duplicates(),
            no_empty_names: default_no_empty_names(),
            max_length: default_max_length(),
            disallow_regex: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LevelRestrictions {
    #[serde(default = "default_min_level")]
    pub min_level: i64,
    #[serde(default = "default_max_level")]
    pub max_level: i64,
    #[serde(default = "default_only_allow_numbers")]
    pub only_allow_numbers: bool,
    #[serde(default = "default_censor_levels")]
    pub censor_levels: bool,
}

impl Default for LevelRestrictions {
    fn default() -> Self {
        Self {
            min_level: default_min_level(),
            max_level: default_max_level(),
            only_allow_numbers: default_only_allow_numbers(),
            censor_levels: default_censor_levels(),
        }
    }
}

/// Ratelimit defaults for every action class, used when a deployment's
/// config omits the `ratelimits` map entirely.
fn default_ratelimits() -> HashMap<ActionClass, RatelimitRule> {
    let mut rules = HashMap::new();
    rules.insert(
        ActionClass::Joining,
        RatelimitRule { amount: 10, timeframe_secs: 10, restore_secs: 10 },
    );
    rules.insert(
        ActionClass::Chatting,
        RatelimitRule { amount: 5, timeframe_secs: 3, restore_secs: 3 },
    );
    rules.insert(
        ActionClass::ChangingTeams,
        RatelimitRule { amount: 5, timeframe_secs: 3, restore_secs: 3 },
    );
    rules.insert(
        ActionClass::Readying,
        RatelimitRule { amount: 5, timeframe_secs: 3, restore_secs: 3 },
    );
    rules.insert(
        ActionClass::TransferringHost,
        RatelimitRule { amount: 3, timeframe_secs: 5, restore_secs: 5 },
    );
    rules.insert(
        ActionClass::ChangingMode,
        RatelimitRule { amount: 5, timeframe_secs: 3, restore_secs: 3 },
    );
    rules.insert(
        ActionClass::ChangingMap,
        RatelimitRule { amount: 5, timeframe_secs: 3, restore_secs: 3 },
    );
    rules.insert(
        ActionClass::StartGameCountdown,
        RatelimitRule { amount: 3, timeframe_secs: 3, restore_secs: 3 },
    );
    rules.insert(
        ActionClass::StartingEndingGame,
        RatelimitRule { amount: 3, timeframe_secs: 3, restore_secs: 3 },
    );
    rules
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ratelimits_cover_every_action_class() {
        let rules = default_ratelimits();
        for action in ActionClass::ALL {
            assert!(rules.contains_key(&action), "missing rule for {action:?}");
        }
    }
}
