//! Room-wide state: the singleton `Room`, `GameSettings`, and the `Team`
//! enum. Plain field containers with accessors — invariant maintenance
//! lives in the dispatcher and admin ops, not here (SPEC_FULL.md §4.E).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::room::player_table::PlayerId;

/// A player's team assignment. `0` is the spectate team; `1` is the
/// free-for-all pool; `2..=5` are the four colored teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Team {
    Spectate = 0,
    Ffa = 1,
    Red = 2,
    Blue = 3,
    Green = 4,
    Yellow = 5,
}

impl Team {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Team {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Team::Spectate),
            1 => Ok(Team::Ffa),
            2 => Ok(Team::Red),
            3 => Ok(Team::Blue),
            4 => Ok(Team::Green),
            5 => Ok(Team::Yellow),
            _ => Err(()),
        }
    }
}

/// Opaque-ish record preserved across sessions (SPEC_FULL.md §3). Most
/// fields are relayed verbatim to unmodified clients and are intentionally
/// loosely typed (`map` is an encoded string blob; `bal` maps player id to
/// an integer balance percentage, absent entry implying 0).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSettings {
    #[serde(default)]
    pub map: String,
    /// Game type tag ("gt" on the wire).
    #[serde(default)]
    pub gt: i64,
    /// Rounds-to-win ("wl" on the wire).
    #[serde(default)]
    pub wl: i64,
    /// Quickplay flag.
    #[serde(default)]
    pub q: bool,
    /// Teams locked: only the host may change any player's team.
    #[serde(default)]
    pub tl: bool,
    /// Teams-on flag.
    #[serde(default)]
    pub tea: bool,
    /// Engine tag, "b" (ball) or "f" (football-ish).
    #[serde(default = "default_ga")]
    pub ga: String,
    /// Mode tag, e.g. "b", "bs", "ar".
    #[serde(default = "default_mo")]
    pub mo: String,
    /// Player id to integer balance percentage. Absent entry implies 0.
    #[serde(default)]
    pub bal: HashMap<PlayerId, i64>,
}

fn default_ga() -> String {
    "b".to_string()
}

fn default_mo() -> String {
    "b".to_string()
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            map: String::new(),
            gt: 0,
            wl: 1,
            q: false,
            tl: false,
            tea: false,
            ga: default_ga(),
            mo: default_mo(),
            bal: HashMap::new(),
        }
    }
}

impl GameSettings {
    /// Balance percentage for a player id, 0 if unset.
    pub fn balance_for(&self, id: PlayerId) -> i64 {
        self.bal.get(&id).copied().unwrap_or(0)
    }
}

/// The singleton room. `host_id == NO_HOST` means no host is currently
/// assigned.
#[derive(Debug, Clone)]
pub struct Room {
    pub host_id: Option<PlayerId>,
    pub room_name: String,
    pub password: Option<String>,
    pub game_settings: GameSettings,
    /// Wall-clock milliseconds the current game started; 0 means lobby.
    pub game_start_time: u64,
    pub closed: bool,
}

impl Room {
    pub fn new(room_name: String, password: Option<String>, game_settings: GameSettings) -> Self {
        Self {
            host_id: None,
            room_name,
            password,
            game_settings,
            game_start_time: 0,
            closed: false,
        }
    }

    /// Derived from `game_start_time`; the server runs no physics in
    /// either state (SPEC_FULL.md / GLOSSARY "Lobby vs in-game").
    pub fn in_game(&self) -> bool {
        self.game_start_time != 0
    }

    pub fn password_matches(&self, attempt: Option<&str>) -> bool {
        match (&self.password, attempt) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(expected), Some(given)) => expected == given,
        }
    }

    /// JSON blob for the `GET /` HTTP metadata endpoint (SPEC_FULL.md §4.N).
    pub fn metadata(&self, player_count: usize, max_players: u8) -> Value {
        serde_json::json!({
            "isBonkServer": true,
            "roomname": self.room_name,
            "password": if self.password.is_some() { 1 } else { 0 },
            "players": player_count,
            "maxplayers": max_players,
            "mode_ga": self.game_settings.ga,
            "mode_mo": self.game_settings.mo,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_round_trips_through_u8() {
        for raw in 0u8..=5 {
            let team = Team::try_from(raw).unwrap();
            assert_eq!(team.as_u8(), raw);
        }
        assert!(Team::try_from(6).is_err());
    }

    #[test]
    fn password_matching() {
        let mut room = Room::new("lobby".into(), None, GameSettings::default());
        assert!(room.password_matches(None));
        assert!(room.password_matches(Some("anything")));

        room.password = Some("secret".into());
        assert!(!room.password_matches(None));
        assert!(!room.password_matches(Some("wrong")));
        assert!(room.password_matches(Some("secret")));
    }

    #[test]
    fn in_game_derived_from_start_time() {
        let mut room = Room::new("lobby".into(), None, GameSettings::default());
        assert!(!room.in_game());
        room.game_start_time = 12345;
        assert!(room.in_game());
    }

    #[test]
    fn balance_defaults_to_zero() {
        let settings = GameSettings::default();
        assert_eq!(settings.balance_for(3), 0);
    }
}
