//! Wire-exact error code strings sent inside `ERROR_MESSAGE` (outbound
//! opcode `16`) frames.
//!
//! Unlike typical internal error enums, the `Display`/wire representation
//! of these codes IS the payload the client receives — there is no
//! separate human-readable description layer on the wire. `description()`
//! exists purely for server-side logs.

use serde::Serialize;
use std::fmt;

/// A reason an admission attempt, a host-only action, or a ratelimited
/// action was rejected, carried verbatim as the sole string argument of an
/// `ERROR_MESSAGE` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    RoomClosed,
    Banned,
    JoinRateLimited,
    AlreadyInThisRoom,
    UsernameTooLong,
    UsernameEmpty,
    UsernameInvalid,
    GuestsNotAllowed,
    PlayersXpTooLow,
    PlayersXpTooHigh,
    PlayerXpInvalid,
    PasswordWrong,
    RoomFull,
    NotHosting,
    ChatRateLimit,
    RateLimitTeams,
    RateLimitReady,
    HostChangeRateLimited,
}

impl ErrorCode {
    /// The literal wire string, e.g. `"already_in_this_room"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RoomClosed => "room_closed",
            Self::Banned => "banned",
            Self::JoinRateLimited => "join_rate_limited",
            Self::AlreadyInThisRoom => "already_in_this_room",
            Self::UsernameTooLong => "username_too_long",
            Self::UsernameEmpty => "username_empty",
            Self::UsernameInvalid => "username_invalid",
            Self::GuestsNotAllowed => "guests_not_allowed",
            Self::PlayersXpTooLow => "players_xp_too_low",
            Self::PlayersXpTooHigh => "players_xp_too_high",
            Self::PlayerXpInvalid => "player_xp_invalid",
            Self::PasswordWrong => "password_wrong",
            Self::RoomFull => "room_full",
            Self::NotHosting => "not_hosting",
            Self::ChatRateLimit => "chat_rate_limit",
            Self::RateLimitTeams => "rate_limit_teams",
            Self::RateLimitReady => "rate_limit_ready",
            Self::HostChangeRateLimited => "host_change_rate_limited",
        }
    }

    /// Human-readable description for server-side logs only; never sent
    /// on the wire.
    pub fn description(self) -> &'static str {
        match self {
            Self::RoomClosed => "the room is closed and is no longer accepting joins",
            Self::Banned => "the connecting address is on the ban list",
            Self::JoinRateLimited => "too many join attempts from this address",
            Self::AlreadyInThisRoom => "a player with this username is already in the room",
            Self::UsernameTooLong => "username exceeds the configured maximum length",
            Self::UsernameEmpty => "username is empty and empty names are disallowed",
            Self::UsernameInvalid => "username matches the disallowed-name pattern",
            Self::GuestsNotAllowed => "guests are disallowed when a minimum level is set",
            Self::PlayersXpTooLow => "reported level is below the configured minimum",
            Self::PlayersXpTooHigh => "reported level is above the configured maximum",
            Self::PlayerXpInvalid => "reported level is not numeric",
            Self::PasswordWrong => "room password did not match",
            Self::RoomFull => "room has reached its maximum player count",
            Self::NotHosting => "action requires host privileges",
            Self::ChatRateLimit => "chat messages are arriving too quickly",
            Self::RateLimitTeams => "team changes are arriving too quickly",
            Self::RateLimitReady => "ready toggles are arriving too quickly",
            Self::HostChangeRateLimited => "host transfers are arriving too quickly",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &[ErrorCode] = &[
        ErrorCode::RoomClosed,
        ErrorCode::Banned,
        ErrorCode::JoinRateLimited,
        ErrorCode::AlreadyInThisRoom,
        ErrorCode::UsernameTooLong,
        ErrorCode::UsernameEmpty,
        ErrorCode::UsernameInvalid,
        ErrorCode::GuestsNotAllowed,
        ErrorCode::PlayersXpTooLow,
        ErrorCode::PlayersXpTooHigh,
        ErrorCode::PlayerXpInvalid,
        ErrorCode::PasswordWrong,
        ErrorCode::RoomFull,
        ErrorCode::NotHosting,
        ErrorCode::ChatRateLimit,
        ErrorCode::RateLimitTeams,
        ErrorCode::RateLimitReady,
        ErrorCode::HostChangeRateLimited,
    ];

    #[test]
    fn display_matches_wire_string() {
        assert_eq!(ErrorCode::AlreadyInThisRoom.to_string(), "already_in_this_room");
        assert_eq!(ErrorCode::NotHosting.to_string(), "not_hosting");
    }

    #[test]
    fn serialization_matches_wire_string() {
        for code in ALL {
            let json = serde_json::to_string(code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn all_codes_have_non_empty_descriptions() {
        for code in ALL {
            assert!(!code.description().is_empty());
        }
    }
}
