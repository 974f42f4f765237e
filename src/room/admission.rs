//! The 14-stage connection admission pipeline run against a decoded
//! `JOIN_REQUEST` (inbound opcode `13`), SPEC_FULL.md §4.F.

use serde_json::Value;
use std::net::SocketAddr;
use tokio::sync::mpsc;

use crate::broadcast::{self, BroadcastTarget, OutboundFrame};
use crate::config::server::RestrictionsConfig;
use crate::protocol::ErrorCode;
use crate::rate_limit::{ActionClass, RateLimiter, Verdict};
use crate::room::core::RoomState;
use crate::room::player_table::{PlayerId, PlayerSlot};
use crate::room::state::Team;

#[derive(Debug, Clone)]
pub struct JoinRequest {
    pub user_name: String,
    pub guest: bool,
    pub level: String,
    pub avatar: Value,
    pub room_password: Option<String>,
}

impl JoinRequest {
    /// Parses the args of an inbound `JOIN_REQUEST (13)` frame:
    /// `{userName, guest, level, avatar, roomPassword}`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let user_name = obj.get("userName")?.as_str()?.to_string();
        let guest = obj.get("guest").and_then(Value::as_bool).unwrap_or(false);
        let level = match obj.get("level") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        let avatar = obj.get("avatar").cloned().unwrap_or(Value::Null);
        let room_password = obj
            .get("roomPassword")
            .and_then(Value::as_str)
            .map(str::to_string);
        Some(Self { user_name, guest, level, avatar, room_password })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum AdmissionOutcome {
    Admitted { id: PlayerId },
    /// Stage 3: the connection already has a slot. Silently ignored, no
    /// error emitted (spec.md §4.F).
    AlreadyJoined,
    Rejected(ErrorCode),
}

/// Runs the admission pipeline and, on success, allocates the slot and
/// emits the `SERVER_INFORM`/`PLAYER_JOINED`/host-impersonation packets
/// itself. On rejection, unicasts `ERROR_MESSAGE` to `outbox` directly
/// (the connection is never closed by the server; spec.md §7).
#[allow(clippy::too_many_arguments)]
pub fn admit(
    state: &mut RoomState,
    limiter: &RateLimiter,
    restrictions: &RestrictionsConfig,
    max_players: u8,
    auto_assign_host: bool,
    addr: SocketAddr,
    current_slot: Option<PlayerId>,
    request: JoinRequest,
    outbox: mpsc::Sender<OutboundFrame>,
) -> AdmissionOutcome {
    macro_rules! reject {
        ($code:expr) => {{
            let frame = broadcast::frame(
                "16",
                [Value::String($code.as_str().to_string())],
            );
            let _ = outbox.try_send(frame);
            return AdmissionOutcome::Rejected($code);
        }};
    }

    if state.room.closed {
        reject!(ErrorCode::RoomClosed);
    }

    if state.ban_list.is_banned(addr) {
        reject!(ErrorCode::Banned);
    }

    if current_slot.is_some() {
        return AdmissionOutcome::AlreadyJoined;
    }

    if limiter.hit(addr.ip(), ActionClass::Joining) == Verdict::Limited {
        reject!(ErrorCode::JoinRateLimited);
    }

    if restrictions.usernames.no_duplicates
        && state.players.find_by_name(&request.user_name).is_some()
    {
        reject!(ErrorCode::AlreadyInThisRoom);
    }

    if request.user_name.len() > restrictions.usernames.max_length {
        reject!(ErrorCode::UsernameTooLong);
    }

    if restrictions.usernames.no_empty_names && request.user_name.is_empty() {
        reject!(ErrorCode::UsernameEmpty);
    }

    if let Some(pattern) = &restrictions.usernames.disallow_regex {
        if let Ok(re) = regex::Regex::new(pattern) {
            if re.is_match(&request.user_name) {
                reject!(ErrorCode::UsernameInvalid);
            }
        }
    }

    if restrictions.levels.min_level > 0 && request.guest {
        reject!(ErrorCode::GuestsNotAllowed);
    }

    let level_numeric: i64 = request.level.parse().unwrap_or(0);

    if level_numeric < restrictions.levels.min_level {
        reject!(ErrorCode::PlayersXpTooLow);
    }

    if level_numeric > restrictions.levels.max_level {
        reject!(ErrorCode::PlayersXpTooHigh);
    }

    if restrictions.levels.only_allow_numbers && !request.level.chars().all(|c| c.is_ascii_digit())
    {
        reject!(ErrorCode::PlayerXpInvalid);
    }

    if !state.room.password_matches(request.room_password.as_deref()) {
        reject!(ErrorCode::PasswordWrong);
    }

    if state.players.count() >= max_players as usize {
        reject!(ErrorCode::RoomFull);
    }

    let tl = state.room.game_settings.tl;
    let censor = restrictions.levels.censor_levels;
    let stored_level = if censor { "-".to_string() } else { request.level.clone() };

    let user_name = request.user_name.clone();
    let guest = request.guest;
    let avatar = request.avatar.clone();
    let outbox_for_slot = outbox.clone();

    let id = state.players.allocate(move |id| PlayerSlot {
        id,
        user_name,
        guest,
        level: stored_level,
        team: if tl { Team::Spectate } else { Team::Ffa },
        avatar,
        ready: false,
        tabbed: false,
        peer_id: "invalid",
        addr,
        outbox: outbox_for_slot,
    });

    let host_id = state.room.host_id;
    let wire_level = state.players.get(id).map(|s| s.wire_level(censor).to_string()).unwrap_or_default();

    // hostIdOrYouIfAutoAssign (spec.md §4.F): report the real host if one
    // exists; otherwise only claim "you" when auto-assign will actually
    // make it true below, else -1 (no host, same sentinel HOST_LEFT uses).
    let reported_host = match host_id {
        Some(h) => h as i64,
        None if auto_assign_host => id as i64,
        None => -1,
    };

    let inform = broadcast::frame(
        "3",
        [
            Value::from(id),
            Value::from(reported_host),
            Value::Array(vec![]),
            Value::from(state.room.game_start_time),
            Value::Bool(tl),
            Value::from(0),
            Value::String("invalid".to_string()),
            Value::Null,
        ],
    );
    let _ = outbox.try_send(inform);

    let joined = broadcast::frame(
        "4",
        [
            Value::from(id),
            Value::String("invalid".to_string()),
            Value::String(request.user_name.clone()),
            Value::Bool(request.guest),
            Value::String(wire_level),
            Value::from(state.players.get(id).map(|s| s.team.as_u8()).unwrap_or(0)),
            request.avatar.clone(),
        ],
    );
    state.broadcast(&BroadcastTarget::room_except(state.players.iterate().map(|s| s.id), id), &joined);

    state.chat_log.append(
        chrono::Utc::now(),
        "%Y-%m-%d %H:%M:%S",
        &format!("* {} joined the game", request.user_name),
    );

    if state.room.host_id.is_none() && auto_assign_host {
        state.room.host_id = Some(id);
        let host_inform = broadcast::frame(
            "21",
            [serde_json::to_value(&state.room.game_settings).unwrap_or(Value::Null)],
        );
        let _ = outbox.try_send(host_inform);
    }

    AdmissionOutcome::Admitted { id }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::ban_list::BanList;
    use crate::room::chat_log::ChatLog;
    use crate::room::player_table::PlayerTable;
    use crate::room::state::{GameSettings, Room};
    use std::net::{IpAddr, Ipv4Addr};
    use std::collections::HashMap;

    fn addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 9000)
    }

    fn fresh_state() -> RoomState {
        RoomState {
            room: Room::new("lobby".into(), None, GameSettings::default()),
            players: PlayerTable::new(),
            ban_list: BanList::default(),
            chat_log: ChatLog::new(),
            scheduled_close: None,
        }
    }

    fn limiter() -> RateLimiter {
        RateLimiter::new(HashMap::new())
    }

    fn request(name: &str) -> JoinRequest {
        JoinRequest {
            user_name: name.to_string(),
            guest: false,
            level: "5".to_string(),
            avatar: Value::Null,
            room_password: None,
        }
    }

    #[test]
    fn first_join_becomes_host_when_auto_assign() {
        let mut state = fresh_state();
        let limiter = limiter();
        let restrictions = RestrictionsConfig::default();
        let (tx, _rx) = mpsc::channel(8);

        let outcome = admit(&mut state, &limiter, &restrictions, 8, true, addr(), None, request("alice"), tx);
        assert_eq!(outcome, AdmissionOutcome::Admitted { id: 0 });
        assert_eq!(state.room.host_id, Some(0));
    }

    #[test]
    fn server_inform_reports_self_as_host_only_when_auto_assigning() {
        let mut state = fresh_state();
        let limiter = limiter();
        let restrictions = RestrictionsConfig::default();
        let (tx, mut rx) = mpsc::channel(8);

        admit(&mut state, &limiter, &restrictions, 8, true, addr(), None, request("alice"), tx);
        let inform = rx.try_recv().unwrap();
        assert!(inform.starts_with(r#"["3",0,0,"#), "expected host field 0 (self), got {inform}");
    }

    #[test]
    fn server_inform_reports_no_host_sentinel_without_auto_assign() {
        let mut state = fresh_state();
        let limiter = limiter();
        let restrictions = RestrictionsConfig::default();
        let (tx, mut rx) = mpsc::channel(8);

        admit(&mut state, &limiter, &restrictions, 8, false, addr(), None, request("alice"), tx);
        assert_eq!(state.room.host_id, None);
        let inform = rx.try_recv().unwrap();
        assert!(inform.starts_with(r#"["3",0,-1,"#), "expected host field -1 (no host), got {inform}");
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut state = fresh_state();
        let limiter = limiter();
        let restrictions = RestrictionsConfig::default();
        let (tx1, _rx1) = mpsc::channel(8);
        let (tx2, _rx2) = mpsc::channel(8);

        admit(&mut state, &limiter, &restrictions, 8, true, addr(), None, request("alice"), tx1);
        let outcome = admit(&mut state, &limiter, &restrictions, 8, true, addr(), None, request("alice"), tx2);
        assert_eq!(outcome, AdmissionOutcome::Rejected(ErrorCode::AlreadyInThisRoom));
        assert_eq!(state.players.count(), 1);
    }

    #[test]
    fn banned_address_is_rejected() {
        let mut state = fresh_state();
        state.ban_list.add(addr().ip(), "evil".into());
        let limiter = limiter();
        let restrictions = RestrictionsConfig::default();
        let (tx, _rx) = mpsc::channel(8);

        let outcome = admit(&mut state, &limiter, &restrictions, 8, true, addr(), None, request("bob"), tx);
        assert_eq!(outcome, AdmissionOutcome::Rejected(ErrorCode::Banned));
    }

    #[test]
    fn room_full_is_rejected() {
        let mut state = fresh_state();
        let limiter = limiter();
        let restrictions = RestrictionsConfig::default();
        let (tx1, _rx1) = mpsc::channel(8);
        let (tx2, _rx2) = mpsc::channel(8);

        admit(&mut state, &limiter, &restrictions, 1, true, addr(), None, request("alice"), tx1);
        let outcome = admit(&mut state, &limiter, &restrictions, 1, true, addr(), None, request("bob"), tx2);
        assert_eq!(outcome, AdmissionOutcome::Rejected(ErrorCode::RoomFull));
    }

    #[test]
    fn already_joined_connection_is_silently_ignored() {
        let mut state = fresh_state();
        let limiter = limiter();
        let restrictions = RestrictionsConfig::default();
        let (tx, _rx) = mpsc::channel(8);

        let outcome = admit(&mut state, &limiter, &restrictions, 8, true, addr(), Some(0), request("alice"), tx);
        assert_eq!(outcome, AdmissionOutcome::AlreadyJoined);
        assert_eq!(state.players.count(), 0);
    }

    #[test]
    fn wrong_password_is_rejected() {
        let mut state = fresh_state();
        state.room.password = Some("secret".into());
        let limiter = limiter();
        let restrictions = RestrictionsConfig::default();
        let (tx, _rx) = mpsc::channel(8);

        let outcome = admit(&mut state, &limiter, &restrictions, 8, true, addr(), None, request("alice"), tx);
        assert_eq!(outcome, AdmissionOutcome::Rejected(ErrorCode::PasswordWrong));
    }

    #[test]
    fn username_exactly_at_max_length_is_accepted() {
        let mut state = fresh_state();
        let limiter = limiter();
        let mut restrictions = RestrictionsConfig::default();
        restrictions.usernames.max_length = 5;
        let (tx, _rx) = mpsc::channel(8);

        let outcome = admit(&mut state, &limiter, &restrictions, 8, true, addr(), None, request("abcde"), tx);
        assert_eq!(outcome, AdmissionOutcome::Admitted { id: 0 });
    }

    #[test]
    fn username_one_over_max_length_is_rejected() {
        let mut state = fresh_state();
        let limiter = limiter();
        let mut restrictions = RestrictionsConfig::default();
        restrictions.usernames.max_length = 5;
        let (tx, _rx) = mpsc::channel(8);

        let outcome = admit(&mut state, &limiter, &restrictions, 8, true, addr(), None, request("abcdef"), tx);
        assert_eq!(outcome, AdmissionOutcome::Rejected(ErrorCode::UsernameTooLong));
    }
}
