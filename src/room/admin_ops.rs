//! Host/console administrative operations (SPEC_FULL.md §4.I): kicking,
//! banning, host transfer, room metadata edits, and the scheduled-close
//! shutdown sequence. Unlike the dispatcher, callers here are trusted —
//! either an already-verified host action or the local admin console —
//! so there is no ratelimit or permission check inside these functions.

use serde_json::Value;

use crate::broadcast::{self, BroadcastTarget};
use crate::room::core::{RoomState, ScheduledClose};
use crate::room::player_table::PlayerId;

/// Releases `leaving_id`'s slot the same way a disconnect does (spec.md
/// §4.G): if it held the host and `auto_assign_host` permits it, pick the
/// first remaining occupied slot and broadcast `HOST_LEFT (6)`; otherwise
/// clear the host if it was the leaver and broadcast `PLAYER_LEFT (5)`.
/// Shared by [`crate::room::dispatcher::handle_disconnect`] and the
/// kick/ban operations below, which release a slot under the same rules
/// a voluntary disconnect does — kicking or banning the host should not
/// leave the room hostless when disconnecting it wouldn't.
pub(crate) fn release_slot(
    state: &mut RoomState,
    leaving_id: PlayerId,
    auto_assign_host: bool,
    now_ms: u64,
    log_verb: &str,
) {
    let Some(name) = state.players.get(leaving_id).map(|s| s.user_name.clone()) else {
        return;
    };
    let was_host = state.room.host_id == Some(leaving_id);
    let tick_count = if state.room.game_start_time > 0 && now_ms >= state.room.game_start_time {
        ((now_ms - state.room.game_start_time) as f64 / (1000.0 / 30.0)).round() as i64
    } else {
        0
    };

    if was_host && auto_assign_host {
        let new_host = state.players.iterate().map(|s| s.id).find(|&id| id != leaving_id);
        state.room.host_id = new_host;
        state.players.release(leaving_id);
        let f = broadcast::frame(
            "6",
            [
                Value::from(leaving_id),
                new_host.map(Value::from).unwrap_or(Value::from(-1)),
                Value::from(tick_count),
            ],
        );
        state.broadcast_to_all(&f);
        state.chat_log.append(
            chrono::Utc::now(),
            "%Y-%m-%d %H:%M:%S",
            &format!("* {name} {log_verb} (host reassigned)"),
        );
    } else {
        if was_host {
            state.room.host_id = None;
        }
        state.players.release(leaving_id);
        let f = broadcast::frame("5", [Value::from(leaving_id), Value::from(tick_count)]);
        state.broadcast_to_all(&f);
        state.chat_log.append(
            chrono::Utc::now(),
            "%Y-%m-%d %H:%M:%S",
            &format!("* {name} {log_verb}"),
        );
    }
}

/// Disconnects `target` without adding it to the ban list. The actual
/// socket teardown happens when the websocket layer notices the slot was
/// released and closes the connection; this only updates room state and
/// notifies everyone.
pub fn kick_player(state: &mut RoomState, target: PlayerId, auto_assign_host: bool, now_ms: u64) {
    release_slot(state, target, auto_assign_host, now_ms, "was kicked from the room");
}

/// Kicks `target` and additionally records its address/username in the
/// ban list so it cannot rejoin.
pub fn ban_player(state: &mut RoomState, target: PlayerId, auto_assign_host: bool, now_ms: u64) {
    let Some(slot) = state.players.get(target) else {
        return;
    };
    let addr = slot.addr;
    let name = slot.user_name.clone();
    state.ban_list.add(addr.ip(), name);
    release_slot(state, target, auto_assign_host, now_ms, "was banned from the room");
}

/// Removes a username's entry from the ban list. Returns `true` if an
/// entry was found and removed.
pub fn unban(state: &mut RoomState, username: &str) -> bool {
    state.ban_list.remove(username).is_some()
}

/// Names of every currently-occupied slot, for the admin console.
pub fn list_players(state: &RoomState) -> Vec<(PlayerId, String)> {
    state.players.iterate().map(|s| (s.id, s.user_name.clone())).collect()
}

pub fn set_room_name(state: &mut RoomState, name: String) {
    state.room.room_name = name;
}

pub fn set_password(state: &mut RoomState, password: Option<String>) {
    state.room.password = password;
}

/// Reassigns `host_id` to `new_host` and broadcasts `TRANSFER_HOST (41)`.
/// Silently no-ops if `new_host` does not hold a slot. `admin_initiated`
/// reports the `oldHost` field as the `-1` sentinel per spec.md §4.I
/// ("broadcasts TRANSFER_HOST with oldHost=-1 sentinel when initiated
/// from admin"); the in-game, host-driven opcode-34 path reports the
/// real previous host instead.
pub fn transfer_host(state: &mut RoomState, new_host: PlayerId, admin_initiated: bool) {
    if !state.players.is_occupied(new_host) {
        return;
    }
    let old_host = state.room.host_id;
    state.room.host_id = Some(new_host);

    let reported_old_host: i64 = if admin_initiated {
        -1
    } else {
        old_host.map(|h| h as i64).unwrap_or(-1)
    };

    let name = state.players.get(new_host).map(|s| s.user_name.clone()).unwrap_or_default();
    let f = broadcast::frame(
        "41",
        [serde_json::json!({ "oldHost": reported_old_host, "newHost": new_host })],
    );
    state.broadcast_to_all(&f);
    state.chat_log.append(
        chrono::Utc::now(),
        "%Y-%m-%d %H:%M:%S",
        &format!("* {name} is now the game host"),
    );
}

/// Flushes the in-memory chat log to `<dir>/<timestamp>.txt`.
pub async fn save_chat_log(
    state: &mut RoomState,
    dir: &std::path::Path,
    timestamp: &str,
) -> Result<(), crate::room::chat_log::ChatLogError> {
    state.chat_log.flush(dir, timestamp).await
}

/// Marks the room closed to new joins (admission's stage 1 rejects every
/// subsequent `JOIN_REQUEST`), strips the host, and — if `force_after_ms`
/// is given — arms a deadline after which the process exits even if
/// players remain. The console loop is responsible for polling
/// `players.count() == 0` and for the deadline once armed.
pub fn schedule_close(state: &mut RoomState, force_after_ms: Option<u64>, now_ms: u64) {
    state.room.closed = true;
    state.room.host_id = None;
    state.scheduled_close = Some(ScheduledClose {
        force_stop_at: force_after_ms.map(|delta| now_ms + delta),
    });
}

pub fn abort_scheduled_close(state: &mut RoomState) {
    state.room.closed = false;
    state.scheduled_close = None;
}

/// Whether the scheduled close should now cause a process exit: either
/// the room emptied out, or the force-stop deadline passed.
pub fn scheduled_close_due(state: &RoomState, now_ms: u64) -> bool {
    let Some(close) = state.scheduled_close else { return false };
    if state.players.count() == 0 {
        return true;
    }
    match close.force_stop_at {
        Some(deadline) => now_ms >= deadline,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::ban_list::BanList;
    use crate::room::chat_log::ChatLog;
    use crate::room::player_table::{PlayerSlot, PlayerTable};
    use crate::room::state::{GameSettings, Room, Team};
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use tokio::sync::mpsc;

    fn test_addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 5000)
    }

    fn state_with_one_player() -> (RoomState, mpsc::Receiver<crate::broadcast::OutboundFrame>) {
        let mut players = PlayerTable::new();
        let (tx, rx) = mpsc::channel(16);
        let id = players.allocate(|id| PlayerSlot {
            id,
            user_name: "alice".into(),
            guest: false,
            level: "5".into(),
            team: Team::Ffa,
            avatar: Value::Null,
            ready: false,
            tabbed: false,
            peer_id: "invalid",
            addr: test_addr(),
            outbox: tx,
        });
        let mut room = Room::new("lobby".into(), None, GameSettings::default());
        room.host_id = Some(id);
        let state = RoomState {
            room,
            players,
            ban_list: BanList::default(),
            chat_log: ChatLog::new(),
            scheduled_close: None,
        };
        (state, rx)
    }

    #[test]
    fn kick_player_releases_slot_and_clears_host() {
        let (mut state, _rx) = state_with_one_player();
        kick_player(&mut state, 0, true, 0);
        assert!(!state.players.is_occupied(0));
        assert_eq!(state.room.host_id, None);
    }

    #[test]
    fn ban_player_adds_to_ban_list() {
        let (mut state, _rx) = state_with_one_player();
        ban_player(&mut state, 0, true, 0);
        assert!(state.ban_list.is_banned(test_addr().ip()));
        assert!(!state.players.is_occupied(0));
    }

    #[test]
    fn kicking_host_reassigns_when_auto_assign_host() {
        let mut players = PlayerTable::new();
        let (tx_a, _rx_a) = mpsc::channel(16);
        let (tx_b, mut rx_b) = mpsc::channel(16);
        let a = players.allocate(|id| PlayerSlot {
            id, user_name: "alice".into(), guest: false, level: "5".into(),
            team: Team::Ffa, avatar: Value::Null, ready: false, tabbed: false,
            peer_id: "invalid", addr: test_addr(), outbox: tx_a,
        });
        players.allocate(|id| PlayerSlot {
            id, user_name: "bob".into(), guest: false, level: "3".into(),
            team: Team::Ffa, avatar: Value::Null, ready: false, tabbed: false,
            peer_id: "invalid", addr: test_addr(), outbox: tx_b,
        });
        let mut room = Room::new("lobby".into(), None, GameSettings::default());
        room.host_id = Some(a);
        let mut state = RoomState {
            room,
            players,
            ban_list: BanList::default(),
            chat_log: ChatLog::new(),
            scheduled_close: None,
        };

        kick_player(&mut state, a, true, 0);
        assert_eq!(state.room.host_id, Some(1));
        let frame = rx_b.try_recv().unwrap();
        assert!(frame.starts_with(r#"["6","#));
    }

    #[test]
    fn kicking_host_without_auto_assign_leaves_room_hostless() {
        let mut players = PlayerTable::new();
        let (tx_a, _rx_a) = mpsc::channel(16);
        let (tx_b, mut rx_b) = mpsc::channel(16);
        let a = players.allocate(|id| PlayerSlot {
            id, user_name: "alice".into(), guest: false, level: "5".into(),
            team: Team::Ffa, avatar: Value::Null, ready: false, tabbed: false,
            peer_id: "invalid", addr: test_addr(), outbox: tx_a,
        });
        players.allocate(|id| PlayerSlot {
            id, user_name: "bob".into(), guest: false, level: "3".into(),
            team: Team::Ffa, avatar: Value::Null, ready: false, tabbed: false,
            peer_id: "invalid", addr: test_addr(), outbox: tx_b,
        });
        let mut room = Room::new("lobby".into(), None, GameSettings::default());
        room.host_id = Some(a);
        let mut state = RoomState {
            room,
            players,
            ban_list: BanList::default(),
            chat_log: ChatLog::new(),
            scheduled_close: None,
        };

        kick_player(&mut state, a, false, 0);
        assert_eq!(state.room.host_id, None);
        let frame = rx_b.try_recv().unwrap();
        assert!(frame.starts_with(r#"["5","#));
    }

    #[test]
    fn unban_removes_entry() {
        let (mut state, _rx) = state_with_one_player();
        state.ban_list.add(test_addr().ip(), "alice".into());
        assert!(unban(&mut state, "alice"));
        assert!(!state.ban_list.is_banned(test_addr().ip()));
    }

    #[test]
    fn schedule_close_marks_room_closed_and_strips_host() {
        let (mut state, _rx) = state_with_one_player();
        schedule_close(&mut state, Some(60_000), 1_000);
        assert!(state.room.closed);
        assert_eq!(state.room.host_id, None);
        assert!(!scheduled_close_due(&state, 1_000));
        assert!(scheduled_close_due(&state, 61_001));
    }

    #[test]
    fn scheduled_close_due_once_room_empties() {
        let (mut state, _rx) = state_with_one_player();
        schedule_close(&mut state, None, 0);
        assert!(!scheduled_close_due(&state, 0));
        state.players.release(0);
        assert!(scheduled_close_due(&state, 0));
    }

    #[test]
    fn abort_scheduled_close_reopens_room() {
        let (mut state, _rx) = state_with_one_player();
        schedule_close(&mut state, None, 0);
        abort_scheduled_close(&mut state);
        assert!(!state.room.closed);
        assert!(!scheduled_close_due(&state, 0));
    }

    #[test]
    fn transfer_host_broadcasts_and_updates() {
        let mut players = PlayerTable::new();
        let (tx_a, mut rx_a) = mpsc::channel(16);
        let (tx_b, _rx_b) = mpsc::channel(16);
        let a = players.allocate(|id| PlayerSlot {
            id, user_name: "alice".into(), guest: false, level: "5".into(),
            team: Team::Ffa, avatar: Value::Null, ready: false, tabbed: false,
            peer_id: "invalid", addr: test_addr(), outbox: tx_a,
        });
        let b = players.allocate(|id| PlayerSlot {
            id, user_name: "bob".into(), guest: false, level: "3".into(),
            team: Team::Ffa, avatar: Value::Null, ready: false, tabbed: false,
            peer_id: "invalid", addr: test_addr(), outbox: tx_b,
        });
        let mut room = Room::new("lobby".into(), None, GameSettings::default());
        room.host_id = Some(a);
        let mut state = RoomState {
            room,
            players,
            ban_list: BanList::default(),
            chat_log: ChatLog::new(),
            scheduled_close: None,
        };

        transfer_host(&mut state, b, false);
        assert_eq!(state.room.host_id, Some(b));
        let frame = rx_a.try_recv().unwrap();
        assert!(frame.contains("41"));
        assert!(frame.contains(r#""oldHost":0"#));
    }

    #[test]
    fn admin_initiated_transfer_reports_minus_one_old_host() {
        let mut players = PlayerTable::new();
        let (tx_a, mut rx_a) = mpsc::channel(16);
        let (tx_b, _rx_b) = mpsc::channel(16);
        let a = players.allocate(|id| PlayerSlot {
            id, user_name: "alice".into(), guest: false, level: "5".into(),
            team: Team::Ffa, avatar: Value::Null, ready: false, tabbed: false,
            peer_id: "invalid", addr: test_addr(), outbox: tx_a,
        });
        let b = players.allocate(|id| PlayerSlot {
            id, user_name: "bob".into(), guest: false, level: "3".into(),
            team: Team::Ffa, avatar: Value::Null, ready: false, tabbed: false,
            peer_id: "invalid", addr: test_addr(), outbox: tx_b,
        });
        let mut room = Room::new("lobby".into(), None, GameSettings::default());
        room.host_id = Some(a);
        let mut state = RoomState {
            room,
            players,
            ban_list: BanList::default(),
            chat_log: ChatLog::new(),
            scheduled_close: None,
        };

        transfer_host(&mut state, b, true);
        assert_eq!(state.room.host_id, Some(b));
        let frame = rx_a.try_recv().unwrap();
        assert!(frame.contains(r#""oldHost":-1"#));
    }
}
