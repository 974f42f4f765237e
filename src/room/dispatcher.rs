//! Inbound opcode routing table (SPEC_FULL.md §4.G). Every handler here
//! assumes `sender_id` already holds an admitted slot — opcode `13`
//! (join) is handled by [`crate::room::admission`] before a connection
//! ever reaches this dispatcher, and opcode `18` (timesync) is answered
//! by [`handle_timesync`] regardless of admission state.

use serde_json::Value;
use tokio::sync::mpsc;

use crate::broadcast::{self, BroadcastTarget, OutboundFrame};
use crate::config::server::RestrictionsConfig;
use crate::protocol::{ErrorCode, Frame};
use crate::rate_limit::{ActionClass, RateLimiter, Verdict};
use crate::room::core::RoomState;
use crate::room::player_table::PlayerId;

/// Answers an inbound `TIMESYNC (18)` `{id}` with outbound `REPLY_TIMESYNC
/// (23)` `{id, result: now_ms}`. Must work even before admission completes
/// (spec.md §4.A), so it takes no room state at all.
pub fn handle_timesync(frame: &Frame, now_ms: u64) -> OutboundFrame {
    let id = frame.arg(0).get("id").cloned().unwrap_or(Value::Null);
    broadcast::frame(
        "23",
        [serde_json::json!({ "id": id, "result": now_ms })],
    )
}

fn is_host(state: &RoomState, sender_id: PlayerId) -> bool {
    state.room.host_id == Some(sender_id)
}

fn deny_not_hosting(outbox: &mpsc::Sender<OutboundFrame>) {
    let frame = broadcast::frame("16", [Value::String(ErrorCode::NotHosting.as_str().to_string())]);
    let _ = outbox.try_send(frame);
}

/// Returns `true` if the action was refused (and, for user-facing classes,
/// has already unicast the mapped `ERROR_MESSAGE`).
fn ratelimited(
    limiter: &RateLimiter,
    state: &RoomState,
    sender_id: PlayerId,
    action: ActionClass,
    outbox: &mpsc::Sender<OutboundFrame>,
) -> bool {
    let Some(addr) = state.players.get(sender_id).map(|s| s.addr) else {
        return true;
    };
    if limiter.hit(addr.ip(), action) == Verdict::Limited {
        if let Some(code) = action.error_code() {
            let frame = broadcast::frame("16", [Value::String(code.as_str().to_string())]);
            let _ = outbox.try_send(frame);
        }
        true
    } else {
        false
    }
}

/// Routes one decoded inbound frame from an admitted player.
pub fn dispatch(
    state: &mut RoomState,
    limiter: &RateLimiter,
    restrictions: &RestrictionsConfig,
    sender_id: PlayerId,
    now_ms: u64,
    auto_assign_host: bool,
    frame: &Frame,
) {
    let Some(outbox) = state.players.get(sender_id).map(|s| s.outbox.clone()) else {
        return;
    };

    match frame.opcode.as_str() {
        "6" => handle_change_own_team(state, limiter, sender_id, frame, &outbox),
        "10" => handle_chat_message(state, limiter, restrictions, sender_id, frame, &outbox),
        "16" => handle_set_ready(state, limiter, sender_id, frame, &outbox),
        "27" => handle_map_request(state, sender_id, frame),
        "35" => handle_friend_request(state, frame),
        "44" => handle_set_tabbed(state, sender_id, frame),
        "7" => handle_lock_teams(state, limiter, sender_id, frame, &outbox),
        "9" => handle_kick_ban(state, sender_id, now_ms, auto_assign_host, frame, &outbox),
        "11" => handle_host_inform_lobby(state, sender_id, frame, &outbox),
        "40" => handle_host_inform_game(state, sender_id, frame, &outbox),
        "20" => handle_change_mode(state, limiter, sender_id, frame, &outbox),
        "21" => handle_change_rounds(state, sender_id, frame, &outbox),
        "23" => handle_change_map(state, limiter, sender_id, frame, &outbox),
        "26" => handle_change_other_team(state, limiter, sender_id, frame, &outbox),
        "29" => handle_change_balance(state, sender_id, frame, &outbox),
        "32" => handle_toggle_teams(state, sender_id, frame, &outbox),
        "34" => handle_transfer_host(state, limiter, sender_id, frame, &outbox),
        "36" => handle_countdown(state, limiter, sender_id, "43", &outbox),
        "37" => handle_countdown(state, limiter, sender_id, "44", &outbox),
        "4" => handle_send_inputs(state, sender_id, frame),
        "5" => handle_start_game(state, limiter, sender_id, now_ms, frame, &outbox),
        "14" => handle_return_to_lobby(state, limiter, sender_id, &outbox),
        "33" => handle_save_replay(state, sender_id),
        other => {
            tracing::warn!(opcode = other, sender = sender_id, "dropping unknown inbound opcode");
        }
    }
}

fn handle_change_own_team(
    state: &mut RoomState,
    limiter: &RateLimiter,
    sender_id: PlayerId,
    frame: &Frame,
    outbox: &mpsc::Sender<OutboundFrame>,
) {
    if ratelimited(limiter, state, sender_id, ActionClass::ChangingTeams, outbox) {
        return;
    }
    if state.room.game_settings.tl && !is_host(state, sender_id) {
        deny_not_hosting(outbox);
        return;
    }
    let Some(team_raw) = frame.arg(0).get("team").and_then(Value::as_u64) else { return };
    let Ok(team) = crate::room::state::Team::try_from(team_raw as u8) else { return };
    if let Some(slot) = state.players.get_mut(sender_id) {
        slot.team = team;
    }
    let f = broadcast::frame("18", [Value::from(sender_id), Value::from(team.as_u8())]);
    state.broadcast_to_all(&f);
}

fn handle_chat_message(
    state: &mut RoomState,
    limiter: &RateLimiter,
    restrictions: &RestrictionsConfig,
    sender_id: PlayerId,
    frame: &Frame,
    outbox: &mpsc::Sender<OutboundFrame>,
) {
    if ratelimited(limiter, state, sender_id, ActionClass::Chatting, outbox) {
        return;
    }
    let Some(msg) = frame.arg(0).get("msg").and_then(Value::as_str) else { return };
    let truncated: String = msg.chars().take(restrictions.max_chat_message_length).collect();
    let Some(name) = state.players.get(sender_id).map(|s| s.user_name.clone()) else { return };

    let f = broadcast::frame("20", [Value::from(sender_id), Value::String(truncated.clone())]);
    state.broadcast_to_all(&f);
    state
        .chat_log
        .append(chrono::Utc::now(), "%Y-%m-%d %H:%M:%S", &format!("{name}: {truncated}"));
}

fn handle_set_ready(
    state: &mut RoomState,
    limiter: &RateLimiter,
    sender_id: PlayerId,
    frame: &Frame,
    outbox: &mpsc::Sender<OutboundFrame>,
) {
    if ratelimited(limiter, state, sender_id, ActionClass::Readying, outbox) {
        return;
    }
    let Some(ready) = frame.arg(0).get("ready").and_then(Value::as_bool) else { return };
    if let Some(slot) = state.players.get_mut(sender_id) {
        slot.ready = ready;
    }
    let f = broadcast::frame("8", [Value::from(sender_id), Value::Bool(ready)]);
    state.broadcast_to_all(&f);
}

fn handle_map_request(state: &mut RoomState, sender_id: PlayerId, frame: &Frame) {
    let mapname = frame.arg(0).get("mapname").cloned().unwrap_or(Value::Null);
    let mapauthor = frame.arg(0).get("mapauthor").cloned().unwrap_or(Value::Null);
    let full_payload = frame.arg(0).get("m").cloned().unwrap_or(Value::Null);
    let name = state.players.get(sender_id).map(|s| s.user_name.clone()).unwrap_or_default();

    match state.room.host_id {
        None => {
            let f = broadcast::frame(
                "34",
                [mapname.clone(), mapauthor.clone(), Value::from(sender_id)],
            );
            state.broadcast_to_all(&f);
        }
        Some(host_id) => {
            let to_others = broadcast::frame(
                "34",
                [mapname.clone(), mapauthor.clone(), Value::from(sender_id)],
            );
            state.broadcast_to_all_except(host_id, &to_others);

            let to_host = broadcast::frame("33", [full_payload, Value::from(sender_id)]);
            state.unicast(host_id, &to_host);
        }
    }

    let mapname_str = mapname.as_str().unwrap_or_default();
    let mapauthor_str = mapauthor.as_str().unwrap_or_default();
    state.chat_log.append(
        chrono::Utc::now(),
        "%Y-%m-%d %H:%M:%S",
        &format!("* {name} has requested the map {mapname_str} by {mapauthor_str}"),
    );
}

fn handle_friend_request(state: &mut RoomState, frame: &Frame) {
    let Some(target) = frame.arg(0).get("targetId").and_then(Value::as_u64) else { return };
    let f = broadcast::frame("42", [frame.arg(0).clone()]);
    state.unicast(target as PlayerId, &f);
}

fn handle_set_tabbed(state: &mut RoomState, sender_id: PlayerId, frame: &Frame) {
    let Some(tabbed) = frame.arg(0).get("tabbed").and_then(Value::as_bool) else { return };
    if let Some(slot) = state.players.get_mut(sender_id) {
        slot.tabbed = tabbed;
    }
    let f = broadcast::frame("52", [Value::from(sender_id), Value::Bool(tabbed)]);
    state.broadcast_to_all(&f);
}

fn handle_lock_teams(
    state: &mut RoomState,
    limiter: &RateLimiter,
    sender_id: PlayerId,
    frame: &Frame,
    outbox: &mpsc::Sender<OutboundFrame>,
) {
    if !is_host(state, sender_id) {
        deny_not_hosting(outbox);
        return;
    }
    if ratelimited(limiter, state, sender_id, ActionClass::ChangingTeams, outbox) {
        return;
    }
    let Some(tl) = frame.arg(0).get("tl").and_then(Value::as_bool) else { return };
    state.room.game_settings.tl = tl;
    let f = broadcast::frame("19", [Value::Bool(tl)]);
    state.broadcast_to_all(&f);
}

fn handle_kick_ban(
    state: &mut RoomState,
    sender_id: PlayerId,
    now_ms: u64,
    auto_assign_host: bool,
    frame: &Frame,
    outbox: &mpsc::Sender<OutboundFrame>,
) {
    if !is_host(state, sender_id) {
        deny_not_hosting(outbox);
        return;
    }
    let Some(target) = frame.arg(0).get("id").and_then(Value::as_u64) else { return };
    let kickonly = frame.arg(0).get("kickonly").and_then(Value::as_bool).unwrap_or(true);
    let target = target as PlayerId;

    if kickonly {
        crate::room::admin_ops::kick_player(state, target, auto_assign_host, now_ms);
    } else {
        crate::room::admin_ops::ban_player(state, target, auto_assign_host, now_ms);
    }
}

fn handle_host_inform_lobby(
    state: &mut RoomState,
    sender_id: PlayerId,
    frame: &Frame,
    outbox: &mpsc::Sender<OutboundFrame>,
) {
    if !is_host(state, sender_id) {
        deny_not_hosting(outbox);
        return;
    }
    let Some(target) = frame.arg(0).get("sid").and_then(Value::as_u64) else { return };
    let gs = frame.arg(0).get("gs").cloned().unwrap_or(Value::Null);
    let f = broadcast::frame("21", [gs]);
    state.unicast(target as PlayerId, &f);
}

fn handle_host_inform_game(
    state: &mut RoomState,
    sender_id: PlayerId,
    frame: &Frame,
    outbox: &mpsc::Sender<OutboundFrame>,
) {
    if !is_host(state, sender_id) {
        deny_not_hosting(outbox);
        return;
    }
    let Some(target) = frame.arg(0).get("sid").and_then(Value::as_u64) else { return };
    let all_data = frame.arg(0).get("allData").cloned().unwrap_or(Value::Null);
    let f = broadcast::frame("48", [all_data]);
    state.unicast(target as PlayerId, &f);
}

fn handle_change_mode(
    state: &mut RoomState,
    limiter: &RateLimiter,
    sender_id: PlayerId,
    frame: &Frame,
    outbox: &mpsc::Sender<OutboundFrame>,
) {
    if !is_host(state, sender_id) {
        deny_not_hosting(outbox);
        return;
    }
    if ratelimited(limiter, state, sender_id, ActionClass::ChangingMode, outbox) {
        return;
    }
    let ga = frame.arg(0).get("ga").and_then(Value::as_str).unwrap_or("b").to_string();
    let mo = frame.arg(0).get("mo").and_then(Value::as_str).unwrap_or("b").to_string();
    state.room.game_settings.ga = ga.clone();
    state.room.game_settings.mo = mo.clone();
    let f = broadcast::frame("26", [Value::String(ga), Value::String(mo)]);
    state.broadcast_to_all(&f);
}

fn handle_change_rounds(
    state: &mut RoomState,
    sender_id: PlayerId,
    frame: &Frame,
    outbox: &mpsc::Sender<OutboundFrame>,
) {
    if !is_host(state, sender_id) {
        deny_not_hosting(outbox);
        return;
    }
    let Some(wl) = frame.arg(0).get("wl").and_then(Value::as_i64) else { return };
    state.room.game_settings.wl = wl;
    let f = broadcast::frame("27", [Value::from(wl)]);
    state.broadcast_to_all(&f);
}

fn handle_change_map(
    state: &mut RoomState,
    limiter: &RateLimiter,
    sender_id: PlayerId,
    frame: &Frame,
    outbox: &mpsc::Sender<OutboundFrame>,
) {
    if !is_host(state, sender_id) {
        deny_not_hosting(outbox);
        return;
    }
    if ratelimited(limiter, state, sender_id, ActionClass::ChangingMap, outbox) {
        return;
    }
    let Some(map) = frame.arg(0).get("map").and_then(Value::as_str) else { return };
    state.room.game_settings.map = map.to_string();
    let f = broadcast::frame("29", [Value::String(map.to_string())]);
    state.broadcast_to_all(&f);
}

fn handle_change_other_team(
    state: &mut RoomState,
    limiter: &RateLimiter,
    sender_id: PlayerId,
    frame: &Frame,
    outbox: &mpsc::Sender<OutboundFrame>,
) {
    if !is_host(state, sender_id) {
        deny_not_hosting(outbox);
        return;
    }
    if ratelimited(limiter, state, sender_id, ActionClass::ChangingTeams, outbox) {
        return;
    }
    let Some(target) = frame.arg(0).get("id").and_then(Value::as_u64) else { return };
    let Some(team_raw) = frame.arg(0).get("team").and_then(Value::as_u64) else { return };
    let Ok(team) = crate::room::state::Team::try_from(team_raw as u8) else { return };
    let target = target as PlayerId;
    if let Some(slot) = state.players.get_mut(target) {
        slot.team = team;
    }
    let f = broadcast::frame("18", [Value::from(target), Value::from(team.as_u8())]);
    state.broadcast_to_all(&f);
}

fn handle_change_balance(
    state: &mut RoomState,
    sender_id: PlayerId,
    frame: &Frame,
    outbox: &mpsc::Sender<OutboundFrame>,
) {
    if !is_host(state, sender_id) {
        deny_not_hosting(outbox);
        return;
    }
    let Some(target) = frame.arg(0).get("id").and_then(Value::as_u64) else { return };
    let Some(balance) = frame.arg(0).get("balance").and_then(Value::as_i64) else { return };
    state.room.game_settings.bal.insert(target as PlayerId, balance);
    let f = broadcast::frame("18", [serde_json::json!({ "id": target, "balance": balance })]);
    state.broadcast_to_all(&f);
}

fn handle_toggle_teams(
    state: &mut RoomState,
    sender_id: PlayerId,
    frame: &Frame,
    outbox: &mpsc::Sender<OutboundFrame>,
) {
    if !is_host(state, sender_id) {
        deny_not_hosting(outbox);
        return;
    }
    let Some(tea) = frame.arg(0).get("tea").and_then(Value::as_bool) else { return };
    state.room.game_settings.tea = tea;
    let f = broadcast::frame("39", [Value::Bool(tea)]);
    state.broadcast_to_all(&f);
}

fn handle_transfer_host(
    state: &mut RoomState,
    limiter: &RateLimiter,
    sender_id: PlayerId,
    frame: &Frame,
    outbox: &mpsc::Sender<OutboundFrame>,
) {
    if !is_host(state, sender_id) {
        deny_not_hosting(outbox);
        return;
    }
    if ratelimited(limiter, state, sender_id, ActionClass::TransferringHost, outbox) {
        return;
    }
    let Some(target) = frame.arg(0).get("id").and_then(Value::as_u64) else { return };
    crate::room::admin_ops::transfer_host(state, target as PlayerId, false);
}

fn handle_countdown(
    state: &mut RoomState,
    limiter: &RateLimiter,
    sender_id: PlayerId,
    outbound_opcode: &str,
    outbox: &mpsc::Sender<OutboundFrame>,
) {
    if !is_host(state, sender_id) {
        deny_not_hosting(outbox);
        return;
    }
    if ratelimited(limiter, state, sender_id, ActionClass::StartGameCountdown, outbox) {
        return;
    }
    let f = broadcast::frame(outbound_opcode, Vec::<Value>::new());
    state.broadcast_to_all(&f);
}

fn handle_send_inputs(state: &mut RoomState, sender_id: PlayerId, frame: &Frame) {
    let data = frame.arg(0).clone();
    let f = broadcast::frame("7", [Value::from(sender_id), data]);
    state.broadcast_to_all_except(sender_id, &f);
}

fn handle_start_game(
    state: &mut RoomState,
    limiter: &RateLimiter,
    sender_id: PlayerId,
    now_ms: u64,
    frame: &Frame,
    outbox: &mpsc::Sender<OutboundFrame>,
) {
    if !is_host(state, sender_id) {
        deny_not_hosting(outbox);
        return;
    }
    if ratelimited(limiter, state, sender_id, ActionClass::StartingEndingGame, outbox) {
        return;
    }
    let gs_value = frame.arg(0).get("gs").cloned().unwrap_or(Value::Null);
    if let Ok(gs) = serde_json::from_value(gs_value.clone()) {
        state.room.game_settings = gs;
    }
    state.room.game_start_time = now_ms;
    let is_value = frame.arg(0).get("is").cloned().unwrap_or(Value::Null);
    let f = broadcast::frame("15", [Value::from(now_ms), is_value, gs_value]);
    state.broadcast_to_all(&f);
}

fn handle_return_to_lobby(
    state: &mut RoomState,
    limiter: &RateLimiter,
    sender_id: PlayerId,
    outbox: &mpsc::Sender<OutboundFrame>,
) {
    if !is_host(state, sender_id) {
        deny_not_hosting(outbox);
        return;
    }
    if ratelimited(limiter, state, sender_id, ActionClass::StartingEndingGame, outbox) {
        return;
    }
    state.room.game_start_time = 0;
    let f = broadcast::frame("13", Vec::<Value>::new());
    state.broadcast_to_all(&f);
}

fn handle_save_replay(state: &mut RoomState, sender_id: PlayerId) {
    let f = broadcast::frame("40", [Value::from(sender_id)]);
    state.broadcast_to_all(&f);
}

/// Handles the departure of `leaving_id`, reassigning host if needed and
/// broadcasting `HOST_LEFT (6)` or `PLAYER_LEFT (5)` (spec.md §4.G). A thin
/// wrapper over [`crate::room::admin_ops::release_slot`], which kick and ban
/// share so that losing a slot behaves the same way regardless of why.
pub fn handle_disconnect(
    state: &mut RoomState,
    leaving_id: PlayerId,
    auto_assign_host: bool,
    now_ms: u64,
) {
    crate::room::admin_ops::release_slot(state, leaving_id, auto_assign_host, now_ms, "left the game");
}
