//! The room aggregate and the coarse lock that serializes every mutation
//! (SPEC_FULL.md §5 concurrency model). `RoomServer` is the shared handle
//! every connection task holds; `RoomState` is the guarded payload.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

use crate::broadcast::{BroadcastTarget, OutboundFrame};
use crate::config::Config;
use crate::rate_limit::RateLimiter;
use crate::room::ban_list::BanList;
use crate::room::chat_log::ChatLog;
use crate::room::player_table::PlayerTable;
use crate::room::state::Room;

/// Wall-clock milliseconds since the Unix epoch, used for `gameStartTime`
/// and tick-count arithmetic (SPEC_FULL.md §4.G disconnect handling).
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Everything a handler may mutate, serialized behind one lock per
/// spec.md §5: a single coarse mutex guarding the whole room is one of
/// the two acceptable strategies, and the simpler one for a
/// single-process, single-room server.
pub struct RoomState {
    pub room: Room,
    pub players: PlayerTable,
    pub ban_list: BanList,
    pub chat_log: ChatLog,
    /// Set by `scheduledClose`; cleared by `abortScheduledClose`.
    pub scheduled_close: Option<ScheduledClose>,
}

#[derive(Debug, Clone, Copy)]
pub struct ScheduledClose {
    /// Wall-clock ms after which the process force-exits even if players remain.
    pub force_stop_at: Option<u64>,
}

/// The shared, cross-task handle. The ratelimiter lives outside the room
/// lock: its per-address counters are independent of room state and may
/// be touched by connections that haven't joined a slot yet (the
/// admission path itself is ratelimited before any slot exists).
pub struct RoomServer {
    pub config: Config,
    pub rate_limiter: RateLimiter,
    pub ban_list_path: PathBuf,
    pub chat_log_dir: PathBuf,
    state: Mutex<RoomState>,
}

impl RoomServer {
    pub fn new(config: Config, ban_list: BanList, ban_list_path: PathBuf, chat_log_dir: PathBuf) -> Self {
        let room = Room::new(
            config.room_name_on_startup.clone(),
            config.room_password_on_startup.clone(),
            config.default_game_settings.clone(),
        );
        let rate_limiter = RateLimiter::new(config.restrictions.ratelimits.clone());
        Self {
            config,
            rate_limiter,
            ban_list_path,
            chat_log_dir,
            state: Mutex::new(RoomState {
                room,
                players: PlayerTable::new(),
                ban_list,
                chat_log: ChatLog::new(),
                scheduled_close: None,
            }),
        }
    }

    pub async fn lock(&self) -> tokio::sync::MutexGuard<'_, RoomState> {
        self.state.lock().await
    }

    /// Flushes the current ban list to `ban_list_path` (SPEC_FULL.md §8
    /// S6). Called after every ban/unban so a restart sees the same bans.
    pub async fn persist_ban_list(&self) {
        let snapshot = self.lock().await.ban_list.clone();
        if let Err(err) = snapshot.save(&self.ban_list_path).await {
            tracing::warn!(error = %err, "failed to persist ban list");
        }
    }
}

impl RoomState {
    /// Sends one frame to every recipient `target` selects, via each
    /// slot's outbox channel. Non-blocking: a full outbox drops the frame
    /// for that recipient rather than stalling the room lock (SPEC_FULL.md
    /// §5 "handlers themselves do not yield").
    pub fn broadcast(&self, target: &BroadcastTarget, frame: &OutboundFrame) {
        for id in target.recipients() {
            if let Some(slot) = self.players.get(id) {
                let _ = slot.outbox.try_send(frame.clone());
            }
        }
    }

    pub fn unicast(&self, id: crate::room::player_table::PlayerId, frame: &OutboundFrame) {
        if let Some(slot) = self.players.get(id) {
            let _ = slot.outbox.try_send(frame.clone());
        }
    }

    pub fn broadcast_to_all(&self, frame: &OutboundFrame) {
        let target = BroadcastTarget::room(self.players.iterate().map(|s| s.id));
        self.broadcast(&target, frame);
    }

    pub fn broadcast_to_all_except(&self, except: crate::room::player_table::PlayerId, frame: &OutboundFrame) {
        let target = BroadcastTarget::room_except(self.players.iterate().map(|s| s.id), except);
        self.broadcast(&target, frame);
    }
}
