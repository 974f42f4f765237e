//! Per-address, per-action token-bucket ratelimiter (SPEC_FULL.md §4.B).
//!
//! Scoped by client network address, not player id, so bans and limits
//! survive reconnection. Each `(address, action class)` pair tracks an
//! independent counter guarded by two one-shot timers: a `timeframe`
//! timer that resets the counter only if it hasn't reached `amount`, and
//! a `restore` timer, armed once the counter reaches `amount`, that
//! unconditionally resets it. See the Open Question decision in
//! DESIGN.md for the exact interaction.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::protocol::ErrorCode;

/// A named category of mutating operations sharing one ratelimit bucket
/// per address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionClass {
    Joining,
    Chatting,
    ChangingTeams,
    Readying,
    TransferringHost,
    ChangingMode,
    ChangingMap,
    StartGameCountdown,
    StartingEndingGame,
}

impl ActionClass {
    pub const ALL: [ActionClass; 9] = [
        ActionClass::Joining,
        ActionClass::Chatting,
        ActionClass::ChangingTeams,
        ActionClass::Readying,
        ActionClass::TransferringHost,
        ActionClass::ChangingMode,
        ActionClass::ChangingMap,
        ActionClass::StartGameCountdown,
        ActionClass::StartingEndingGame,
    ];

    /// The `ERROR_MESSAGE` code emitted when this class is limited, or
    /// `None` for the administrative-shaped classes that fail silently
    /// (SPEC_FULL.md §6 ratelimit→error-code map).
    pub fn error_code(self) -> Option<ErrorCode> {
        match self {
            ActionClass::Joining => Some(ErrorCode::JoinRateLimited),
            ActionClass::Chatting => Some(ErrorCode::ChatRateLimit),
            ActionClass::ChangingTeams => Some(ErrorCode::RateLimitTeams),
            ActionClass::Readying => Some(ErrorCode::RateLimitReady),
            ActionClass::TransferringHost => Some(ErrorCode::HostChangeRateLimited),
            ActionClass::ChangingMode
            | ActionClass::ChangingMap
            | ActionClass::StartGameCountdown
            | ActionClass::StartingEndingGame => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RatelimitRule {
    pub amount: u32,
    pub timeframe_secs: u64,
    pub restore_secs: u64,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Limited,
}

#[derive(Debug, Default)]
struct CounterState {
    count: u32,
    /// Bumped every time `restore` fires; lets a `timeframe` timer armed
    /// in a prior window recognize it is stale and no-op instead of
    /// clobbering a fresh window's counter.
    generation: u64,
    timeframe_armed: bool,
}

pub struct RateLimiter {
    rules: HashMap<ActionClass, RatelimitRule>,
    state: DashMap<(IpAddr, ActionClass), Arc<Mutex<CounterState>>>,
}

impl RateLimiter {
    pub fn new(rules: HashMap<ActionClass, RatelimitRule>) -> Self {
        Self {
            rules,
            state: DashMap::new(),
        }
    }

    fn rule_for(&self, action: ActionClass) -> RatelimitRule {
        self.rules.get(&action).copied().unwrap_or(RatelimitRule {
            amount: u32::MAX,
            timeframe_secs: 0,
            restore_secs: 0,
        })
    }

    /// Registers one hit of `action` from `addr`. Synchronous: only the
    /// reset timers are asynchronous, spawned as detached tasks.
    pub fn hit(&self, addr: IpAddr, action: ActionClass) -> Verdict {
        let rule = self.rule_for(action);
        let entry = self
            .state
            .entry((addr, action))
            .or_insert_with(|| Arc::new(Mutex::new(CounterState::default())))
            .clone();

        let mut guard = entry.lock().expect("ratelimit mutex poisoned");

        if guard.count == 0 && !guard.timeframe_armed && rule.timeframe_secs > 0 {
            guard.timeframe_armed = true;
            let generation = guard.generation;
            let state = entry.clone();
            let amount = rule.amount;
            let timeframe_secs = rule.timeframe_secs;
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(timeframe_secs)).await;
                let mut g = state.lock().expect("ratelimit mutex poisoned");
                if g.generation == generation {
                    g.timeframe_armed = false;
                    if g.count < amount {
                        g.count = 0;
                    }
                }
            });
        }

        if guard.count >= rule.amount {
            return Verdict::Limited;
        }

        guard.count += 1;

        if guard.count == rule.amount {
            let generation = guard.generation;
            let state = entry.clone();
            let restore_secs = rule.restore_secs;
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(restore_secs)).await;
                let mut g = state.lock().expect("ratelimit mutex poisoned");
                if g.generation == generation {
                    g.count = 0;
                    g.generation = g.generation.wrapping_add(1);
                }
            });
            return Verdict::Limited;
        }

        Verdict::Allowed
    }

    #[cfg(test)]
    fn count(&self, addr: IpAddr, action: ActionClass) -> u32 {
        self.state
            .get(&(addr, action))
            .map(|e| e.lock().unwrap().count)
            .unwrap_or(0)
    }
}
