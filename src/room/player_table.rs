//! Fixed-capacity, monotonically-growing slot allocator keyed by a stable
//! integer id (SPEC_FULL.md §4.D). Ids are never recycled within a
//! session: `release` empties the slot in place rather than shifting or
//! reusing its index, so clients can keep assuming id stability.

use serde_json::Value;
use std::net::SocketAddr;
use tokio::sync::mpsc;

/// Slot ids are small monotonic integers, not UUIDs — this is a
/// deliberate divergence from distributed-system conventions, since slot
/// ids are wire-visible and clients assume a compact stable namespace.
pub type PlayerId = u32;

/// A connected player's full per-connection state (SPEC_FULL.md §3
/// "Player slot").
#[derive(Debug)]
pub struct PlayerSlot {
    pub id: PlayerId,
    pub user_name: String,
    pub guest: bool,
    /// `None` once `restrictions.levels.censorLevels` has replaced it with
    /// the literal `"-"` sentinel on the wire; stored here as the raw
    /// reported value regardless, since admin tooling still needs it.
    pub level: String,
    pub team: super::state::Team,
    /// Opaque blob relayed verbatim to other clients.
    pub avatar: Value,
    pub ready: bool,
    pub tabbed: bool,
    /// Always the literal string `"invalid"` on the wire — peer ids are a
    /// reserved, unused field (spec.md §1 Non-goals).
    pub peer_id: &'static str,
    pub addr: SocketAddr,
    pub outbox: mpsc::Sender<crate::broadcast::OutboundFrame>,
}

impl PlayerSlot {
    /// The value placed in outbound packets for this player's level,
    /// honoring `censorLevels`.
    pub fn wire_level(&self, censor: bool) -> &str {
        if censor {
            "-"
        } else {
            &self.level
        }
    }
}

/// Sparse, monotonically-growing table of player slots.
#[derive(Default)]
pub struct PlayerTable {
    slots: Vec<Option<PlayerSlot>>,
}

impl PlayerTable {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Appends a new slot at the next id and returns that id. Ids are
    /// never reused even after `release`.
    pub fn allocate(&mut self, build: impl FnOnce(PlayerId) -> PlayerSlot) -> PlayerId {
        let id = self.slots.len() as PlayerId;
        self.slots.push(Some(build(id)));
        id
    }

    pub fn get(&self, id: PlayerId) -> Option<&PlayerSlot> {
        self.slots.get(id as usize).and_then(|s| s.as_ref())
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut PlayerSlot> {
        self.slots.get_mut(id as usize).and_then(|s| s.as_mut())
    }

    /// Empties the slot in place; the index is never reused.
    pub fn release(&mut self, id: PlayerId) -> Option<PlayerSlot> {
        self.slots.get_mut(id as usize).and_then(|s| s.take())
    }

    pub fn iterate(&self) -> impl Iterator<Item = &PlayerSlot> {
        self.slots.iter().filter_map(|s| s.as_ref())
    }

    pub fn find_by_name(&self, name: &str) -> Option<PlayerId> {
        self.iterate().find(|slot| slot.user_name == name).map(|slot| slot.id)
    }

    pub fn count(&self) -> usize {
        self.iterate().count()
    }

    pub fn is_occupied(&self, id: PlayerId) -> bool {
        self.get(id).is_some()
    }
}
