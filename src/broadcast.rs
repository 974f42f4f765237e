//! Broadcast-optimized outbound frame handling.
//!
//! Every outbound packet is wire-encoded once and then fanned out to all
//! recipients via an `Arc`, avoiding per-client re-serialization — the same
//! zero-cost-cloning idea as the original Signal Fish `BroadcastMessage`,
//! simplified to the one encoding this protocol actually uses (a JSON text
//! frame; there is no alternate binary encoding negotiated here).

use smallvec::SmallVec;
use std::sync::Arc;

use crate::room::player_table::PlayerId;

/// Maximum number of recipients to stack-allocate for typical rooms.
pub const TYPICAL_ROOM_SIZE: usize = 8;

/// List of player ids optimized for typical room sizes.
pub type PlayerIdList = SmallVec<[PlayerId; TYPICAL_ROOM_SIZE]>;

/// An already wire-encoded text frame, ready to hand to every recipient's
/// send task without re-serializing.
pub type OutboundFrame = Arc<str>;

pub fn frame(opcode: &str, args: impl IntoIterator<Item = serde_json::Value>) -> OutboundFrame {
    Arc::from(crate::protocol::encode(opcode, args))
}

/// Broadcast target specification, mirroring the teacher's
/// `BroadcastTarget` shape.
#[derive(Debug, Clone)]
pub enum BroadcastTarget {
    Room { players: PlayerIdList },
    RoomExcept { players: PlayerIdList, except: PlayerId },
    Player(PlayerId),
}

impl BroadcastTarget {
    pub fn room(players: impl IntoIterator<Item = PlayerId>) -> Self {
        Self::Room {
            players: players.into_iter().collect(),
        }
    }

    pub fn room_except(players: impl IntoIterator<Item = PlayerId>, except: PlayerId) -> Self {
        Self::RoomExcept {
            players: players.into_iter().collect(),
            except,
        }
    }

    pub fn recipients(&self) -> impl Iterator<Item = PlayerId> + '_ {
        let (players, except) = match self {
            Self::Room { players } => (players.as_slice(), None),
            Self::RoomExcept { players, except } => (players.as_slice(), Some(*except)),
            Self::Player(id) => return PlayerIdIterator::Single(Some(*id)),
        };

        PlayerIdIterator::Filtered {
            inner: players.iter().copied(),
            except,
        }
    }
}

enum PlayerIdIterator<'a> {
    Single(Option<PlayerId>),
    Filtered {
        inner: std::iter::Copied<std::slice::Iter<'a, PlayerId>>,
        except: Option<PlayerId>,
    },
}

impl Iterator for PlayerIdIterator<'_> {
    type Item = PlayerId;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Single(id) => id.take(),
            Self::Filtered { inner, except } => loop {
                let id = inner.next()?;
                if Some(id) != *except {
                    return Some(id);
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_encodes_opcode_and_args() {
        let f = frame("20", vec![serde_json::json!(0), serde_json::json!("hi")]);
        assert_eq!(&*f, r#"["20",0,"hi"]"#);
    }

    #[test]
    fn room_except_skips_the_excluded_player() {
        let target = BroadcastTarget::room_except([0, 1, 2, 3], 1);
        let recipients: Vec<_> = target.recipients().collect();
        assert_eq!(recipients, vec![0, 2, 3]);
    }

    #[test]
    fn single_player_target_yields_one_recipient() {
        let target = BroadcastTarget::Player(5);
        assert_eq!(target.recipients().collect::<Vec<_>>(), vec![5]);
    }

    #[test]
    fn arc_cloning_is_cheap_and_shares_data() {
        let f = frame("8", vec![serde_json::json!(0), serde_json::json!(true)]);
        let clone = f.clone();
        assert!(Arc::ptr_eq(&f, &clone));
    }
}
