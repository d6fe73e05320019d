//! Local mirror of the authoritative entity set.
//!
//! The mirror only learns of entities opportunistically as entity-joined
//! messages arrive, so it keys them by identifier instead of storing them
//! densely. Snapshots overwrite position and size directly (last writer
//! wins, no smoothing) and devoured events apply even to the locally
//! controlled entity, which is how authoritative corrections win over
//! local prediction.

use log::{debug, info, warn};
use shared::protocol::Message;
use shared::{Entity, PLAYER_SPEED};
use std::collections::HashMap;

/// Size shown for an entity between its join message and its first
/// snapshot.
const PLACEHOLDER_SIZE: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOutcome {
    pub winner: u16,
    pub winner_score: i32,
}

#[derive(Debug)]
pub struct Mirror {
    entities: HashMap<u16, Entity>,
    controlled: Option<u16>,
    seconds_remaining: i32,
    outcome: Option<MatchOutcome>,
}

impl Mirror {
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
            controlled: None,
            seconds_remaining: shared::MATCH_DURATION_SECS,
            outcome: None,
        }
    }

    /// Applies one decoded server message. Updates referencing unknown
    /// identifiers are no-ops; duplicate entity-joined messages are
    /// silently ignored.
    pub fn apply(&mut self, message: Message) {
        match message {
            Message::EntityJoined { id, x, y, color } => {
                if self.entities.contains_key(&id) {
                    debug!("Duplicate entity-joined for {}, ignoring", id);
                    return;
                }
                self.entities
                    .insert(id, Entity::new(id, x, y, PLACEHOLDER_SIZE, color));
            }
            Message::Welcome { id } => {
                info!("Controlling entity {}", id);
                self.controlled = Some(id);
            }
            Message::EntityLeft { id } => {
                self.entities.remove(&id);
            }
            Message::Snapshot { id, x, y, size } => {
                if let Some(entity) = self.entities.get_mut(&id) {
                    entity.x = x;
                    entity.y = y;
                    entity.size = size;
                }
            }
            Message::Devoured {
                devoured,
                devourer,
                new_size,
                new_x,
                new_y,
            } => {
                if let Some(entity) = self.entities.get_mut(&devourer) {
                    entity.size = new_size;
                }
                if let Some(entity) = self.entities.get_mut(&devoured) {
                    entity.x = new_x;
                    entity.y = new_y;
                }
            }
            Message::ScoreUpdate { id, score } => {
                if let Some(entity) = self.entities.get_mut(&id) {
                    entity.score = score;
                }
            }
            Message::GameTime { seconds_remaining } => {
                self.seconds_remaining = seconds_remaining;
            }
            Message::GameOver {
                winner,
                winner_score,
            } => {
                info!("Game over: entity {} wins with {}", winner, winner_score);
                self.outcome = Some(MatchOutcome {
                    winner,
                    winner_score,
                });
            }
            Message::Join | Message::PlayerMove { .. } => {
                warn!("Unexpected client-bound {:?}", message.message_type());
            }
        }
    }

    /// Integrates one frame of local input into the controlled entity and
    /// returns the player-move message to send. `dx`/`dy` are unit axis
    /// directions from the input layer.
    pub fn integrate_input(&mut self, dx: f32, dy: f32, dt: f32) -> Option<Message> {
        let id = self.controlled?;
        let entity = self.entities.get_mut(&id)?;
        entity.x += dx * PLAYER_SPEED * dt;
        entity.y += dy * PLAYER_SPEED * dt;
        Some(Message::PlayerMove {
            id,
            x: entity.x,
            y: entity.y,
        })
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn controlled(&self) -> Option<u16> {
        self.controlled
    }

    pub fn controlled_entity(&self) -> Option<&Entity> {
        self.entities.get(&self.controlled?)
    }

    pub fn get(&self, id: u16) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn seconds_remaining(&self) -> i32 {
        self.seconds_remaining
    }

    pub fn outcome(&self) -> Option<MatchOutcome> {
        self.outcome
    }

    /// Entities sorted by descending score, for the leaderboard.
    pub fn leaderboard(&self) -> Vec<&Entity> {
        let mut ranked: Vec<&Entity> = self.entities.values().collect();
        ranked.sort_by(|a, b| b.score.cmp(&a.score).then(a.id.cmp(&b.id)));
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn joined(id: u16) -> Message {
        Message::EntityJoined {
            id,
            x: 1.0,
            y: 2.0,
            color: 0xFF4488CC,
        }
    }

    #[test]
    fn test_entity_joined_inserts_once() {
        let mut mirror = Mirror::new();
        mirror.apply(joined(5));
        assert_eq!(mirror.len(), 1);

        // Duplicate with different coordinates is ignored outright
        mirror.apply(Message::EntityJoined {
            id: 5,
            x: 99.0,
            y: 99.0,
            color: 0,
        });
        assert_eq!(mirror.len(), 1);
        assert_eq!(mirror.get(5).unwrap().x, 1.0);
    }

    #[test]
    fn test_snapshot_overwrites_known_and_skips_unknown() {
        let mut mirror = Mirror::new();
        mirror.apply(joined(5));
        mirror.apply(Message::Snapshot {
            id: 5,
            x: 10.0,
            y: 20.0,
            size: 7.5,
        });

        let entity = mirror.get(5).unwrap();
        assert_eq!((entity.x, entity.y), (10.0, 20.0));
        assert_eq!(entity.size, 7.5);

        mirror.apply(Message::Snapshot {
            id: 42,
            x: 0.0,
            y: 0.0,
            size: 1.0,
        });
        assert_eq!(mirror.len(), 1);
    }

    #[test]
    fn test_devoured_updates_both_parties() {
        let mut mirror = Mirror::new();
        mirror.apply(joined(1));
        mirror.apply(joined(2));
        mirror.apply(Message::Devoured {
            devoured: 1,
            devourer: 2,
            new_size: 14.0,
            new_x: -300.0,
            new_y: 250.0,
        });

        assert_eq!(mirror.get(2).unwrap().size, 14.0);
        let reset = mirror.get(1).unwrap();
        assert_eq!((reset.x, reset.y), (-300.0, 250.0));
    }

    #[test]
    fn test_devoured_corrects_own_entity() {
        let mut mirror = Mirror::new();
        mirror.apply(joined(1));
        mirror.apply(Message::Welcome { id: 1 });
        mirror.integrate_input(1.0, 0.0, 0.1);

        // The authoritative reset wins over the local prediction
        mirror.apply(Message::Devoured {
            devoured: 1,
            devourer: 0,
            new_size: 9.0,
            new_x: 123.0,
            new_y: -45.0,
        });
        let own = mirror.controlled_entity().unwrap();
        assert_eq!((own.x, own.y), (123.0, -45.0));
    }

    #[test]
    fn test_entity_left_removes_row() {
        let mut mirror = Mirror::new();
        mirror.apply(joined(3));
        mirror.apply(Message::EntityLeft { id: 3 });
        assert!(mirror.is_empty());

        // Later traffic for the departed id is a no-op
        mirror.apply(Message::ScoreUpdate { id: 3, score: 10 });
        assert!(mirror.is_empty());
    }

    #[test]
    fn test_input_integration_moves_and_reports() {
        let mut mirror = Mirror::new();
        mirror.apply(joined(1));
        mirror.apply(Message::Welcome { id: 1 });

        let message = mirror.integrate_input(1.0, -1.0, 0.5).unwrap();
        match message {
            Message::PlayerMove { id, x, y } => {
                assert_eq!(id, 1);
                assert_approx_eq!(x, 1.0 + PLAYER_SPEED * 0.5, 1e-4);
                assert_approx_eq!(y, 2.0 - PLAYER_SPEED * 0.5, 1e-4);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_input_without_welcome_is_inert() {
        let mut mirror = Mirror::new();
        mirror.apply(joined(1));
        assert_eq!(mirror.integrate_input(1.0, 0.0, 0.1), None);
    }

    #[test]
    fn test_clock_and_outcome_tracking() {
        let mut mirror = Mirror::new();
        assert_eq!(mirror.seconds_remaining(), shared::MATCH_DURATION_SECS);

        mirror.apply(Message::GameTime {
            seconds_remaining: 12,
        });
        assert_eq!(mirror.seconds_remaining(), 12);
        assert_eq!(mirror.outcome(), None);

        mirror.apply(Message::GameOver {
            winner: 4,
            winner_score: 31,
        });
        assert_eq!(
            mirror.outcome(),
            Some(MatchOutcome {
                winner: 4,
                winner_score: 31
            })
        );
    }

    #[test]
    fn test_leaderboard_sorts_by_score() {
        let mut mirror = Mirror::new();
        for id in 0..3 {
            mirror.apply(joined(id));
        }
        mirror.apply(Message::ScoreUpdate { id: 1, score: 9 });
        mirror.apply(Message::ScoreUpdate { id: 2, score: 4 });

        let ranked: Vec<u16> = mirror.leaderboard().iter().map(|e| e.id).collect();
        assert_eq!(ranked, vec![1, 2, 0]);
    }
}
