//! Replication policy: who receives what, each tick.
//!
//! Lifecycle and event messages go to every connected session on the
//! reliable channel. Positional snapshots go to every session except the
//! one controlling the entity, so a viewer's locally-predicted entity is
//! never overwritten by its own stale echo; they ride the unreliable
//! channel and are superseded by the next tick rather than retried.

use shared::protocol::Message;
use shared::Entity;

use crate::network::SessionId;
use crate::registry::ControlIndex;

#[derive(Debug, Default)]
pub struct Replicator {
    outbound: Vec<(SessionId, Message)>,
}

impl Replicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unicast(&mut self, session: SessionId, message: Message) {
        self.outbound.push((session, message));
    }

    pub fn broadcast(&mut self, sessions: &[SessionId], message: Message) {
        for session in sessions {
            self.outbound.push((*session, message.clone()));
        }
    }

    /// Queues one snapshot per entity per session, skipping the session
    /// that controls the entity.
    pub fn broadcast_snapshots(
        &mut self,
        sessions: &[SessionId],
        entities: &[Entity],
        control: &ControlIndex,
    ) {
        for entity in entities {
            let controller = control.controller_of(entity.id);
            for session in sessions {
                if controller == Some(*session) {
                    continue;
                }
                self.outbound.push((
                    *session,
                    Message::Snapshot {
                        id: entity.id,
                        x: entity.x,
                        y: entity.y,
                        size: entity.size,
                    },
                ));
            }
        }
    }

    pub fn drain(&mut self) -> Vec<(SessionId, Message)> {
        std::mem::take(&mut self.outbound)
    }

    pub fn is_empty(&self) -> bool {
        self.outbound.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::protocol::MessageType;

    #[test]
    fn test_broadcast_reaches_every_session() {
        let mut replicator = Replicator::new();
        replicator.broadcast(
            &[1, 2, 3],
            Message::GameTime {
                seconds_remaining: 42,
            },
        );

        let outbound = replicator.drain();
        assert_eq!(outbound.len(), 3);
        let targets: Vec<SessionId> = outbound.iter().map(|(s, _)| *s).collect();
        assert_eq!(targets, vec![1, 2, 3]);
        assert!(replicator.is_empty());
    }

    #[test]
    fn test_snapshots_skip_the_controlling_session() {
        let mut control = ControlIndex::new();
        control.bind(0, 1);
        control.bind(1, 2);

        let entities = vec![
            Entity::new(0, 1.0, 2.0, 8.0, 0),
            Entity::new(1, 3.0, 4.0, 6.0, 0),
            Entity::new(2, 5.0, 6.0, 7.0, 0),
        ];

        let mut replicator = Replicator::new();
        replicator.broadcast_snapshots(&[1, 2], &entities, &control);
        let outbound = replicator.drain();

        // 3 entities × 2 sessions minus the two self-echoes
        assert_eq!(outbound.len(), 4);
        for (session, message) in &outbound {
            let id = match message {
                Message::Snapshot { id, .. } => *id,
                other => panic!("unexpected message {:?}", other),
            };
            assert_ne!(control.controller_of(id), Some(*session));
        }
        // The uncontrolled entity reaches both viewers
        let entity2_targets = outbound
            .iter()
            .filter(|(_, m)| matches!(m, Message::Snapshot { id: 2, .. }))
            .count();
        assert_eq!(entity2_targets, 2);
    }

    #[test]
    fn test_snapshots_carry_authoritative_fields() {
        let entities = vec![Entity::new(7, -12.0, 34.0, 9.5, 0)];
        let mut replicator = Replicator::new();
        replicator.broadcast_snapshots(&[1], &entities, &ControlIndex::new());

        let outbound = replicator.drain();
        assert_eq!(outbound.len(), 1);
        match &outbound[0].1 {
            Message::Snapshot { id, x, y, size } => {
                assert_eq!(*id, 7);
                assert_eq!((*x, *y), (-12.0, 34.0));
                assert_eq!(*size, 9.5);
            }
            other => panic!("unexpected message {:?}", other),
        }
        assert_eq!(outbound[0].1.message_type(), MessageType::Snapshot);
    }
}
