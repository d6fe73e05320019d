//! Authoritative entity table and the entity ↔ session control index.
//!
//! Entities are stored densely and addressed by identifier-as-index:
//! identifiers are handed out sequentially from zero, are never reused, and
//! entities are never destroyed, only reset in place when devoured.

use log::info;
use rand::Rng;
use shared::{
    Entity, SPAWN_HALF_EXTENT, SPAWN_MARGIN, SPAWN_SIZE_MAX, SPAWN_SIZE_MIN,
};
use std::collections::HashMap;

use crate::network::SessionId;

/// Uniform point inside the spawn rectangle, keeping the border margin.
pub fn random_spawn_point<R: Rng>(rng: &mut R) -> (f32, f32) {
    let extent = SPAWN_HALF_EXTENT - SPAWN_MARGIN;
    (rng.gen_range(-extent..=extent), rng.gen_range(-extent..=extent))
}

/// Opaque color with each channel quantized to a multiple of 0x44 so
/// entities stay visually distinct.
fn random_color<R: Rng>(rng: &mut R) -> u32 {
    let r = 0x44 * rng.gen_range(1..=3u32);
    let g = 0x44 * rng.gen_range(1..=3u32);
    let b = 0x44 * rng.gen_range(1..=3u32);
    0xFF00_0000 | (r << 16) | (g << 8) | b
}

#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: Vec<Entity>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
        }
    }

    /// Creates a player-controlled entity with a random spawn position,
    /// size and color, and returns its identifier.
    pub fn create(&mut self) -> u16 {
        let mut rng = rand::thread_rng();
        let id = self.entities.len() as u16;
        let (x, y) = random_spawn_point(&mut rng);
        let size = rng.gen_range(SPAWN_SIZE_MIN..=SPAWN_SIZE_MAX);
        let entity = Entity::new(id, x, y, size, random_color(&mut rng));

        info!(
            "Spawned entity {} at ({:.1}, {:.1}) size {:.1}",
            id, entity.x, entity.y, entity.size
        );
        self.entities.push(entity);
        id
    }

    /// Creates an agent-controlled entity with an initial movement target.
    pub fn create_agent(&mut self) -> u16 {
        let id = self.create();
        let mut rng = rand::thread_rng();
        let (tx, ty) = random_spawn_point(&mut rng);
        if let Some(entity) = self.entities.get_mut(id as usize) {
            entity.agent = true;
            entity.target_x = tx;
            entity.target_y = ty;
        }
        id
    }

    pub fn get(&self, id: u16) -> Option<&Entity> {
        self.entities.get(id as usize)
    }

    /// Applies `f` to the entity, or does nothing if the identifier is
    /// unknown. The no-op is designed behavior, not an error.
    pub fn mutate<F: FnOnce(&mut Entity)>(&mut self, id: u16, f: F) {
        if let Some(entity) = self.entities.get_mut(id as usize) {
            f(entity);
        }
    }

    /// Overwrites authoritative position (and size, when supplied)
    /// unconditionally: last writer wins, no smoothing.
    pub fn apply_snapshot(&mut self, id: u16, x: f32, y: f32, size: Option<f32>) {
        self.mutate(id, |entity| {
            entity.x = x;
            entity.y = y;
            if let Some(size) = size {
                entity.size = size;
            }
        });
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Bidirectional entity ↔ session table, used to suppress echoing a
/// viewer's own entity back to itself.
#[derive(Debug, Default)]
pub struct ControlIndex {
    by_entity: HashMap<u16, SessionId>,
    by_session: HashMap<SessionId, u16>,
}

impl ControlIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, entity: u16, session: SessionId) {
        self.by_entity.insert(entity, session);
        self.by_session.insert(session, entity);
    }

    pub fn controller_of(&self, entity: u16) -> Option<SessionId> {
        self.by_entity.get(&entity).copied()
    }

    pub fn entity_of(&self, session: SessionId) -> Option<u16> {
        self.by_session.get(&session).copied()
    }

    /// Removes the binding for a departed session, returning the entity it
    /// controlled.
    pub fn unbind_session(&mut self, session: SessionId) -> Option<u16> {
        let entity = self.by_session.remove(&session)?;
        self.by_entity.remove(&entity);
        Some(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers_are_sequential() {
        let mut registry = EntityRegistry::new();
        assert_eq!(registry.create(), 0);
        assert_eq!(registry.create(), 1);
        assert_eq!(registry.create_agent(), 2);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_spawn_within_configured_rectangle() {
        let mut registry = EntityRegistry::new();
        for _ in 0..50 {
            let id = registry.create();
            let entity = registry.get(id).unwrap();
            let extent = SPAWN_HALF_EXTENT - SPAWN_MARGIN;
            assert!(entity.x >= -extent && entity.x <= extent);
            assert!(entity.y >= -extent && entity.y <= extent);
            assert!(entity.size >= SPAWN_SIZE_MIN && entity.size <= SPAWN_SIZE_MAX);
        }
    }

    #[test]
    fn test_color_channels_are_constrained() {
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let color = random_color(&mut rng);
            assert_eq!(color >> 24, 0xFF);
            for shift in [16, 8, 0] {
                let channel = (color >> shift) & 0xFF;
                assert!(
                    channel == 0x44 || channel == 0x88 || channel == 0xCC,
                    "unexpected channel value {:#x}",
                    channel
                );
            }
        }
    }

    #[test]
    fn test_agent_creation_sets_flag_and_target() {
        let mut registry = EntityRegistry::new();
        let id = registry.create_agent();
        let entity = registry.get(id).unwrap();
        assert!(entity.agent);
        let extent = SPAWN_HALF_EXTENT - SPAWN_MARGIN;
        assert!(entity.target_x.abs() <= extent);
        assert!(entity.target_y.abs() <= extent);
    }

    #[test]
    fn test_mutate_unknown_id_is_noop() {
        let mut registry = EntityRegistry::new();
        registry.create();
        registry.mutate(999, |entity| entity.score = 42);
        registry.apply_snapshot(999, 1.0, 2.0, None);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(0).unwrap().score, 0);
    }

    #[test]
    fn test_apply_snapshot_overwrites() {
        let mut registry = EntityRegistry::new();
        let id = registry.create();

        registry.apply_snapshot(id, 12.0, -34.0, None);
        let entity = registry.get(id).unwrap();
        assert_eq!((entity.x, entity.y), (12.0, -34.0));
        let size_before = entity.size;

        registry.apply_snapshot(id, 0.0, 0.0, Some(77.0));
        let entity = registry.get(id).unwrap();
        assert_eq!(entity.size, 77.0);
        assert_ne!(entity.size, size_before);
    }

    #[test]
    fn test_control_index_is_bidirectional() {
        let mut control = ControlIndex::new();
        control.bind(5, 100);
        control.bind(6, 101);

        assert_eq!(control.controller_of(5), Some(100));
        assert_eq!(control.entity_of(101), Some(6));
        assert_eq!(control.controller_of(7), None);

        assert_eq!(control.unbind_session(100), Some(5));
        assert_eq!(control.controller_of(5), None);
        assert_eq!(control.unbind_session(100), None);
    }
}
