pub mod channel;
pub mod protocol;
pub mod wire;

pub const SERVER_PORT: u16 = 10131;

pub const SPAWN_HALF_EXTENT: f32 = 500.0;
pub const SPAWN_MARGIN: f32 = 10.0;
pub const SPAWN_SIZE_MIN: f32 = 5.0;
pub const SPAWN_SIZE_MAX: f32 = 10.0;
pub const RESET_SIZE_MIN: f32 = 5.0;
pub const RESET_SIZE_MAX: f32 = 9.0;

pub const MAX_SIZE: f32 = 100.0;
pub const MAX_GAIN: f32 = 50.0;
pub const CORRUPT_SIZE_LIMIT: f32 = 1000.0;
pub const COLLISION_EPSILON: f32 = 0.1;

pub const AGENT_SPEED: f32 = 50.0;
pub const AGENT_ARRIVAL_TOLERANCE: f32 = 10.0;
pub const PLAYER_SPEED: f32 = 100.0;

pub const MATCH_DURATION_SECS: i32 = 60;
pub const AGENT_BATCH_SIZE: usize = 10;

/// Sentinel identifier; never assigned to a live entity.
pub const INVALID_ENTITY: u16 = u16::MAX;

/// One simulated entity, player- or agent-controlled.
///
/// The target coordinates are only meaningful while `agent` is set; for
/// player entities they stay at their defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: u16,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub color: u32,
    pub agent: bool,
    pub target_x: f32,
    pub target_y: f32,
    pub score: i32,
}

impl Entity {
    pub fn new(id: u16, x: f32, y: f32, size: f32, color: u32) -> Self {
        Self {
            id,
            x,
            y,
            size,
            color,
            agent: false,
            target_x: 0.0,
            target_y: 0.0,
            score: 0,
        }
    }

    /// Sizes outside (0, CORRUPT_SIZE_LIMIT] are treated as corrupt and
    /// skipped by the resolver.
    pub fn has_valid_size(&self) -> bool {
        self.size > 0.0 && self.size <= CORRUPT_SIZE_LIMIT
    }

    pub fn distance_to(&self, other: &Entity) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_entity_creation() {
        let entity = Entity::new(3, 10.0, -20.0, 7.5, 0xFF4488CC);
        assert_eq!(entity.id, 3);
        assert_eq!(entity.x, 10.0);
        assert_eq!(entity.y, -20.0);
        assert_eq!(entity.size, 7.5);
        assert_eq!(entity.color, 0xFF4488CC);
        assert!(!entity.agent);
        assert_eq!(entity.score, 0);
    }

    #[test]
    fn test_valid_size_bounds() {
        let mut entity = Entity::new(0, 0.0, 0.0, 10.0, 0);
        assert!(entity.has_valid_size());

        entity.size = 0.0;
        assert!(!entity.has_valid_size());

        entity.size = -5.0;
        assert!(!entity.has_valid_size());

        entity.size = CORRUPT_SIZE_LIMIT;
        assert!(entity.has_valid_size());

        entity.size = CORRUPT_SIZE_LIMIT + 1.0;
        assert!(!entity.has_valid_size());
    }

    #[test]
    fn test_distance() {
        let a = Entity::new(0, 0.0, 0.0, 5.0, 0);
        let b = Entity::new(1, 3.0, 4.0, 5.0, 0);
        assert_approx_eq!(a.distance_to(&b), 5.0, 1e-6);
        assert_approx_eq!(b.distance_to(&a), 5.0, 1e-6);
        assert_approx_eq!(a.distance_to(&a), 0.0, 1e-6);
    }
}
