//! Movement policy for agent-controlled entities.
//!
//! Single-state: head for the current target along the sign of each axis
//! offset at a fixed speed, and pick a new random target once both offsets
//! are within the arrival tolerance. Moving by axis sign rather than the
//! normalized direction makes diagonal travel faster than axis-aligned
//! travel; that quirk is part of the observed behavior and kept.

use crate::registry::random_spawn_point;
use shared::{Entity, AGENT_ARRIVAL_TOLERANCE, AGENT_SPEED};

pub fn drive_agents(entities: &mut [Entity], dt: f32) {
    let mut rng = rand::thread_rng();
    for entity in entities.iter_mut().filter(|e| e.agent) {
        let diff_x = entity.target_x - entity.x;
        let diff_y = entity.target_y - entity.y;
        let dir_x = if diff_x > 0.0 { 1.0 } else { -1.0 };
        let dir_y = if diff_y > 0.0 { 1.0 } else { -1.0 };

        entity.x += dir_x * AGENT_SPEED * dt;
        entity.y += dir_y * AGENT_SPEED * dt;

        if diff_x.abs() < AGENT_ARRIVAL_TOLERANCE && diff_y.abs() < AGENT_ARRIVAL_TOLERANCE {
            let (tx, ty) = random_spawn_point(&mut rng);
            entity.target_x = tx;
            entity.target_y = ty;
        }
    }
}
