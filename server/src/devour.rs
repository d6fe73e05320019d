//! Pairwise collision scan and the devour rule.
//!
//! O(n²) over the live entity set, acceptable at arena scale. At most one
//! devour is applied per tick: the first pair that passes the gain check
//! ends the scan, and remaining overlaps wait for the next tick, which
//! serializes resolution in ascending scan order.

use log::{info, warn};
use rand::Rng;
use shared::{
    Entity, COLLISION_EPSILON, MAX_GAIN, MAX_SIZE, RESET_SIZE_MAX, RESET_SIZE_MIN,
};

use crate::registry::random_spawn_point;

/// The applied result of one devour, with everything the broadcaster needs
/// to tell the viewers.
#[derive(Debug, Clone, PartialEq)]
pub struct DevourOutcome {
    pub devoured: u16,
    pub devourer: u16,
    pub devourer_size: f32,
    pub devourer_score: i32,
    pub reset_x: f32,
    pub reset_y: f32,
}

/// Runs the collision scan and applies at most one devour.
///
/// A collision is declared when the distance between two valid-size,
/// unequal-size entities is below the sum of their sizes but above a small
/// epsilon (two entities sharing an exact transform never collide). The
/// devour is rejected outright when the size gain falls outside (0, 50),
/// which bounds single-tick growth.
pub fn resolve(entities: &mut [Entity]) -> Option<DevourOutcome> {
    for i in 0..entities.len() {
        for j in 0..entities.len() {
            if i == j {
                continue;
            }

            let first = &entities[i];
            let second = &entities[j];
            if !first.has_valid_size() || !second.has_valid_size() {
                continue;
            }

            let distance = first.distance_to(second);
            let colliding = distance < first.size + second.size
                && first.size != second.size
                && distance > COLLISION_EPSILON;
            if !colliding {
                continue;
            }

            let (devourer_idx, devoured_idx) = if first.size > second.size {
                (i, j)
            } else {
                (j, i)
            };

            let gain = entities[devoured_idx].size / 2.0;
            if gain <= 0.0 || gain >= MAX_GAIN {
                warn!(
                    "Rejecting devour of entity {} by {}: size gain {:.1} out of bounds",
                    entities[devoured_idx].id, entities[devourer_idx].id, gain
                );
                break;
            }

            let mut rng = rand::thread_rng();
            let (reset_x, reset_y) = random_spawn_point(&mut rng);
            let reset_size = rng.gen_range(RESET_SIZE_MIN..=RESET_SIZE_MAX);

            let devourer = &mut entities[devourer_idx];
            devourer.size = (devourer.size + gain).min(MAX_SIZE);
            devourer.score += gain as i32;
            let devourer_id = devourer.id;
            let devourer_size = devourer.size;
            let devourer_score = devourer.score;

            let devoured = &mut entities[devoured_idx];
            devoured.size = reset_size;
            devoured.x = reset_x;
            devoured.y = reset_y;
            // Agents keep their accumulated score across resets
            if !devoured.agent {
                devoured.score = 0;
            }

            info!(
                "Entity {} devoured entity {} (gain {:.1}, new size {:.1})",
                devourer_id, devoured.id, gain, devourer_size
            );

            return Some(DevourOutcome {
                devoured: devoured.id,
                devourer: devourer_id,
                devourer_size,
                devourer_score,
                reset_x,
                reset_y,
            });
        }
    }
    None
}
