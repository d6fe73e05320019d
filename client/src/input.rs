//! Keyboard sampling for the controlled entity.

use macroquad::prelude::*;

/// Unit axis directions for one frame; the mirror scales them by the
/// configured player speed and elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MoveInput {
    pub dx: f32,
    pub dy: f32,
}

impl MoveInput {
    pub fn is_idle(&self) -> bool {
        self.dx == 0.0 && self.dy == 0.0
    }
}

/// Samples movement keys (WASD and arrows both work).
pub fn sample() -> MoveInput {
    let left = is_key_down(KeyCode::A) || is_key_down(KeyCode::Left);
    let right = is_key_down(KeyCode::D) || is_key_down(KeyCode::Right);
    let up = is_key_down(KeyCode::W) || is_key_down(KeyCode::Up);
    let down = is_key_down(KeyCode::S) || is_key_down(KeyCode::Down);

    MoveInput {
        dx: (right as i32 - left as i32) as f32,
        dy: (down as i32 - up as i32) as f32,
    }
}
