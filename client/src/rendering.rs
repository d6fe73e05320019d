//! Arena rendering: entities, HUD, leaderboard and the game-over overlay.

use crate::mirror::Mirror;
use macroquad::prelude::*;

const LEADERBOARD_ROWS: usize = 8;

pub struct Renderer {
    width: f32,
    height: f32,
}

impl Renderer {
    pub fn new(width: usize, height: usize) -> Self {
        Renderer {
            width: width as f32,
            height: height as f32,
        }
    }

    pub fn render(&mut self, mirror: &Mirror) {
        clear_background(Color::from_rgba(40, 40, 40, 255));

        // Camera follows the controlled entity when we have one
        let (cam_x, cam_y) = mirror
            .controlled_entity()
            .map(|e| (e.x, e.y))
            .unwrap_or((0.0, 0.0));

        for entity in mirror.entities() {
            let screen_x = entity.x - cam_x + self.width * 0.5;
            let screen_y = entity.y - cam_y + self.height * 0.5;
            draw_circle(screen_x, screen_y, entity.size, unpack_color(entity.color));
            draw_text(
                &entity.id.to_string(),
                screen_x - 10.0,
                screen_y - 10.0,
                14.0,
                WHITE,
            );
        }

        self.draw_hud(mirror);
        self.draw_leaderboard(mirror);

        if let Some(outcome) = mirror.outcome() {
            self.draw_game_over(mirror, outcome.winner, outcome.winner_score);
        }
    }

    fn draw_hud(&self, mirror: &Mirror) {
        if let Some(own) = mirror.controlled_entity() {
            draw_text(&format!("Your Score: {}", own.score), 10.0, 25.0, 20.0, WHITE);
            draw_text(&format!("Size: {:.1}", own.size), 10.0, 50.0, 20.0, WHITE);
        }
        draw_text(
            &format!("Time: {}", mirror.seconds_remaining()),
            self.width * 0.5 - 50.0,
            30.0,
            30.0,
            YELLOW,
        );
    }

    fn draw_leaderboard(&self, mirror: &Mirror) {
        let panel_x = self.width - 200.0;
        draw_rectangle(panel_x, 10.0, 190.0, 210.0, Color::from_rgba(0, 0, 0, 150));
        draw_text("LEADERBOARD", panel_x + 10.0, 30.0, 20.0, YELLOW);

        for (rank, entity) in mirror
            .leaderboard()
            .iter()
            .take(LEADERBOARD_ROWS)
            .enumerate()
        {
            let highlight = Some(entity.id) == mirror.controlled();
            let color = if highlight { GREEN } else { WHITE };
            draw_text(
                &format!("{}. #{} - {}", rank + 1, entity.id, entity.score),
                panel_x + 10.0,
                55.0 + rank as f32 * 20.0,
                15.0,
                color,
            );
        }
    }

    fn draw_game_over(&self, mirror: &Mirror, winner: u16, winner_score: i32) {
        draw_rectangle(0.0, 0.0, self.width, self.height, Color::from_rgba(0, 0, 0, 200));
        draw_text(
            "GAME OVER",
            self.width * 0.5 - 150.0,
            self.height * 0.5 - 100.0,
            50.0,
            RED,
        );

        let winner_color = mirror
            .get(winner)
            .map(|e| unpack_color(e.color))
            .unwrap_or(WHITE);
        draw_text(
            &format!("Winner: #{}", winner),
            self.width * 0.5 - 120.0,
            self.height * 0.5,
            30.0,
            winner_color,
        );
        draw_text(
            &format!("Final Score: {}", winner_score),
            self.width * 0.5 - 100.0,
            self.height * 0.5 + 50.0,
            30.0,
            YELLOW,
        );
    }
}

fn unpack_color(packed: u32) -> Color {
    Color::from_rgba(
        ((packed >> 16) & 0xFF) as u8,
        ((packed >> 8) & 0xFF) as u8,
        (packed & 0xFF) as u8,
        ((packed >> 24) & 0xFF) as u8,
    )
}
