//! Countdown clock and end-state machine.
//!
//! `Warmup` until the first viewer joins (which spawns the agent batch and
//! starts the match), then `Running` while the countdown ticks, then the
//! terminal `Over`. The clock only advances while agents are present, so a
//! server idling with no one connected never burns match time.

use log::info;
use shared::{Entity, INVALID_ENTITY};
use std::time::Duration;

const COUNTDOWN_STEP: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Warmup,
    Running,
    Over,
}

/// Events the broadcaster turns into reliable messages.
#[derive(Debug, Clone, PartialEq)]
pub enum ClockEvent {
    TimeChanged { seconds_remaining: i32 },
    GameOver { winner: u16, winner_score: i32 },
}

#[derive(Debug)]
pub struct GameClock {
    phase: Phase,
    seconds_remaining: i32,
    accumulator: Duration,
}

impl GameClock {
    pub fn new(duration_secs: i32) -> Self {
        Self {
            phase: Phase::Warmup,
            seconds_remaining: duration_secs,
            accumulator: Duration::ZERO,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn seconds_remaining(&self) -> i32 {
        self.seconds_remaining
    }

    /// Warmup → Running. Happens exactly once, on the first join.
    pub fn start(&mut self) {
        if self.phase == Phase::Warmup {
            self.phase = Phase::Running;
            info!("Match started: {} seconds", self.seconds_remaining);
        }
    }

    /// Accumulates elapsed time; each full second decrements the countdown
    /// and emits a time event. Reaching zero selects the winner (strictly
    /// highest score, keeping the first-seen maximum so the lowest
    /// identifier wins a tie), emits one game-over event, and enters
    /// `Over`.
    pub fn advance(&mut self, dt: Duration, entities: &[Entity]) -> Vec<ClockEvent> {
        let mut events = Vec::new();
        if self.phase != Phase::Running || !entities.iter().any(|e| e.agent) {
            return events;
        }

        self.accumulator += dt;
        if self.accumulator >= COUNTDOWN_STEP {
            self.accumulator = Duration::ZERO;
            self.seconds_remaining -= 1;
            events.push(ClockEvent::TimeChanged {
                seconds_remaining: self.seconds_remaining,
            });

            if self.seconds_remaining <= 0 {
                self.seconds_remaining = 0;
                let (winner, winner_score) = select_winner(entities);
                info!("Game over: winner is entity {} with score {}", winner, winner_score);
                events.push(ClockEvent::GameOver {
                    winner,
                    winner_score,
                });
                self.phase = Phase::Over;
            }
        }
        events
    }
}

fn select_winner(entities: &[Entity]) -> (u16, i32) {
    let mut winner = INVALID_ENTITY;
    let mut highest_score = -1;
    for entity in entities {
        if entity.score > highest_score {
            highest_score = entity.score;
            winner = entity.id;
        }
    }
    (winner, highest_score)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena(scores: &[i32]) -> Vec<Entity> {
        scores
            .iter()
            .enumerate()
            .map(|(i, score)| {
                let mut entity = Entity::new(i as u16, 0.0, 0.0, 8.0, 0);
                entity.agent = true;
                entity.score = *score;
                entity
            })
            .collect()
    }

    #[test]
    fn test_warmup_does_not_advance() {
        let mut clock = GameClock::new(60);
        let entities = arena(&[0]);
        assert!(clock.advance(Duration::from_secs(5), &entities).is_empty());
        assert_eq!(clock.seconds_remaining(), 60);
        assert_eq!(clock.phase(), Phase::Warmup);
    }

    #[test]
    fn test_no_agents_no_progress() {
        let mut clock = GameClock::new(60);
        clock.start();
        assert!(clock.advance(Duration::from_secs(5), &[]).is_empty());
        assert_eq!(clock.seconds_remaining(), 60);
    }

    #[test]
    fn test_start_is_one_shot() {
        let mut clock = GameClock::new(1);
        clock.start();
        let entities = arena(&[3]);
        clock.advance(Duration::from_secs(2), &entities);
        assert_eq!(clock.phase(), Phase::Over);
        // A later start must not resurrect the match
        clock.start();
        assert_eq!(clock.phase(), Phase::Over);
    }

    #[test]
    fn test_countdown_step_emits_time_event() {
        let mut clock = GameClock::new(60);
        clock.start();
        let entities = arena(&[0, 0]);

        assert!(clock.advance(Duration::from_millis(400), &entities).is_empty());
        let events = clock.advance(Duration::from_millis(700), &entities);
        assert_eq!(
            events,
            vec![ClockEvent::TimeChanged {
                seconds_remaining: 59
            }]
        );
        assert_eq!(clock.seconds_remaining(), 59);
    }

    #[test]
    fn test_countdown_reaches_zero_once() {
        let mut clock = GameClock::new(2);
        clock.start();
        let entities = arena(&[5, 9, 9]);

        let mut game_over_events = 0;
        for _ in 0..10 {
            for event in clock.advance(Duration::from_secs(1), &entities) {
                if let ClockEvent::GameOver { winner, winner_score } = event {
                    game_over_events += 1;
                    // Strictly-highest with ties to the first-seen maximum
                    assert_eq!(winner, 1);
                    assert_eq!(winner_score, 9);
                }
            }
        }

        assert_eq!(game_over_events, 1);
        assert_eq!(clock.phase(), Phase::Over);
        assert_eq!(clock.seconds_remaining(), 0);
    }

    #[test]
    fn test_countdown_never_negative() {
        let mut clock = GameClock::new(1);
        clock.start();
        let entities = arena(&[0]);
        for _ in 0..5 {
            clock.advance(Duration::from_secs(3), &entities);
        }
        assert!(clock.seconds_remaining() >= 0);
    }

    #[test]
    fn test_winner_score_is_the_maximum() {
        let entities = arena(&[2, 7, 4]);
        let (winner, score) = select_winner(&entities);
        assert_eq!(winner, 1);
        assert_eq!(score, entities.iter().map(|e| e.score).max().unwrap());
    }
}
