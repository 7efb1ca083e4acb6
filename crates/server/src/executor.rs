//! Move timing for automatic play

use rand::Rng;

use crate::settings::Settings;

const PREMOVE_MIN_MS: u64 = 50;
const PREMOVE_MAX_MS: u64 = 5_000;
const AUTO_MOVE_MIN_MS: u64 = 100;
const AUTO_MOVE_MAX_MS: u64 = 30_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timing {
    Premove,
    AutoMove,
}

#[derive(Debug, Default)]
pub struct MoveExecutor {
    premove_count: u32,
}

impl MoveExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn premove_count(&self) -> u32 {
        self.premove_count
    }

    pub fn reset(&mut self) {
        self.premove_count = 0;
    }

    /// Delay before the next automatic move. Premoves are used while the
    /// per-game budget lasts.
    pub fn next_delay<R: Rng + ?Sized>(&mut self, settings: &Settings, rng: &mut R) -> (u64, Timing) {
        if settings.premove_enabled && self.premove_count < settings.max_premoves {
            self.premove_count += 1;
            let delay = settings.premove_time
                + jitter(
                    settings.premove_time_random,
                    settings.premove_time_random_div,
                    settings.premove_time_random_multi,
                    rng,
                );
            return (delay.clamp(PREMOVE_MIN_MS, PREMOVE_MAX_MS), Timing::Premove);
        }

        let delay = settings.auto_move_time
            + jitter(
                settings.auto_move_time_random,
                settings.auto_move_time_random_div,
                settings.auto_move_time_random_multi,
                rng,
            );
        (delay.clamp(AUTO_MOVE_MIN_MS, AUTO_MOVE_MAX_MS), Timing::AutoMove)
    }
}

/// `(rand[0, range) mod div) * multi`; zero when range or div is zero
fn jitter<R: Rng + ?Sized>(range: u64, div: u64, multi: u64, rng: &mut R) -> u64 {
    if range == 0 || div == 0 {
        return 0;
    }
    (rng.random_range(0..range) % div).saturating_mul(multi)
}
