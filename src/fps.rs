use std::collections::VecDeque;
use std::time::Instant;

// number of recent measurements kept for the session summary
const HISTORY: usize = 10;

/// Instantaneous frame rate: the reciprocal of the time between two consecutive ticks.
pub struct FpsMeter {
    last_tick: Option<Instant>,
    history: VecDeque<f32>,
    frames: u64,
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl FpsMeter {
    pub fn new() -> Self {
        Self {
            last_tick: None,
            history: VecDeque::with_capacity(HISTORY),
            frames: 0,
        }
    }

    /// Records a measurement point at the current time.
    ///
    /// Returns `None` on the first tick, when there is nothing to measure against.
    pub fn tick(&mut self) -> Option<f32> {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> Option<f32> {
        self.frames += 1;
        let previous = self.last_tick.replace(now)?;

        let elapsed = now.saturating_duration_since(previous).as_secs_f32();
        let fps = 1.0 / elapsed;

        if fps.is_finite() {
            if self.history.len() == HISTORY {
                self.history.pop_front();
            }
            self.history.push_back(fps);
        }
        Some(fps)
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    // mean of the last few finite measurements
    pub fn mean(&self) -> Option<f32> {
        if self.history.is_empty() {
            return None;
        }
        Some(self.history.iter().sum::<f32>() / self.history.len() as f32)
    }
}
