//! # Storm Intensity
//!
//! Half-sine ramp over the storm window: 0 at the start, 1 at the midpoint,
//! back to 0 when the window closes.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Length of the simulated storm, in minutes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StormWindow {
    pub minutes: u32,
}

impl Default for StormWindow {
    fn default() -> Self {
        Self { minutes: 60 }
    }
}

impl StormWindow {
    pub fn new(minutes: u32) -> Self {
        Self { minutes }
    }

    /// Intensity multiplier at `time_step` minutes into the storm.
    ///
    /// Steps past the end of the window are clamped to it. A zero-length
    /// window has no storm at all.
    pub fn intensity(&self, time_step: u32) -> f64 {
        if self.minutes == 0 {
            return 0.0;
        }
        let t = time_step.min(self.minutes) as f64;
        (t / self.minutes as f64 * PI).sin().clamp(0.0, 1.0)
    }
}

/// Intensity over the default 60-minute storm
pub fn intensity(time_step: u32) -> f64 {
    StormWindow::default().intensity(time_step)
}
