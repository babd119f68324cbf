//! Frame emission clock for the bake exporter.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Which time drives frame emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timing {
    /// Simulated time, from the step sizes passed to [`FrameClock::advance`].
    #[default]
    Simulation,
    /// Wall-clock time since the clock was created.
    Realtime,
}

impl FromStr for Timing {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simulation" => Ok(Self::Simulation),
            "realtime" => Ok(Self::Realtime),
            other => Err(Error::invalid(format!(
                "unknown timing '{other}', expected 'simulation' or 'realtime'"
            ))),
        }
    }
}

impl fmt::Display for Timing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simulation => f.write_str("simulation"),
            Self::Realtime => f.write_str("realtime"),
        }
    }
}

/// Turns simulation steps into a sequence of frame numbers at a fixed rate.
///
/// A frame is emitted when the accumulated time has reached the last
/// emission time plus one frame period; the step is accumulated after the
/// check. At most one frame is emitted per step.
#[derive(Debug, Clone)]
pub struct FrameClock {
    delta: f64,
    timing: Timing,
    next_frame: u64,
    current_time: f64,
    last_emitted: f64,
    started: Instant,
}

impl FrameClock {
    /// `fps` must be positive.
    pub fn new(fps: f64, timing: Timing) -> Self {
        Self {
            delta: fps.recip(),
            timing,
            next_frame: 0,
            current_time: 0.0,
            last_emitted: 0.0,
            started: Instant::now(),
        }
    }

    /// Advance by one step of `dt` seconds; returns the frame to capture.
    ///
    /// In realtime mode `dt` is ignored and replaced by the wall-clock time
    /// not yet accounted for.
    pub fn advance(&mut self, dt: f64) -> Option<u64> {
        let dt = match self.timing {
            Timing::Simulation => dt,
            Timing::Realtime => self.started.elapsed().as_secs_f64() - self.current_time,
        };

        let emitted = if self.current_time >= self.last_emitted + self.delta {
            let frame = self.next_frame;
            self.next_frame += 1;
            self.last_emitted += self.delta;
            Some(frame)
        } else {
            None
        };
        self.current_time += dt;
        emitted
    }

    /// Seconds per frame.
    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Number of frames emitted so far.
    pub fn frames_emitted(&self) -> u64 {
        self.next_frame
    }
}
