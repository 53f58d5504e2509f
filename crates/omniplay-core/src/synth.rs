//! Progress and first-play synthesis
//!
//! Some backends never report playback percentages or a first play. These
//! are derived here from position/duration ticks and play transitions.

use serde_json::{json, Value};

/// Percentages that produce `playbackProgress{p}` events
pub const THRESHOLDS: [u8; 3] = [25, 50, 75];

/// A crossed progress threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressMark {
    pub percent: u8,
    pub position: f64,
    pub duration: f64,
}

impl ProgressMark {
    pub fn event_name(&self) -> String {
        format!("playbackProgress{}", self.percent)
    }

    pub fn payload(&self) -> Value {
        json!({
            "percent": self.percent,
            "seconds": self.position,
            "duration": self.duration,
        })
    }
}

/// Point detector for the progress thresholds
///
/// A threshold fires while the position sits on its integer second, once per
/// crossing. A tick that skips that second misses the event.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    armed: [bool; 3],
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one tick; returns the thresholds that fire on it
    pub fn tick(&mut self, position: f64, duration: f64) -> Vec<ProgressMark> {
        let mut marks = Vec::new();
        // duration is unknown until backend metadata loads
        if !position.is_finite() || !duration.is_finite() || duration <= 0.0 {
            return marks;
        }

        for (armed, percent) in self.armed.iter_mut().zip(THRESHOLDS) {
            let threshold = (duration / 100.0 * f64::from(percent)).floor();
            if threshold == position.floor() {
                if !*armed {
                    *armed = true;
                    marks.push(ProgressMark {
                        percent,
                        position,
                        duration,
                    });
                }
            } else {
                *armed = false;
            }
        }
        marks
    }

    /// Whether the threshold has fired for the current crossing
    pub fn is_fired(&self, percent: u8) -> bool {
        THRESHOLDS
            .iter()
            .position(|p| *p == percent)
            .is_some_and(|i| self.armed[i])
    }

    pub fn reset(&mut self) {
        self.armed = [false; 3];
    }
}

/// Tracks whether the first play of a play-through was seen
#[derive(Debug, Clone, Default)]
pub struct FirstPlayLatch {
    played_once: bool,
}

impl FirstPlayLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a play transition; true when it is the first one
    pub fn observe_play(&mut self) -> bool {
        !std::mem::replace(&mut self.played_once, true)
    }

    /// Re-arm after `stop()`
    pub fn reset(&mut self) {
        self.played_once = false;
    }

    pub fn played_once(&self) -> bool {
        self.played_once
    }
}
