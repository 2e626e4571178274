//! Audible cues played at the start and end of a call.

use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

use crate::core::protocol::SAMPLE_RATE;

/// Produces fixed cue tones as mono f32 samples at the call sample rate.
pub trait ToneGenerator: Send + Sync {
    /// Cue played when the call connects.
    fn greeting(&self) -> Vec<f32>;

    /// Cue played right before the gateway hangs up.
    fn departure(&self) -> Vec<f32>;
}

/// One note of a cue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub frequency_hz: f32,
    pub duration_ms: u32,
}

impl Note {
    pub const fn new(frequency_hz: f32, duration_ms: u32) -> Self {
        Self {
            frequency_hz,
            duration_ms,
        }
    }
}

/// Sine-wave cues: a rising pair of notes on connect, a falling pair on hangup.
#[derive(Debug, Clone)]
pub struct SineToneGenerator {
    pub sample_rate: u32,
    pub amplitude: f32,
    pub greeting_notes: Vec<Note>,
    pub departure_notes: Vec<Note>,
}

impl Default for SineToneGenerator {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            amplitude: 0.3,
            greeting_notes: vec![Note::new(660.0, 150), Note::new(880.0, 200)],
            departure_notes: vec![Note::new(880.0, 150), Note::new(660.0, 200)],
        }
    }
}

impl SineToneGenerator {
    fn render(&self, notes: &[Note]) -> Vec<f32> {
        let rate = self.sample_rate as f32;
        let mut out = Vec::new();
        for note in notes {
            let len = (self.sample_rate as u64 * note.duration_ms as u64 / 1000) as usize;
            // 5ms linear fade on both ends to avoid clicks between notes
            let fade = ((rate * 0.005) as usize).min(len / 2).max(1);
            out.extend((0..len).map(|i| {
                let envelope = (i.min(len - 1 - i) as f32 / fade as f32).min(1.0);
                self.amplitude * envelope * (TAU * note.frequency_hz * i as f32 / rate).sin()
            }));
        }
        out
    }
}

impl ToneGenerator for SineToneGenerator {
    fn greeting(&self) -> Vec<f32> {
        self.render(&self.greeting_notes)
    }

    fn departure(&self) -> Vec<f32> {
        self.render(&self.departure_notes)
    }
}
