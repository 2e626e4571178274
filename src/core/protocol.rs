//! Wire protocol for the call WebSocket.
//!
//! A single WebSocket carries two frame kinds:
//!
//! - Binary frames: mono, 24 kHz, 32-bit float PCM samples (little-endian).
//!   Client frames may have any length; server frames are sent as fixed
//!   [`CHUNK_SAMPLES`]-sample chunks.
//! - Text frames: short control tokens (`EOS`, `INT`, `RDY`, `CLR`) mixed with
//!   free-form, human-readable status lines. Text that is not a control token
//!   is informational only and never an error.

use bytes::Bytes;
use std::fmt;

/// Sample rate of all audio exchanged on the call socket.
pub const SAMPLE_RATE: u32 = 24_000;

/// Number of samples per outbound binary frame.
pub const CHUNK_SAMPLES: usize = 1024;

/// Size in bytes of one encoded sample.
pub const BYTES_PER_SAMPLE: usize = std::mem::size_of::<f32>();

/// History text recorded when the caller interrupts the assistant.
pub const INTERRUPTED_MESSAGE: &str = "[Interrupted your last message]";

/// Status line sent before the gateway hangs up on the caller.
pub const HANGUP_MESSAGE: &str = "system: call ended by assistant";

/// Control tokens recognised on the text channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlToken {
    /// Server is ready for caller input (`RDY`).
    Ready,
    /// Caller finished speaking (`EOS`).
    EndOfSpeech,
    /// Caller interrupted playback (`INT`).
    Interrupt,
    /// Client should drop any buffered playback (`CLR`).
    ClearBuffer,
}

impl ControlToken {
    /// The literal wire value of this token.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ControlToken::Ready => "RDY",
            ControlToken::EndOfSpeech => "EOS",
            ControlToken::Interrupt => "INT",
            ControlToken::ClearBuffer => "CLR",
        }
    }

    /// Match a text payload against the known tokens.
    ///
    /// Matching is exact: `"eos"` or `" EOS"` are informational text, not tokens.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "RDY" => Some(ControlToken::Ready),
            "EOS" => Some(ControlToken::EndOfSpeech),
            "INT" => Some(ControlToken::Interrupt),
            "CLR" => Some(ControlToken::ClearBuffer),
            _ => None,
        }
    }
}

impl fmt::Display for ControlToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A contiguous block of mono f32 samples, kept in arrival order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioChunk(pub Vec<f32>);

impl AudioChunk {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn samples(&self) -> &[f32] {
        &self.0
    }
}

impl From<Vec<f32>> for AudioChunk {
    fn from(samples: Vec<f32>) -> Self {
        Self(samples)
    }
}

/// Classification of one inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Binary audio payload.
    Audio(AudioChunk),
    /// A recognised control token.
    Control(ControlToken),
    /// Any other text; kept verbatim.
    Unknown(String),
}

impl ClientMessage {
    /// Classify a text frame.
    pub fn from_text(text: &str) -> Self {
        match ControlToken::parse(text) {
            Some(token) => ClientMessage::Control(token),
            None => ClientMessage::Unknown(text.to_string()),
        }
    }

    /// Classify a binary frame.
    ///
    /// Returns the decoded chunk and the number of trailing bytes that did not
    /// form a whole sample.
    pub fn from_binary(data: &[u8]) -> (Self, usize) {
        let (samples, remainder) = decode_samples(data);
        (ClientMessage::Audio(AudioChunk(samples)), remainder)
    }
}

/// Decode little-endian f32 samples.
///
/// Returns the samples plus the count of leftover bytes that were ignored.
pub fn decode_samples(data: &[u8]) -> (Vec<f32>, usize) {
    let chunks = data.chunks_exact(BYTES_PER_SAMPLE);
    let remainder = chunks.remainder().len();
    let samples = chunks
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    (samples, remainder)
}

/// Encode samples as little-endian f32 bytes.
pub fn encode_samples(samples: &[f32]) -> Bytes {
    let mut out = Vec::with_capacity(samples.len() * BYTES_PER_SAMPLE);
    for sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }
    Bytes::from(out)
}

/// Concatenate chunks in arrival order into one contiguous buffer.
///
/// Chunk sizes are not assumed to be uniform; the output length is the sum of
/// all chunk lengths.
pub fn concat_chunks(chunks: &[AudioChunk]) -> Vec<f32> {
    let total: usize = chunks.iter().map(AudioChunk::len).sum();
    let mut out = Vec::with_capacity(total);
    for chunk in chunks {
        out.extend_from_slice(chunk.samples());
    }
    out
}

/// Split samples into outbound frames of at most [`CHUNK_SAMPLES`] samples.
pub fn chunk_frames(samples: &[f32]) -> impl Iterator<Item = Bytes> + '_ {
    samples.chunks(CHUNK_SAMPLES).map(encode_samples)
}

/// Format a transcript echo line (`"<speaker>: <message>"`).
pub fn transcript_line(speaker: &str, message: &str) -> String {
    format!("{speaker}: {message}")
}

/// Format a profiling line (`"time.<phase> <ms> ms"`).
pub fn timing_line(phase: &str, millis: u128) -> String {
    format!("time.{phase} {millis} ms")
}
