//! Audio-side gating for the outbound microphone stream.

pub mod gate;

pub use gate::{Clock, GateConfig, SystemClock, VoiceActivityGate, frame_rms};
