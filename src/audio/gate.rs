//! Energy-based voice activity gate.
//!
//! Every captured frame passes through [`VoiceActivityGate::should_forward`]
//! before it is allowed upstream. The gate tracks a smoothed RMS envelope
//! with asymmetric behavior: rising energy snaps the envelope up instantly
//! so the first syllable of an utterance is never clipped, while falling
//! energy decays exponentially so the envelope rides out short gaps between
//! words. A trailing hold window keeps frames flowing briefly after the
//! envelope drops below the threshold, preserving breathy word endings.
//!
//! While the gate is suppressing, [`VoiceActivityGate::poll_keepalive`]
//! reports when a silence keepalive should be sent so the upstream
//! connection does not idle out.

use std::time::{Duration, Instant};

use log::debug;

use crate::config::AudioConfig;
use crate::defaults;

/// Time source for the gate's hold and keepalive windows.
///
/// Production code uses [`SystemClock`]; tests substitute a mock so hold
/// expiry can be exercised without sleeping.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Clock backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Tuning parameters for the gate.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Smoothed-RMS level above which frames are treated as speech.
    pub threshold: f32,
    /// Exponential decay factor applied while the envelope is falling.
    pub smoothing: f32,
    /// How long frames keep flowing after the envelope drops below the
    /// threshold.
    pub hold: Duration,
    /// Minimum spacing between keepalive signals during suppression.
    pub keepalive_interval: Duration,
    /// How often ongoing suppression is reported to the log.
    pub silence_log_interval: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            threshold: defaults::VAD_THRESHOLD,
            smoothing: defaults::VAD_SMOOTHING,
            hold: Duration::from_millis(u64::from(defaults::VAD_HOLD_MS)),
            keepalive_interval: Duration::from_millis(u64::from(defaults::KEEPALIVE_INTERVAL_MS)),
            silence_log_interval: Duration::from_millis(u64::from(
                defaults::SILENCE_LOG_INTERVAL_MS,
            )),
        }
    }
}

impl GateConfig {
    /// Builds gate settings from the audio section of the app config.
    pub fn from_config(audio: &AudioConfig) -> Self {
        Self {
            threshold: audio.vad_threshold,
            smoothing: audio.vad_smoothing,
            hold: Duration::from_millis(u64::from(audio.vad_hold_ms)),
            keepalive_interval: Duration::from_millis(u64::from(audio.keepalive_interval_ms)),
            silence_log_interval: Duration::from_millis(u64::from(
                defaults::SILENCE_LOG_INTERVAL_MS,
            )),
        }
    }
}

/// Decides, frame by frame, whether microphone audio is worth sending.
pub struct VoiceActivityGate<C: Clock = SystemClock> {
    config: GateConfig,
    smoothed: f32,
    last_speech: Option<Instant>,
    suppressing: bool,
    suppressed_frames: u64,
    silence_started: Option<Instant>,
    last_silence_log: Option<Instant>,
    last_keepalive: Option<Instant>,
    clock: C,
}

impl VoiceActivityGate<SystemClock> {
    pub fn new(config: GateConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> VoiceActivityGate<C> {
    pub fn with_clock(config: GateConfig, clock: C) -> Self {
        Self {
            config,
            smoothed: 0.0,
            last_speech: None,
            suppressing: false,
            suppressed_frames: 0,
            silence_started: None,
            last_silence_log: None,
            last_keepalive: None,
            clock,
        }
    }

    /// Returns `true` if the frame should be forwarded upstream.
    ///
    /// Leading silence before the first utterance is always suppressed; the
    /// trailing hold window only opens once speech has been observed.
    pub fn should_forward(&mut self, samples: &[f32]) -> bool {
        let rms = frame_rms(samples);

        // Attack snaps the envelope up instantly; release decays it.
        if rms > self.smoothed {
            self.smoothed = rms;
        } else {
            self.smoothed =
                self.smoothed * self.config.smoothing + rms * (1.0 - self.config.smoothing);
        }

        let now = self.clock.now();

        if self.smoothed > self.config.threshold {
            self.note_speech(now);
            return true;
        }

        // Trailing hold: the tail of an utterance passes, but the window is
        // anchored to the last over-threshold frame and is not refreshed here.
        if let Some(last) = self.last_speech
            && now.duration_since(last) < self.config.hold
        {
            return true;
        }

        self.note_suppressed(now);
        false
    }

    /// Returns `true` when a silence keepalive is due.
    ///
    /// Fires only while the gate is suppressing, at most once per configured
    /// interval. Speech resets the schedule.
    pub fn poll_keepalive(&mut self) -> bool {
        if !self.suppressing {
            return false;
        }
        let now = self.clock.now();
        if let Some(prev) = self.last_keepalive
            && now.duration_since(prev) < self.config.keepalive_interval
        {
            return false;
        }
        self.last_keepalive = Some(now);
        true
    }

    /// Current smoothed RMS level.
    pub fn level(&self) -> f32 {
        self.smoothed
    }

    /// Clears all envelope and timing state.
    pub fn reset(&mut self) {
        self.smoothed = 0.0;
        self.last_speech = None;
        self.suppressing = false;
        self.suppressed_frames = 0;
        self.silence_started = None;
        self.last_silence_log = None;
        self.last_keepalive = None;
    }

    fn note_speech(&mut self, now: Instant) {
        if self.suppressed_frames > 0 {
            debug!(
                "speech resumed after {} suppressed frames",
                self.suppressed_frames
            );
        }
        self.last_speech = Some(now);
        self.suppressing = false;
        self.suppressed_frames = 0;
        self.silence_started = None;
        self.last_silence_log = None;
        self.last_keepalive = None;
    }

    fn note_suppressed(&mut self, now: Instant) {
        self.suppressing = true;
        self.suppressed_frames += 1;
        if self.silence_started.is_none() {
            self.silence_started = Some(now);
            self.last_silence_log = Some(now);
        }
        if let Some(last) = self.last_silence_log
            && now.duration_since(last) >= self.config.silence_log_interval
        {
            let elapsed = self
                .silence_started
                .map(|s| now.duration_since(s))
                .unwrap_or_default();
            debug!(
                "suppressing silence: {} frames over {:.1}s",
                self.suppressed_frames,
                elapsed.as_secs_f32()
            );
            self.last_silence_log = Some(now);
        }
    }
}

/// Root-mean-square energy of a frame of normalized samples.
pub fn frame_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    (sum / samples.len() as f64).sqrt() as f32
}
