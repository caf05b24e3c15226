//! Detection engine driver
//!
//! Owns all per-session state and sequences the analysis chain for each
//! inbound frame: timeout guard, broadband + narrow-band tone gate,
//! segmentation, cadence classification, verdict lifecycle. Purely
//! reactive: one synchronous `feed` call per frame, in strict temporal
//! order, no locking and no internal queuing.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::{AudioConfig, DetectionConfig, DetectorConfig};
use crate::detector::classifier::{PatternClassifier, ToneKind};
use crate::detector::segmenter::ToneSegmenter;
use crate::dsp::{rms, GoertzelFilter};
use crate::Result;

/// One frame of 16-bit mono PCM, tagged with the monotonic elapsed time in
/// milliseconds since detection start. Frame length is unconstrained.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<i16>,
    pub elapsed_ms: u64,
}

impl AudioFrame {
    pub fn new(samples: Vec<i16>, elapsed_ms: u64) -> Self {
        Self {
            samples,
            elapsed_ms,
        }
    }
}

/// Classification result for a detection session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Busy,
    Ringback,
    Congestion,
    Timeout,
    /// Still running, nothing recognized yet.
    Unknown,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Busy => "busy",
            Verdict::Ringback => "ringback",
            Verdict::Congestion => "congestion",
            Verdict::Timeout => "timeout",
            Verdict::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of feeding one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOutcome {
    /// Frame consumed, still analyzing.
    Continue,
    /// A verdict fired on this frame. `hangup` is set when the configured
    /// policy wants the call terminated for this verdict.
    Detected { verdict: Verdict, hangup: bool },
    /// The session is already terminal or cancelled; the frame was ignored.
    Closed,
}

/// Per-session tone detection engine.
pub struct ToneDetector {
    audio: AudioConfig,
    detection: DetectionConfig,
    goertzel: GoertzelFilter,
    segmenter: ToneSegmenter,
    classifier: PatternClassifier,
    /// Most recent completed narrow-band window energy. Holds its value
    /// between window completions, 0.0 until the first window completes.
    tone_energy: f64,
    verdict: Verdict,
    active: bool,
}

impl ToneDetector {
    /// Build an engine from a validated configuration. Invalid
    /// configurations are rejected here, before any frame is processed.
    pub fn new(config: &DetectorConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            goertzel: GoertzelFilter::new(
                config.audio.target_freq,
                config.audio.sample_rate,
                config.audio.goertzel_window,
            ),
            segmenter: ToneSegmenter::new(config.detection.min_tone_ms),
            classifier: PatternClassifier::new(&config.templates),
            audio: config.audio.clone(),
            detection: config.detection.clone(),
            tone_energy: 0.0,
            verdict: Verdict::Unknown,
            active: true,
        })
    }

    /// Consume one frame. Frames arriving after a terminal verdict or a
    /// cancel are ignored; empty frames are skipped without touching timing
    /// state.
    pub fn feed(&mut self, frame: &AudioFrame) -> FeedOutcome {
        if !self.active {
            return FeedOutcome::Closed;
        }

        if frame.samples.is_empty() {
            trace!(elapsed_ms = frame.elapsed_ms, "skipping empty frame");
            return FeedOutcome::Continue;
        }

        if frame.elapsed_ms > self.detection.max_detect_time_ms {
            return self.finish(Verdict::Timeout, false);
        }

        let broadband = rms(&frame.samples);
        for &sample in &frame.samples {
            if let Some(energy) = self.goertzel.push(sample) {
                self.tone_energy = energy;
            }
        }

        let tone_present = gate(broadband, self.tone_energy, &self.audio);

        let Some(pair) = self.segmenter.update(tone_present, frame.elapsed_ms) else {
            return FeedOutcome::Continue;
        };
        trace!(on_ms = pair.on_ms, off_ms = pair.off_ms, "segment pair completed");

        let Some(kind) = self.classifier.observe(&pair) else {
            return FeedOutcome::Continue;
        };

        match kind {
            ToneKind::Busy => self.finish(Verdict::Busy, self.detection.hangup_on.busy),
            ToneKind::Congestion => {
                self.finish(Verdict::Congestion, self.detection.hangup_on.congestion)
            }
            ToneKind::Ringback => {
                if self.detection.hangup_on.ringback {
                    self.finish(Verdict::Ringback, true)
                } else {
                    // A ringing line may still resolve to busy or an
                    // answer, so the session stays open and keeps the most
                    // recent ringback as its best-known verdict.
                    self.verdict = Verdict::Ringback;
                    debug!("ringback detected, continuing analysis");
                    FeedOutcome::Detected {
                        verdict: Verdict::Ringback,
                        hangup: false,
                    }
                }
            }
        }
    }

    /// Current best-known verdict. `Unknown` while nothing has fired.
    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    /// Whether the session is still consuming frames.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Cooperative cancellation: all subsequent frames become no-ops. The
    /// verdict is left as-is.
    pub fn cancel(&mut self) {
        if self.active {
            debug!("detection cancelled");
            self.active = false;
        }
    }

    fn finish(&mut self, verdict: Verdict, hangup: bool) -> FeedOutcome {
        debug!(verdict = verdict.as_str(), hangup, "verdict reached");
        self.verdict = verdict;
        self.active = false;
        FeedOutcome::Detected { verdict, hangup }
    }
}

/// Combined tone-present decision: the frame must carry broadband energy
/// AND the narrow-band energy at the target frequency must be present.
/// Broadband level alone never opens the gate, so noise or speech in early
/// media is not mistaken for a progress tone.
fn gate(broadband: f64, narrowband: f64, audio: &AudioConfig) -> bool {
    broadband > audio.rms_threshold && narrowband > audio.tone_energy_threshold
}
