//! Tone/silence segmentation
//!
//! Turns the per-frame "tone present" boolean stream into timed on/off
//! segments. A segment's duration is only known once the state flips, so
//! pairs are emitted at falling edges: the tone that just ended together
//! with the silence that preceded it.

/// One completed cadence measurement: tone duration and the silence
/// duration that preceded the tone, both in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentPair {
    pub on_ms: u64,
    pub off_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentState {
    InTone,
    InSilence,
}

/// Edge tracker over the tone-present stream.
#[derive(Debug)]
pub struct ToneSegmenter {
    state: SegmentState,
    tone_start_ms: u64,
    /// Start of the silence run preceding the current/next tone. None until
    /// the first silent update is seen.
    silence_start_ms: Option<u64>,
    /// Tone segments shorter than this are glitches: dropped, with the
    /// surrounding silence treated as continuous.
    min_tone_ms: u64,
}

impl ToneSegmenter {
    pub fn new(min_tone_ms: u64) -> Self {
        Self {
            state: SegmentState::InSilence,
            tone_start_ms: 0,
            silence_start_ms: None,
            min_tone_ms,
        }
    }

    /// Advance the tracker with the gate decision for the frame at
    /// `now_ms`. Returns a completed pair on a falling edge, provided a
    /// preceding silence was on record and the tone met the minimum
    /// duration. The very first edge can therefore never emit a pair.
    pub fn update(&mut self, tone_present: bool, now_ms: u64) -> Option<SegmentPair> {
        match (self.state, tone_present) {
            (SegmentState::InSilence, true) => {
                self.state = SegmentState::InTone;
                self.tone_start_ms = now_ms;
                None
            }
            (SegmentState::InTone, false) => {
                self.state = SegmentState::InSilence;
                let on_ms = now_ms.saturating_sub(self.tone_start_ms);

                if on_ms < self.min_tone_ms {
                    // Glitch: keep the old silence start so the
                    // interrupted silence reads as one run.
                    return None;
                }

                let pair = self.silence_start_ms.map(|silence_start| SegmentPair {
                    on_ms,
                    off_ms: self.tone_start_ms.saturating_sub(silence_start),
                });
                self.silence_start_ms = Some(now_ms);
                pair
            }
            (SegmentState::InSilence, false) => {
                if self.silence_start_ms.is_none() {
                    self.silence_start_ms = Some(now_ms);
                }
                None
            }
            (SegmentState::InTone, true) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cycle_emits_pair() {
        let mut seg = ToneSegmenter::new(10);

        assert_eq!(seg.update(false, 20), None);
        assert_eq!(seg.update(false, 400), None);
        assert_eq!(seg.update(true, 420), None);
        let pair = seg.update(false, 770).unwrap();
        assert_eq!(pair.on_ms, 350);
        assert_eq!(pair.off_ms, 400);
    }

    #[test]
    fn test_first_tone_without_preceding_silence_emits_nothing() {
        let mut seg = ToneSegmenter::new(10);

        // Stream opens mid-tone: no silence on record when it ends.
        assert_eq!(seg.update(true, 20), None);
        assert_eq!(seg.update(false, 370), None);

        // The next full cycle measures normally.
        assert_eq!(seg.update(true, 720), None);
        let pair = seg.update(false, 1070).unwrap();
        assert_eq!(pair.on_ms, 350);
        assert_eq!(pair.off_ms, 350);
    }

    #[test]
    fn test_consecutive_cycles_measure_intervening_silence() {
        let mut seg = ToneSegmenter::new(10);

        seg.update(false, 20);
        seg.update(true, 420);
        seg.update(false, 770).unwrap();
        seg.update(true, 1120);
        let pair = seg.update(false, 1470).unwrap();
        assert_eq!(pair.on_ms, 350);
        assert_eq!(pair.off_ms, 350);
    }

    #[test]
    fn test_glitch_tone_is_dropped_and_silence_continues() {
        let mut seg = ToneSegmenter::new(10);

        seg.update(false, 20);
        // 5 ms blip inside what should read as one long silence.
        seg.update(true, 300);
        assert_eq!(seg.update(false, 305), None);

        // Real tone: its preceding silence spans the blip.
        seg.update(true, 420);
        let pair = seg.update(false, 770).unwrap();
        assert_eq!(pair.on_ms, 350);
        assert_eq!(pair.off_ms, 400);
    }

    #[test]
    fn test_no_edges_no_pairs() {
        let mut seg = ToneSegmenter::new(10);
        for t in (0..100).map(|i| i * 20) {
            assert_eq!(seg.update(false, t), None);
        }
    }

    #[test]
    fn test_sustained_tone_emits_nothing_until_falling_edge() {
        let mut seg = ToneSegmenter::new(10);
        seg.update(false, 20);
        for t in (1..50).map(|i| 20 + i * 20) {
            assert_eq!(seg.update(true, t), None);
        }
    }
}
