//! Cadence pattern classification
//!
//! Matches completed segment pairs against the configured tone templates.
//! Templates are checked in fixed priority order; a match bumps that
//! template's consecutive counter and zeroes the rivals, a miss zeroes
//! everything. A template fires once its counter reaches its configured
//! consecutive-match requirement.

use crate::config::{TemplatesConfig, ToneTemplate};
use crate::detector::segmenter::SegmentPair;

/// Recognized call-progress tone cadences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneKind {
    Busy,
    Ringback,
    Congestion,
}

#[derive(Debug)]
struct TemplateState {
    kind: ToneKind,
    template: ToneTemplate,
    consecutive: u32,
}

impl TemplateState {
    fn matches(&self, pair: &SegmentPair) -> bool {
        pair.on_ms >= self.template.on_min_ms
            && pair.on_ms <= self.template.on_max_ms
            && pair.off_ms >= self.template.off_min_ms
            && pair.off_ms <= self.template.off_max_ms
    }
}

/// Consecutive-match state machine over segment pairs.
#[derive(Debug)]
pub struct PatternClassifier {
    // Priority order: busy, ringback, congestion.
    templates: Vec<TemplateState>,
}

impl PatternClassifier {
    pub fn new(config: &TemplatesConfig) -> Self {
        Self {
            templates: vec![
                TemplateState {
                    kind: ToneKind::Busy,
                    template: config.busy.clone(),
                    consecutive: 0,
                },
                TemplateState {
                    kind: ToneKind::Ringback,
                    template: config.ringback.clone(),
                    consecutive: 0,
                },
                TemplateState {
                    kind: ToneKind::Congestion,
                    template: config.congestion.clone(),
                    consecutive: 0,
                },
            ],
        }
    }

    /// Account for one completed segment pair. Returns the tone kind whose
    /// template just reached its consecutive-match requirement, if any.
    pub fn observe(&mut self, pair: &SegmentPair) -> Option<ToneKind> {
        let matched = self.templates.iter().position(|t| t.matches(pair));

        let Some(index) = matched else {
            for template in &mut self.templates {
                template.consecutive = 0;
            }
            return None;
        };

        for (i, template) in self.templates.iter_mut().enumerate() {
            if i != index {
                template.consecutive = 0;
            }
        }

        let state = &mut self.templates[index];
        state.consecutive += 1;
        if state.consecutive >= state.template.min_consecutive {
            Some(state.kind)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TemplatesConfig;

    fn pair(on_ms: u64, off_ms: u64) -> SegmentPair {
        SegmentPair { on_ms, off_ms }
    }

    fn classifier() -> PatternClassifier {
        PatternClassifier::new(&TemplatesConfig::default())
    }

    #[test]
    fn test_busy_template_bounds() {
        // Both bounds of both windows match.
        for on in [250, 350, 450] {
            for off in [250, 350, 450] {
                let mut c = classifier();
                c.observe(&pair(on, off));
                assert_eq!(c.observe(&pair(on, off)), Some(ToneKind::Busy));
            }
        }

        // Out-of-window tone durations never accumulate.
        for on in [200, 500] {
            let mut c = classifier();
            assert_eq!(c.observe(&pair(on, 350)), None);
            assert_eq!(c.observe(&pair(on, 350)), None);
        }
    }

    #[test]
    fn test_busy_requires_two_consecutive_matches() {
        let mut c = classifier();
        assert_eq!(c.observe(&pair(350, 350)), None);
        assert_eq!(c.observe(&pair(350, 350)), Some(ToneKind::Busy));
    }

    #[test]
    fn test_mismatch_resets_busy_counter() {
        let mut c = classifier();
        assert_eq!(c.observe(&pair(350, 350)), None);
        // A pair matching nothing zeroes the count...
        assert_eq!(c.observe(&pair(2000, 2000)), None);
        // ...so busy needs two fresh matches again.
        assert_eq!(c.observe(&pair(350, 350)), None);
        assert_eq!(c.observe(&pair(350, 350)), Some(ToneKind::Busy));
    }

    #[test]
    fn test_ringback_fires_on_single_match() {
        let mut c = classifier();
        assert_eq!(c.observe(&pair(1000, 4000)), Some(ToneKind::Ringback));
        assert_eq!(c.observe(&pair(900, 3000)), Some(ToneKind::Ringback));
        assert_eq!(c.observe(&pair(1200, 5000)), Some(ToneKind::Ringback));
    }

    #[test]
    fn test_busy_cadence_never_matches_ringback() {
        let mut c = classifier();
        let fired = c.observe(&pair(350, 350));
        assert_ne!(fired, Some(ToneKind::Ringback));
    }

    #[test]
    fn test_congestion_template() {
        for (on, off) in [(600, 500), (700, 700), (800, 900)] {
            let mut c = classifier();
            assert_eq!(c.observe(&pair(on, off)), None);
            assert_eq!(c.observe(&pair(on, off)), Some(ToneKind::Congestion));
        }
    }

    #[test]
    fn test_rival_match_resets_other_counters() {
        let mut c = classifier();
        assert_eq!(c.observe(&pair(350, 350)), None);
        // Ringback match zeroes the busy count.
        assert_eq!(c.observe(&pair(1000, 4000)), Some(ToneKind::Ringback));
        assert_eq!(c.observe(&pair(350, 350)), None);
        assert_eq!(c.observe(&pair(350, 350)), Some(ToneKind::Busy));
    }
}
