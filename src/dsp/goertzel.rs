//! Single-bin Goertzel filter
//!
//! Estimates signal energy at one target frequency over a fixed analysis
//! window, far cheaper than a full transform when only one bin matters. The
//! accumulator runs across frame boundaries: samples are pushed one at a
//! time and the energy is produced once per completed window.

/// Goertzel accumulator for a single target frequency.
///
/// The coefficient is computed per instance from the owning session's
/// configuration, so sessions with different targets can coexist.
#[derive(Debug, Clone)]
pub struct GoertzelFilter {
    coef: f64,
    s1: f64,
    s2: f64,
    count: usize,
    window: usize,
}

impl GoertzelFilter {
    /// Create a filter for `target_freq` Hz at `sample_rate` Hz with an
    /// analysis window of `window` samples.
    pub fn new(target_freq: f64, sample_rate: u32, window: usize) -> Self {
        let window = window.max(1);
        let k = (window as f64 * target_freq / sample_rate as f64).round();
        let coef = 2.0 * (2.0 * std::f64::consts::PI * k / window as f64).cos();
        Self {
            coef,
            s1: 0.0,
            s2: 0.0,
            count: 0,
            window,
        }
    }

    /// Feed one sample. Returns the normalized window energy when this
    /// sample completes the analysis window; the accumulator resets itself
    /// at that point. The counter never exceeds the window length.
    pub fn push(&mut self, sample: i16) -> Option<f64> {
        let s0 = sample as f64 + self.coef * self.s1 - self.s2;
        self.s2 = self.s1;
        self.s1 = s0;
        self.count += 1;

        if self.count >= self.window {
            let energy = self.energy();
            self.reset();
            Some(energy)
        } else {
            None
        }
    }

    /// Clear the accumulator for a new window.
    pub fn reset(&mut self) {
        self.s1 = 0.0;
        self.s2 = 0.0;
        self.count = 0;
    }

    /// Normalized power at the target frequency for the samples accumulated
    /// so far. Only meaningful for a complete window.
    fn energy(&self) -> f64 {
        let power = self.s1 * self.s1 + self.s2 * self.s2 - self.coef * self.s1 * self.s2;
        power / (self.window * self.window) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 8000;
    const WINDOW: usize = 205;

    fn sine(freq: f64, amplitude: f64, len: usize) -> Vec<i16> {
        (0..len)
            .map(|i| {
                let t = i as f64 / SAMPLE_RATE as f64;
                (amplitude * (2.0 * std::f64::consts::PI * freq * t).sin()) as i16
            })
            .collect()
    }

    fn window_energy(filter: &mut GoertzelFilter, samples: &[i16]) -> Option<f64> {
        let mut last = None;
        for &s in samples {
            if let Some(e) = filter.push(s) {
                last = Some(e);
            }
        }
        last
    }

    #[test]
    fn test_energy_only_on_window_boundary() {
        let mut filter = GoertzelFilter::new(450.0, SAMPLE_RATE, WINDOW);
        for (i, &s) in sine(450.0, 10_000.0, WINDOW).iter().enumerate() {
            let result = filter.push(s);
            if i + 1 == WINDOW {
                assert!(result.is_some());
            } else {
                assert!(result.is_none(), "energy produced at sample {}", i);
            }
        }
    }

    #[test]
    fn test_target_tone_has_high_energy() {
        let mut filter = GoertzelFilter::new(450.0, SAMPLE_RATE, WINDOW);
        let energy = window_energy(&mut filter, &sine(450.0, 10_000.0, WINDOW)).unwrap();
        assert!(energy > 1_000_000.0, "energy={}", energy);
    }

    #[test]
    fn test_silence_has_zero_energy() {
        let mut filter = GoertzelFilter::new(450.0, SAMPLE_RATE, WINDOW);
        let energy = window_energy(&mut filter, &vec![0i16; WINDOW]).unwrap();
        assert_eq!(energy, 0.0);
    }

    #[test]
    fn test_off_frequency_tone_is_attenuated() {
        let mut on_target = GoertzelFilter::new(450.0, SAMPLE_RATE, WINDOW);
        let mut off_target = GoertzelFilter::new(450.0, SAMPLE_RATE, WINDOW);

        let on_energy = window_energy(&mut on_target, &sine(450.0, 10_000.0, WINDOW)).unwrap();
        let off_energy = window_energy(&mut off_target, &sine(1700.0, 10_000.0, WINDOW)).unwrap();

        assert!(
            on_energy > off_energy * 100.0,
            "on={} off={}",
            on_energy,
            off_energy
        );
    }

    #[test]
    fn test_accumulator_resets_after_window() {
        let mut filter = GoertzelFilter::new(450.0, SAMPLE_RATE, WINDOW);

        // Loud window, then a silent window: the second result must not
        // carry energy over from the first.
        window_energy(&mut filter, &sine(450.0, 10_000.0, WINDOW)).unwrap();
        let silent = window_energy(&mut filter, &vec![0i16; WINDOW]).unwrap();
        assert_eq!(silent, 0.0);
    }

    #[test]
    fn test_window_spanning_frames() {
        // 160-sample frames (20 ms): the first window completes mid-way
        // through the second frame.
        let mut filter = GoertzelFilter::new(450.0, SAMPLE_RATE, WINDOW);
        let samples = sine(450.0, 10_000.0, 320);

        let first = window_energy(&mut filter, &samples[..160]);
        assert!(first.is_none());

        let second = window_energy(&mut filter, &samples[160..]);
        assert!(second.is_some());
        assert!(second.unwrap() > 1_000_000.0);
    }
}
