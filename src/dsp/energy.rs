//! Broadband frame energy

/// Root-mean-square magnitude of a frame of signed 16-bit samples.
///
/// This is the coarse "is there any signal at all" measure; it says nothing
/// about frequency content. Returns 0.0 for an empty frame.
pub fn rms(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples
        .iter()
        .map(|&s| {
            let s = s as f64;
            s * s
        })
        .sum();
    (sum / samples.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_frame_is_zero() {
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn test_silence_is_zero() {
        let samples = vec![0i16; 160];
        assert_eq!(rms(&samples), 0.0);
    }

    #[test]
    fn test_square_wave_rms_equals_amplitude() {
        let samples: Vec<i16> = (0..160)
            .map(|i| if i % 2 == 0 { 1000 } else { -1000 })
            .collect();
        let value = rms(&samples);
        assert!((value - 1000.0).abs() < 1e-9, "rms={}", value);
    }

    #[test]
    fn test_sine_rms_is_amplitude_over_sqrt2() {
        let amplitude = 10_000.0;
        let samples: Vec<i16> = (0..800)
            .map(|i| {
                let t = i as f64 / 8000.0;
                (amplitude * (2.0 * std::f64::consts::PI * 450.0 * t).sin()) as i16
            })
            .collect();
        let expected = amplitude / 2f64.sqrt();
        let value = rms(&samples);
        assert!((value - expected).abs() / expected < 0.02, "rms={}", value);
    }
}
