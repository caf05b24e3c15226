//! Ringwatch test-signal generator
//!
//! Synthesizes raw PCM captures (16-bit signed LE, mono, 8 kHz) carrying
//! standard call-progress cadences, for feeding back through
//! `ringwatch analyze` or any other harness.

use std::path::PathBuf;

use bytes::{BufMut, BytesMut};
use clap::{Parser, ValueEnum};
use colored::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Parser)]
#[command(name = "ringwatch-tonegen")]
#[command(about = "Synthesize call-progress tone captures")]
#[command(version = ringwatch::VERSION)]
struct Cli {
    /// Cadence to synthesize
    #[arg(value_enum)]
    pattern: Pattern,

    /// Output file (raw s16le PCM)
    #[arg(short, long)]
    output: PathBuf,

    /// Number of on/off cycles
    #[arg(long, default_value = "4")]
    cycles: u32,

    /// Tone frequency in Hz
    #[arg(long, default_value = "450.0")]
    freq: f64,

    /// Sample rate in Hz
    #[arg(long, default_value = "8000")]
    rate: u32,

    /// Peak tone amplitude (16-bit full scale is 32767)
    #[arg(long, default_value = "10000")]
    amplitude: i16,

    /// Peak amplitude of added uniform noise, 0 to disable
    #[arg(long, default_value = "0")]
    noise: i16,

    /// Noise generator seed
    #[arg(long, default_value = "1")]
    seed: u64,
}

#[derive(Clone, Copy, ValueEnum)]
enum Pattern {
    /// 350 ms on / 350 ms off
    Busy,
    /// 1000 ms on / 4000 ms off
    Ringback,
    /// 700 ms on / 700 ms off
    Congestion,
    /// No tone at all
    Silence,
}

impl Pattern {
    fn cadence_ms(&self) -> (u64, u64) {
        match self {
            Pattern::Busy => (350, 350),
            Pattern::Ringback => (1000, 4000),
            Pattern::Congestion => (700, 700),
            Pattern::Silence => (0, 1000),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Pattern::Busy => "busy",
            Pattern::Ringback => "ringback",
            Pattern::Congestion => "congestion",
            Pattern::Silence => "silence",
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let samples = synthesize(
        cli.pattern,
        cli.cycles,
        cli.freq,
        cli.rate,
        cli.amplitude,
        cli.noise,
        cli.seed,
    );

    let mut buf = BytesMut::with_capacity(samples.len() * 2);
    for &sample in &samples {
        buf.put_i16_le(sample);
    }
    std::fs::write(&cli.output, &buf)?;

    let duration_ms = samples.len() as u64 * 1000 / cli.rate as u64;
    println!("{}", "Capture written".bold().blue());
    println!("  Pattern:  {}", cli.pattern.label().bold());
    println!("  File:     {}", cli.output.display());
    println!("  Duration: {} ms ({} samples)", duration_ms, samples.len());
    if cli.noise > 0 {
        println!("  Noise:    ±{} (seed {})", cli.noise, cli.seed);
    }

    Ok(())
}

/// Build the sample stream: a short lead-in of silence, then `cycles`
/// repetitions of silence-then-tone, then a tail of silence so the final
/// tone segment has a falling edge.
fn synthesize(
    pattern: Pattern,
    cycles: u32,
    freq: f64,
    rate: u32,
    amplitude: i16,
    noise: i16,
    seed: u64,
) -> Vec<i16> {
    let (on_ms, off_ms) = pattern.cadence_ms();
    let ms_to_samples = |ms: u64| (ms * rate as u64 / 1000) as usize;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut samples = Vec::new();
    let mut clock = 0usize;

    let mut push_run = |samples: &mut Vec<i16>, clock: &mut usize, len: usize, tone: bool| {
        for _ in 0..len {
            let mut value = if tone {
                let t = *clock as f64 / rate as f64;
                amplitude as f64 * (2.0 * std::f64::consts::PI * freq * t).sin()
            } else {
                0.0
            };
            if noise > 0 {
                value += rng.gen_range(-(noise as f64)..=noise as f64);
            }
            samples.push(value.clamp(i16::MIN as f64, i16::MAX as f64) as i16);
            *clock += 1;
        }
    };

    push_run(&mut samples, &mut clock, ms_to_samples(200), false);
    for _ in 0..cycles {
        push_run(&mut samples, &mut clock, ms_to_samples(off_ms), false);
        if on_ms > 0 {
            push_run(&mut samples, &mut clock, ms_to_samples(on_ms), true);
        }
    }
    push_run(&mut samples, &mut clock, ms_to_samples(200), false);

    samples
}
