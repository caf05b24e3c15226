//! Ringwatch main application

use std::path::PathBuf;

use bytes::{Buf, Bytes};
use clap::{Parser, Subcommand};
use colored::*;
use serde::Serialize;
use tracing::{info, warn};

use ringwatch::config::DetectorConfig;
use ringwatch::detector::{AudioFrame, FeedOutcome, Verdict};
use ringwatch::services::{CallProgressService, ProgressEvent};
use ringwatch::utils::setup_logging;
use ringwatch::Result;

#[derive(Parser)]
#[command(name = "ringwatch")]
#[command(about = "Call progress tone detection for early media")]
#[command(version = ringwatch::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a raw PCM capture (16-bit signed LE, mono, 8 kHz)
    Analyze {
        /// Capture file to analyze
        input: PathBuf,
        /// Frame size in milliseconds used when feeding the engine
        #[arg(long, default_value = "20")]
        frame_ms: u64,
        /// Emit the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate configuration
    ValidateConfig,
    /// Generate default configuration
    GenerateConfig {
        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct AnalysisReport {
    input: String,
    verdict: Verdict,
    hangup: bool,
    frames_fed: usize,
    audio_ms: u64,
    analyzed_at: chrono::DateTime<chrono::Utc>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_configuration(&cli)?;
    setup_logging(&config.logging)?;

    info!("Starting {} v{}", ringwatch::NAME, ringwatch::VERSION);

    match &cli.command {
        Commands::Analyze {
            input,
            frame_ms,
            json,
        } => analyze_capture(config, input, *frame_ms, *json).await,
        Commands::ValidateConfig => validate_configuration(&config),
        Commands::GenerateConfig { output } => generate_default_config(output.clone()),
    }
}

fn load_configuration(cli: &Cli) -> Result<DetectorConfig> {
    let config = if let Some(config_path) = &cli.config {
        DetectorConfig::load_from_file(config_path)?
    } else {
        match DetectorConfig::load_from_env() {
            Ok(config) => config,
            Err(_) => DetectorConfig::default_config(),
        }
    };

    config.validate()?;
    Ok(config)
}

async fn analyze_capture(
    config: DetectorConfig,
    input: &PathBuf,
    frame_ms: u64,
    json: bool,
) -> Result<()> {
    if frame_ms == 0 {
        return Err(ringwatch::Error::parse("Frame size must be positive"));
    }

    let samples = read_pcm(input)?;
    let sample_rate = config.audio.sample_rate as u64;
    let samples_per_frame = ((sample_rate * frame_ms / 1000) as usize).max(1);
    info!(
        "Analyzing {} ({} samples, {} ms frames)",
        input.display(),
        samples.len(),
        frame_ms
    );

    let mut service = CallProgressService::new(config);
    let mut event_rx = service
        .take_event_receiver()
        .ok_or_else(|| ringwatch::Error::internal("Failed to get event receiver"))?;

    let event_task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            handle_progress_event(event);
        }
    });

    let session_id = service.attach()?;

    let mut final_verdict = Verdict::Unknown;
    let mut final_hangup = false;
    let mut frames_fed = 0usize;

    for (index, chunk) in samples.chunks(samples_per_frame).enumerate() {
        let elapsed_ms = (index as u64 + 1) * frame_ms;
        let frame = AudioFrame::new(chunk.to_vec(), elapsed_ms);

        match service.feed(session_id, &frame)? {
            FeedOutcome::Continue => {}
            FeedOutcome::Detected { verdict, hangup } => {
                final_verdict = verdict;
                final_hangup = hangup;
            }
            FeedOutcome::Closed => break,
        }
        frames_fed += 1;

        if !service.is_active(session_id) {
            break;
        }
    }

    if final_verdict == Verdict::Unknown {
        final_verdict = service.verdict(session_id).unwrap_or(Verdict::Unknown);
    }

    service.detach(session_id)?;
    drop(service);
    let _ = event_task.await;

    let audio_ms = samples.len() as u64 * 1000 / sample_rate;
    if json {
        let report = AnalysisReport {
            input: input.display().to_string(),
            verdict: final_verdict,
            hangup: final_hangup,
            frames_fed,
            audio_ms,
            analyzed_at: chrono::Utc::now(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_verdict(final_verdict, final_hangup, frames_fed, audio_ms);
    }

    Ok(())
}

fn print_verdict(verdict: Verdict, hangup: bool, frames_fed: usize, audio_ms: u64) {
    println!();
    println!("{}", "Analysis Result".bold().blue());
    let rendered = match verdict {
        Verdict::Busy => "BUSY".red().bold(),
        Verdict::Ringback => "RINGBACK".green().bold(),
        Verdict::Congestion => "CONGESTION".yellow().bold(),
        Verdict::Timeout => "TIMEOUT".dimmed().bold(),
        Verdict::Unknown => "UNKNOWN".normal(),
    };
    println!("  Verdict:    {}", rendered);
    println!("  Hangup:     {}", if hangup { "requested".red() } else { "no".normal() });
    println!("  Frames fed: {}", frames_fed);
    println!("  Audio:      {} ms", audio_ms);
}

fn handle_progress_event(event: ProgressEvent) {
    match event {
        ProgressEvent::SessionAttached { session_id } => {
            info!("Session attached: {}", session_id);
        }
        ProgressEvent::VerdictReached {
            session_id,
            verdict,
            hangup,
        } => {
            info!("Session {}: verdict {} (hangup: {})", session_id, verdict, hangup);
        }
        ProgressEvent::SessionDetached {
            session_id,
            verdict,
        } => {
            info!("Session detached: {} (final verdict: {})", session_id, verdict);
        }
    }
}

/// Read a raw s16le capture into samples. A trailing odd byte is dropped
/// with a warning rather than failing the whole analysis.
fn read_pcm(path: &std::path::Path) -> Result<Vec<i16>> {
    let data = std::fs::read(path)?;
    if data.len() % 2 != 0 {
        warn!("{}: trailing odd byte ignored", path.display());
    }

    let mut buf = Bytes::from(data);
    let mut samples = Vec::with_capacity(buf.remaining() / 2);
    while buf.remaining() >= 2 {
        samples.push(buf.get_i16_le());
    }

    if samples.is_empty() {
        return Err(ringwatch::Error::frame("Capture contains no samples"));
    }
    Ok(samples)
}

fn validate_configuration(config: &DetectorConfig) -> Result<()> {
    config.validate()?;

    println!("{}", "✓ Configuration is valid".green());
    println!("  Node ID: {}", config.general.node_id);
    println!("  Sample rate: {} Hz", config.audio.sample_rate);
    println!("  Target frequency: {} Hz", config.audio.target_freq);
    println!(
        "  Goertzel window: {} samples",
        config.audio.goertzel_window
    );
    println!(
        "  Busy cadence: {}-{} ms on / {}-{} ms off (x{})",
        config.templates.busy.on_min_ms,
        config.templates.busy.on_max_ms,
        config.templates.busy.off_min_ms,
        config.templates.busy.off_max_ms,
        config.templates.busy.min_consecutive
    );
    println!(
        "  Max detection time: {} ms",
        config.detection.max_detect_time_ms
    );
    println!(
        "  Hangup on: busy={} ringback={} congestion={}",
        config.detection.hangup_on.busy,
        config.detection.hangup_on.ringback,
        config.detection.hangup_on.congestion
    );

    Ok(())
}

fn generate_default_config(output_path: Option<PathBuf>) -> Result<()> {
    let config = DetectorConfig::default_config();
    let toml_content = toml::to_string_pretty(&config)
        .map_err(|e| ringwatch::Error::internal(format!("Failed to serialize config: {}", e)))?;

    match output_path {
        Some(path) => {
            std::fs::write(&path, toml_content)?;
            println!("{} {}", "✓ Default configuration written to:".green(), path.display());
        }
        None => {
            println!("{}", toml_content);
        }
    }

    Ok(())
}
