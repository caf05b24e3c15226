//! Ringwatch - call progress tone detection
//!
//! Classifies early-media audio (busy tone, ringback tone, network congestion
//! tone or silence) from a live 8 kHz mono PCM stream using signal energy and
//! on/off cadence analysis, without any external recognition service.

pub mod config;
pub mod detector;
pub mod dsp;
pub mod error;
pub mod services;
pub mod utils;

pub use error::{Error, Result};

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
