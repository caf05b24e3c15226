//! Tone detection engine

pub mod classifier;
pub mod engine;
pub mod segmenter;

pub use classifier::{PatternClassifier, ToneKind};
pub use engine::{AudioFrame, FeedOutcome, ToneDetector, Verdict};
pub use segmenter::{SegmentPair, ToneSegmenter};
