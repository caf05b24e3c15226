//! Host-facing services

pub mod call_progress;

pub use call_progress::{CallProgressService, ProgressEvent};
