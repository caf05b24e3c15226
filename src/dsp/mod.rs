//! Signal analysis primitives

pub mod energy;
pub mod goertzel;

pub use energy::rms;
pub use goertzel::GoertzelFilter;
