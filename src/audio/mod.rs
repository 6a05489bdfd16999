/// Microphone capture and sample conversion
pub mod capture;

pub use capture::{AudioCapture, ChunkSource};
