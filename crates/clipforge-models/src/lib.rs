//! Shared data models for the clipforge backend.
//!
//! This crate provides Serde-serializable types for:
//! - Compilation requests and results
//! - Output format modes and canvas resolution
//! - Encoding configuration
//! - Quote image requests

pub mod compilation;
pub mod encoding;
pub mod format;

// Re-export common types
pub use compilation::{CompilationRequest, CompilationResult, QuoteRequest, MAX_SOURCE_VIDEOS};
pub use encoding::{
    EncodingConfig, AUDIO_SAMPLE_RATE, DEFAULT_CRF, OUTPUT_FPS, TRANSITION_DURATION,
};
pub use format::{AspectClass, CanvasSpec, FormatMode};
