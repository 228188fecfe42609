//! FFmpeg-backed media processing.
//!
//! This crate implements the compilation pipeline (fetch, normalize, splice,
//! grade, mix) and the quote image renderer. FFmpeg and FFprobe are driven as
//! subprocesses; [`command::FfmpegCommand`] builds argument lists and
//! [`command::FfmpegRunner`] executes them with progress parsing and
//! deadline-safe cancellation.

pub mod audio;
pub mod command;
pub mod effect;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod pipeline;
pub mod probe;
pub mod progress;
pub mod quote;
pub mod splice;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use fetch::{FetchedAsset, FetcherConfig, MediaFetcher, MediaKind};
pub use pipeline::{CompiledVideo, Compiler, CompilerConfig};
pub use probe::{probe_audio, probe_video, AudioInfo, VideoInfo};
pub use splice::{boundary_windows, expected_duration};
pub use progress::FfmpegProgress;
pub use quote::{QuoteRenderer, QuoteStyle};
