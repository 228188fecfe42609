//! Clip normalization.
//!
//! Every source clip is re-rendered onto the shared canvas before splicing:
//! center-cropped to the canvas aspect, scaled, constant frame rate, uniform
//! pixel format, and a guaranteed stereo audio track (silence is injected for
//! mute sources) so downstream filter graphs can assume identical streams.

use std::path::{Path, PathBuf};

use clipforge_models::{CanvasSpec, EncodingConfig, AUDIO_SAMPLE_RATE, OUTPUT_FPS};
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::{probe_video, VideoInfo};

/// A clip rendered onto the shared canvas.
#[derive(Debug, Clone)]
pub struct NormalizedClip {
    pub path: PathBuf,
    /// Duration in seconds, re-probed after normalization
    pub duration: f64,
}

/// Compute the centered crop window that matches the canvas aspect.
///
/// Dimensions are rounded down to even values for yuv420p.
fn crop_window(info: &VideoInfo, canvas: CanvasSpec) -> (u32, u32) {
    let input_aspect = info.width as f64 / info.height as f64;
    let target_aspect = canvas.aspect();

    let (cw, ch) = if input_aspect > target_aspect {
        // Wider than the canvas: trim the sides
        let cw = (info.height as f64 * target_aspect).floor() as u32;
        (cw.min(info.width), info.height)
    } else {
        // Taller than the canvas: trim top and bottom
        let ch = (info.width as f64 / target_aspect).floor() as u32;
        (info.width, ch.min(info.height))
    };

    (cw & !1, ch & !1)
}

/// Build the normalization video filter chain for one clip.
fn video_filter(info: &VideoInfo, canvas: CanvasSpec) -> String {
    let (cw, ch) = crop_window(info, canvas);
    format!(
        "crop={}:{}:(iw-{})/2:(ih-{})/2,scale={}:{},fps={},format=yuv420p,setsar=1",
        cw, ch, cw, ch, canvas.width, canvas.height, OUTPUT_FPS
    )
}

fn build_normalize_command(
    input: &Path,
    output: &Path,
    info: &VideoInfo,
    canvas: CanvasSpec,
    encoding: &EncodingConfig,
) -> FfmpegCommand {
    let cmd = FfmpegCommand::new(output)
        .input(input)
        .video_filter(video_filter(info, canvas))
        .video_codec(&encoding.codec)
        .preset(&encoding.preset)
        .crf(encoding.crf)
        .audio_codec(&encoding.audio_codec)
        .audio_bitrate(&encoding.audio_bitrate)
        .output_arg("-ar")
        .output_arg(AUDIO_SAMPLE_RATE.to_string())
        .output_arg("-ac")
        .output_arg("2");

    if info.has_audio {
        cmd.map("0:v:0").map("0:a:0")
    } else {
        // Mute source: splice in a silent stereo bed so every normalized
        // clip carries an audio stream
        cmd.input_with_args(
            format!(
                "anullsrc=channel_layout=stereo:sample_rate={}",
                AUDIO_SAMPLE_RATE
            ),
            ["-f", "lavfi"],
        )
        .map("0:v:0")
        .map("1:a:0")
        .shortest()
    }
}

/// Normalize one clip onto the canvas.
///
/// Output lands next to nothing in particular; callers pass a scratch path.
pub async fn normalize_clip(
    runner: &FfmpegRunner,
    input: &Path,
    output: &Path,
    canvas: CanvasSpec,
    encoding: &EncodingConfig,
) -> MediaResult<NormalizedClip> {
    let info = probe_video(input).await.map_err(|e| {
        MediaError::normalization(input.display().to_string(), format!("probe failed: {}", e))
    })?;

    if info.duration <= 0.0 {
        return Err(MediaError::normalization(
            input.display().to_string(),
            "clip has no measurable duration",
        ));
    }

    debug!(
        "Normalizing {} ({}x{} -> {}x{}, audio: {})",
        input.display(),
        info.width,
        info.height,
        canvas.width,
        canvas.height,
        info.has_audio
    );

    let cmd = build_normalize_command(input, output, &info, canvas, encoding);

    runner
        .run(&cmd)
        .await
        .map_err(|e| match e {
            MediaError::FfmpegFailed { stderr, .. } => MediaError::normalization(
                input.display().to_string(),
                format!("encode failed: {}", stderr.unwrap_or_default()),
            ),
            other => other,
        })?;

    let normalized = probe_video(output).await.map_err(|e| {
        MediaError::normalization(
            input.display().to_string(),
            format!("output probe failed: {}", e),
        )
    })?;

    info!(
        "Normalized {} -> {} ({:.2}s)",
        input.display(),
        output.display(),
        normalized.duration
    );

    Ok(NormalizedClip {
        path: output.to_path_buf(),
        duration: normalized.duration,
    })
}

/// Normalize a batch of clips sequentially, preserving order.
///
/// Encoding is CPU-bound, so clips are processed one at a time rather than
/// oversubscribing the host.
pub async fn normalize_all(
    runner: &FfmpegRunner,
    inputs: &[PathBuf],
    scratch_dir: &Path,
    canvas: CanvasSpec,
    encoding: &EncodingConfig,
) -> MediaResult<Vec<NormalizedClip>> {
    let mut clips = Vec::with_capacity(inputs.len());
    for (index, input) in inputs.iter().enumerate() {
        let output = scratch_dir.join(format!("normalized_{:02}.mp4", index));
        clips.push(normalize_clip(runner, input, &output, canvas, encoding).await?);
    }
    Ok(clips)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(width: u32, height: u32) -> VideoInfo {
        VideoInfo {
            duration: 10.0,
            width,
            height,
            fps: 30.0,
            codec: "h264".to_string(),
            size: 1_000_000,
            has_audio: true,
        }
    }

    #[test]
    fn test_crop_wide_source_to_vertical() {
        // 1920x1080 onto 9:16 keeps full height and trims width
        let (cw, ch) = crop_window(&info(1920, 1080), CanvasSpec::VERTICAL);
        assert_eq!(ch, 1080);
        assert_eq!(cw, 606); // 1080 * 9/16 = 607.5, floored then evened
    }

    #[test]
    fn test_crop_tall_source_to_horizontal() {
        let (cw, ch) = crop_window(&info(1080, 1920), CanvasSpec::HORIZONTAL);
        assert_eq!(cw, 1080);
        assert_eq!(ch, 606);
    }

    #[test]
    fn test_crop_matching_aspect_is_identity() {
        let (cw, ch) = crop_window(&info(1080, 1920), CanvasSpec::VERTICAL);
        assert_eq!((cw, ch), (1080, 1920));
    }

    #[test]
    fn test_mute_source_gets_silent_bed() {
        let mut source = info(1080, 1920);
        source.has_audio = false;
        let cmd = build_normalize_command(
            Path::new("in.mp4"),
            Path::new("out.mp4"),
            &source,
            CanvasSpec::VERTICAL,
            &EncodingConfig::default(),
        );
        let args = cmd.build_args();
        let lavfi = args.iter().position(|a| a == "lavfi").expect("lavfi flag");
        assert_eq!(args[lavfi - 1], "-f");
        assert!(args
            .iter()
            .any(|a| a.starts_with("anullsrc=channel_layout=stereo")));
        assert!(args.iter().any(|a| a == "1:a:0"));
        assert!(args.iter().any(|a| a == "-shortest"));
    }

    #[test]
    fn test_audio_source_maps_its_own_track() {
        let cmd = build_normalize_command(
            Path::new("in.mp4"),
            Path::new("out.mp4"),
            &info(1080, 1920),
            CanvasSpec::VERTICAL,
            &EncodingConfig::default(),
        );
        let args = cmd.build_args();
        assert!(args.iter().any(|a| a == "0:a:0"));
        assert!(!args.iter().any(|a| a == "lavfi"));
        assert!(!args.iter().any(|a| a == "-shortest"));
    }

    #[test]
    fn test_filter_chain_shape() {
        let filter = video_filter(&info(1920, 1080), CanvasSpec::VERTICAL);
        assert!(filter.starts_with("crop=606:1080:"));
        assert!(filter.contains("scale=1080:1920"));
        assert!(filter.contains("fps=30"));
        assert!(filter.ends_with("format=yuv420p,setsar=1"));
    }
}
