//! Crossfade splicing of normalized clips.
//!
//! Adjacent clips are joined with an `xfade`/`acrossfade` filter graph. Each
//! boundary gets its own fade window, clamped so no clip contributes more
//! than half of its duration to any transition.

use std::path::{Path, PathBuf};

use clipforge_models::EncodingConfig;
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::normalize::NormalizedClip;

/// The spliced timeline.
#[derive(Debug, Clone)]
pub struct SplicedVideo {
    pub path: PathBuf,
    /// Expected output duration in seconds
    pub duration: f64,
}

/// Per-boundary fade windows for a clip sequence.
///
/// Boundary `k` joins clip `k` to clip `k + 1`; its window is the requested
/// transition clamped to half of each neighbor's duration.
pub fn boundary_windows(durations: &[f64], transition: f64) -> Vec<f64> {
    durations
        .windows(2)
        .map(|pair| transition.min(pair[0] / 2.0).min(pair[1] / 2.0))
        .collect()
}

/// Total timeline duration after crossfading: the clip sum minus the overlap
/// consumed at each boundary.
pub fn expected_duration(durations: &[f64], transition: f64) -> f64 {
    let total: f64 = durations.iter().sum();
    let overlap: f64 = boundary_windows(durations, transition).iter().sum();
    total - overlap
}

/// Build the combined video + audio crossfade graph.
///
/// Returns the filter string and the final video/audio output labels.
fn build_xfade_graph(durations: &[f64], windows: &[f64]) -> (String, String, String) {
    let n = durations.len();
    debug_assert!(n >= 2);
    debug_assert_eq!(windows.len(), n - 1);

    let mut filters = Vec::new();
    let mut video_label = "0:v".to_string();
    let mut audio_label = "0:a".to_string();

    // Output length so far; each fade starts `window` before the current end
    let mut timeline = durations[0];

    for k in 0..n - 1 {
        let window = windows[k];
        let offset = timeline - window;

        let out_v = if k == n - 2 {
            "vout".to_string()
        } else {
            format!("v{}", k)
        };
        let out_a = if k == n - 2 {
            "aout".to_string()
        } else {
            format!("a{}", k)
        };

        filters.push(format!(
            "[{}][{}:v]xfade=transition=fade:duration={:.3}:offset={:.3}[{}]",
            video_label,
            k + 1,
            window,
            offset,
            out_v
        ));
        filters.push(format!(
            "[{}][{}:a]acrossfade=d={:.3}:c1=tri:c2=tri[{}]",
            audio_label,
            k + 1,
            window,
            out_a
        ));

        video_label = out_v;
        audio_label = out_a;
        timeline += durations[k + 1] - window;
    }

    (
        filters.join(";"),
        format!("[{}]", video_label),
        format!("[{}]", audio_label),
    )
}

/// Splice normalized clips into one continuous timeline.
///
/// A single clip passes through untouched; two or more are joined with
/// crossfades.
pub async fn splice_clips(
    runner: &FfmpegRunner,
    clips: &[NormalizedClip],
    output: &Path,
    transition: f64,
    encoding: &EncodingConfig,
) -> MediaResult<SplicedVideo> {
    if clips.is_empty() {
        return Err(MediaError::splicing("no clips to splice"));
    }
    if let Some(bad) = clips.iter().find(|c| c.duration <= 0.0) {
        return Err(MediaError::splicing(format!(
            "clip {} has non-positive duration {:.3}",
            bad.path.display(),
            bad.duration
        )));
    }

    if clips.len() == 1 {
        debug!("Single clip, passing through without splicing");
        tokio::fs::copy(&clips[0].path, output).await?;
        return Ok(SplicedVideo {
            path: output.to_path_buf(),
            duration: clips[0].duration,
        });
    }

    let durations: Vec<f64> = clips.iter().map(|c| c.duration).collect();
    let windows = boundary_windows(&durations, transition);
    let duration = expected_duration(&durations, transition);
    let (graph, video_label, audio_label) = build_xfade_graph(&durations, &windows);

    debug!("Splice graph: {}", graph);

    let mut cmd = FfmpegCommand::new(output);
    for clip in clips {
        cmd = cmd.input(&clip.path);
    }
    cmd = cmd
        .filter_complex(graph)
        .map(video_label)
        .map(audio_label)
        .video_codec(&encoding.codec)
        .preset(&encoding.preset)
        .crf(encoding.crf)
        .audio_codec(&encoding.audio_codec)
        .audio_bitrate(&encoding.audio_bitrate);

    runner.run(&cmd).await.map_err(|e| match e {
        MediaError::FfmpegFailed { stderr, .. } => MediaError::splicing(format!(
            "crossfade render failed: {}",
            stderr.unwrap_or_default()
        )),
        other => other,
    })?;

    info!(
        "Spliced {} clips into {} ({:.2}s)",
        clips.len(),
        output.display(),
        duration
    );

    Ok(SplicedVideo {
        path: output.to_path_buf(),
        duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_clamped_to_half_durations() {
        // A 0.6s clip can only give 0.3s to each side
        let windows = boundary_windows(&[5.0, 0.6, 5.0], 0.5);
        assert_eq!(windows, vec![0.3, 0.3]);

        let windows = boundary_windows(&[5.0, 4.0], 0.5);
        assert_eq!(windows, vec![0.5]);
    }

    #[test]
    fn test_expected_duration() {
        // 5.0 + 4.0 with one 0.5s overlap
        let d = expected_duration(&[5.0, 4.0], 0.5);
        assert!((d - 8.5).abs() < 1e-9);

        // Clamped boundaries shrink the overlap, not the clips
        let d = expected_duration(&[5.0, 0.6, 5.0], 0.5);
        assert!((d - (10.6 - 0.6)).abs() < 1e-9);
    }

    #[test]
    fn test_graph_offsets_accumulate() {
        let durations = [5.0, 4.0, 3.0];
        let windows = boundary_windows(&durations, 0.5);
        let (graph, video_label, audio_label) = build_xfade_graph(&durations, &windows);

        // First fade starts at 5.0 - 0.5 = 4.5; second at 8.5 - 0.5 = 8.0
        assert!(graph.contains("xfade=transition=fade:duration=0.500:offset=4.500"));
        assert!(graph.contains("xfade=transition=fade:duration=0.500:offset=8.000"));
        assert!(graph.contains("acrossfade=d=0.500:c1=tri:c2=tri"));
        assert_eq!(video_label, "[vout]");
        assert_eq!(audio_label, "[aout]");
    }

    #[test]
    fn test_graph_pairs_inputs_in_order() {
        let durations = [5.0, 4.0, 3.0];
        let windows = boundary_windows(&durations, 0.5);
        let (graph, _, _) = build_xfade_graph(&durations, &windows);

        assert!(graph.starts_with("[0:v][1:v]"));
        assert!(graph.contains("[v0][2:v]"));
        assert!(graph.contains("[a0][2:a]"));
    }
}
