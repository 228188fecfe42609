//! The compilation pipeline.
//!
//! Drives a request end to end: fetch sources, resolve the canvas, normalize,
//! splice, grade, and mix. Every intermediate artifact lives in one scratch
//! directory whose lifetime is tied to the returned output, so cleanup is
//! automatic on success, error, and deadline alike.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clipforge_models::{
    AspectClass, CanvasSpec, CompilationRequest, EncodingConfig, TRANSITION_DURATION,
};
use tempfile::TempDir;
use tracing::{info, warn};

use crate::audio::{adjust_timeline_volume, mix_background_audio};
use crate::command::FfmpegRunner;
use crate::effect::apply_moody_effect;
use crate::error::{MediaError, MediaResult};
use crate::fetch::{FetchedAsset, FetcherConfig, MediaFetcher};
use crate::normalize::normalize_all;
use crate::probe::{probe_video, VideoInfo};
use crate::splice::splice_clips;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Crossfade window between adjacent clips, in seconds
    pub transition: f64,
    /// Wall-clock budget for one compilation, in seconds
    pub deadline_secs: u64,
    /// Encoding parameters shared by every render stage
    pub encoding: EncodingConfig,
    /// Download limits
    pub fetcher: FetcherConfig,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            transition: TRANSITION_DURATION,
            deadline_secs: 300,
            encoding: EncodingConfig::default(),
            fetcher: FetcherConfig::default(),
        }
    }
}

/// A finished compilation, ready for upload.
///
/// Holds the scratch directory so the output file outlives the pipeline
/// until the caller is done with it.
#[derive(Debug)]
pub struct CompiledVideo {
    pub path: PathBuf,
    /// Timeline duration in seconds
    pub duration: f64,
    /// Resolved output canvas
    pub canvas: CanvasSpec,
    _scratch: TempDir,
}

/// Runs compilation requests.
#[derive(Clone)]
pub struct Compiler {
    config: CompilerConfig,
    fetcher: MediaFetcher,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> MediaResult<Self> {
        let fetcher = MediaFetcher::new(config.fetcher.clone())?;
        Ok(Self { config, fetcher })
    }

    /// Compile a request into a finished video.
    ///
    /// The whole run is bounded by the configured deadline; on expiry the
    /// in-flight stage is dropped, which kills its ffmpeg child, and scratch
    /// storage unwinds with it.
    pub async fn compile(&self, request: &CompilationRequest) -> MediaResult<CompiledVideo> {
        let deadline = Duration::from_secs(self.config.deadline_secs);
        match tokio::time::timeout(deadline, self.run_stages(request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Compilation exceeded the {}s deadline, aborting",
                    self.config.deadline_secs
                );
                Err(MediaError::Timeout(self.config.deadline_secs))
            }
        }
    }

    async fn run_stages(&self, request: &CompilationRequest) -> MediaResult<CompiledVideo> {
        let started = Instant::now();
        let scratch = TempDir::new()?;
        let runner = FfmpegRunner::new().with_timeout(self.config.deadline_secs);

        // Fetch every source concurrently, the music bed alongside
        let (assets, music) = tokio::join!(
            self.fetcher.fetch_all(&request.video_urls, scratch.path()),
            async {
                match &request.audio_url {
                    Some(url) => self.fetch_music(url, &scratch).await.map(Some),
                    None => Ok(None),
                }
            }
        );
        let assets = assets?;
        let music = music?;

        for asset in &assets {
            if !asset.kind.is_video() {
                return Err(MediaError::fetch(
                    &asset.url,
                    "locator resolved to audio, expected video",
                ));
            }
        }
        info!(
            "Fetched {} video sources{} in {:.1}s",
            assets.len(),
            if music.is_some() { " + music bed" } else { "" },
            started.elapsed().as_secs_f64()
        );

        // Resolve the canvas from the source geometries
        let mut classes = Vec::with_capacity(assets.len());
        for asset in &assets {
            let info = probe_video(&asset.path).await.map_err(|e| {
                MediaError::fetch(&asset.url, format!("downloaded video is unreadable: {}", e))
            })?;
            classes.push(AspectClass::classify(info.width, info.height));
        }
        let canvas = CanvasSpec::resolve(request.format_mode, &classes);
        info!(
            "Resolved canvas {}x{} from {:?}",
            canvas.width, canvas.height, classes
        );

        // Normalize, then splice into one timeline
        let inputs: Vec<PathBuf> = assets.iter().map(|a| a.path.clone()).collect();
        let clips = normalize_all(
            &runner,
            &inputs,
            scratch.path(),
            canvas,
            &self.config.encoding,
        )
        .await?;

        let spliced = splice_clips(
            &runner,
            &clips,
            &scratch.path().join("spliced.mp4"),
            self.config.transition,
            &self.config.encoding,
        )
        .await?;

        // Optional grade
        let graded = if request.apply_moody_effect {
            apply_moody_effect(
                &runner,
                &spliced.path,
                &scratch.path().join("graded.mp4"),
                request.moody_intensity,
                &self.config.encoding,
            )
            .await?
        } else {
            spliced.path.clone()
        };

        // Audio pass: mix the bed in, or just apply the clip gain
        let finished = match &music {
            Some(bed) => {
                mix_background_audio(
                    &runner,
                    &graded,
                    &bed.path,
                    &scratch.path().join("mixed.mp4"),
                    spliced.duration,
                    request.video_audio_volume,
                    request.background_music_volume,
                    &self.config.encoding,
                )
                .await?
            }
            None => {
                adjust_timeline_volume(
                    &runner,
                    &graded,
                    &scratch.path().join("mixed.mp4"),
                    request.video_audio_volume,
                    &self.config.encoding,
                )
                .await?
            }
        };

        // Acceptance probe on the final mux before it can be published
        let output = probe_video(&finished)
            .await
            .map_err(|e| MediaError::splicing(format!("output probe failed: {}", e)))?;
        check_output(&output)?;

        info!(
            "Compilation finished in {:.1}s ({:.2}s timeline, {} bytes)",
            started.elapsed().as_secs_f64(),
            output.duration,
            output.size
        );

        Ok(CompiledVideo {
            path: finished,
            duration: output.duration,
            canvas,
            _scratch: scratch,
        })
    }

    async fn fetch_music(&self, url: &str, scratch: &TempDir) -> MediaResult<FetchedAsset> {
        let music_dir = scratch.path().join("music");
        tokio::fs::create_dir_all(&music_dir).await?;
        // Video payloads can serve as a bed; the mix stage probes for a
        // decodable audio stream and rejects silent ones
        self.fetcher.fetch(url, &music_dir, 0).await
    }
}

/// Reject a degenerate final mux before it can leave the pipeline.
fn check_output(info: &VideoInfo) -> MediaResult<()> {
    if info.duration <= 0.0 {
        return Err(MediaError::splicing("output has no measurable duration"));
    }
    if info.size == 0 {
        return Err(MediaError::splicing("output file is empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_models::FormatMode;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn output_info(duration: f64, size: u64) -> VideoInfo {
        VideoInfo {
            duration,
            width: 1080,
            height: 1920,
            fps: 30.0,
            codec: "h264".to_string(),
            size,
            has_audio: true,
        }
    }

    #[test]
    fn test_output_check_rejects_zero_duration() {
        let err = check_output(&output_info(0.0, 1_000_000)).unwrap_err();
        assert!(matches!(err, MediaError::Splicing(_)));
    }

    #[test]
    fn test_output_check_rejects_empty_file() {
        let err = check_output(&output_info(8.5, 0)).unwrap_err();
        assert!(matches!(err, MediaError::Splicing(_)));
    }

    #[test]
    fn test_output_check_accepts_real_mux() {
        assert!(check_output(&output_info(8.5, 1_000_000)).is_ok());
    }

    #[tokio::test]
    async fn test_deadline_aborts_compilation() {
        let server = MockServer::start().await;
        let mut body = vec![0u8; 4096];
        body[0..4].copy_from_slice(&[0, 0, 0, 0x20]);
        body[4..8].copy_from_slice(b"ftyp");
        body[8..12].copy_from_slice(b"isom");
        Mock::given(method("GET"))
            .and(path("/slow.mp4"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(body, "video/mp4")
                    .set_delay(Duration::from_secs(30)),
            )
            .mount(&server)
            .await;

        let compiler = Compiler::new(CompilerConfig {
            deadline_secs: 1,
            ..Default::default()
        })
        .unwrap();
        let request = CompilationRequest {
            video_urls: vec![format!("{}/slow.mp4", server.uri())],
            audio_url: None,
            format_mode: FormatMode::Auto,
            apply_moody_effect: false,
            moody_intensity: 0.5,
            video_audio_volume: 1.0,
            background_music_volume: 0.5,
        };

        let err = compiler.compile(&request).await.unwrap_err();
        assert!(matches!(err, MediaError::Timeout(1)));
    }
}
