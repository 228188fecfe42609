//! Video compilation handler.

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use clipforge_models::{CompilationRequest, CompilationResult};
use clipforge_storage::R2Client;
use tracing::{error, info};
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// POST /api/compile
///
/// Compiles 1..=10 remote source videos into one continuous video, uploads
/// the result, and returns its public location. Scratch storage is released
/// once the upload completes, success or not.
pub async fn compile_video(
    State(state): State<AppState>,
    Json(request): Json<CompilationRequest>,
) -> ApiResult<Json<CompilationResult>> {
    request.validate()?;

    info!(
        sources = request.video_urls.len(),
        has_music = request.audio_url.is_some(),
        format = %request.format_mode,
        moody = request.apply_moody_effect,
        "Compilation requested"
    );

    let started = Instant::now();
    let compiled = state.compiler.compile(&request).await.map_err(|e| {
        let api_err = ApiError::from(e);
        error!("Compilation failed: {}", api_err);
        metrics::record_compilation_failed(api_err.kind());
        api_err
    })?;

    let key = R2Client::generate_key("compilations", "mp4");
    let upload_started = Instant::now();
    let published = state
        .storage
        .publish_file(&compiled.path, &key, "video/mp4")
        .await
        .map_err(|e| {
            let api_err = ApiError::from(e);
            error!("Upload failed: {}", api_err);
            metrics::record_compilation_failed(api_err.kind());
            api_err
        })?;
    metrics::record_upload_duration(upload_started.elapsed().as_secs_f64());

    metrics::record_compilation(request.video_urls.len(), started.elapsed().as_secs_f64());
    info!(
        key = %published.public_id,
        duration_s = format!("{:.2}", compiled.duration),
        canvas = format!("{}x{}", compiled.canvas.width, compiled.canvas.height),
        elapsed_s = format!("{:.1}", started.elapsed().as_secs_f64()),
        "Compilation published"
    );

    Ok(Json(CompilationResult {
        url: published.url,
        public_id: published.public_id,
    }))
}
