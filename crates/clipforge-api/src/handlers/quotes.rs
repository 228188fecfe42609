//! Quote image handler.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use clipforge_models::{CompilationResult, QuoteRequest};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// POST /api/generate
///
/// Renders the markup onto the quote canvas and uploads the PNG.
pub async fn generate_quote(
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> ApiResult<Json<CompilationResult>> {
    request.validate()?;

    // Rasterization is CPU-bound; keep it off the async workers
    let renderer = Arc::clone(&state.quotes);
    let text = request.text.clone();
    let png = tokio::task::spawn_blocking(move || renderer.render_png(&text))
        .await
        .map_err(|e| ApiError::internal(format!("render task panicked: {}", e)))??;

    let short_id = &Uuid::new_v4().simple().to_string()[..8];
    let key = format!("quote_images/quote_{}.png", short_id);
    let published = state.storage.publish_bytes(png, &key, "image/png").await?;

    metrics::record_quote_rendered();
    info!(key = %published.public_id, "Quote image published");

    Ok(Json(CompilationResult {
        url: published.url,
        public_id: published.public_id,
    }))
}
