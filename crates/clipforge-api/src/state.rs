//! Application state.

use std::sync::Arc;

use clipforge_media::quote::QuoteStyle;
use clipforge_media::{Compiler, CompilerConfig, FetcherConfig, QuoteRenderer};
use clipforge_storage::R2Client;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub storage: Arc<R2Client>,
    pub compiler: Compiler,
    pub quotes: Arc<QuoteRenderer>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        clipforge_media::check_ffmpeg()?;
        clipforge_media::check_ffprobe()?;

        let storage = R2Client::from_env().await?;

        let compiler = Compiler::new(CompilerConfig {
            deadline_secs: config.compile_deadline_secs,
            fetcher: FetcherConfig {
                max_bytes: config.max_source_bytes,
                request_timeout: config.fetch_timeout,
                ..FetcherConfig::default()
            },
            ..CompilerConfig::default()
        })?;

        let regular = std::fs::read(&config.quote_font_regular)?;
        let bold = std::fs::read(&config.quote_font_bold)?;
        let quotes = QuoteRenderer::new(
            &regular,
            &bold,
            QuoteStyle {
                logo_path: config.quote_logo.clone(),
                ..QuoteStyle::default()
            },
        )?;

        Ok(Self {
            config,
            storage: Arc::new(storage),
            compiler,
            quotes: Arc::new(quotes),
        })
    }
}
