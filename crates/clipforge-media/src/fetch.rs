//! Media fetching from remote locators.
//!
//! Downloads each source referenced by URL into session scratch storage,
//! enforcing size and time budgets, and classifies the payload by container
//! signature rather than trusting the file extension.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};

/// Payloads smaller than this are treated as incomplete downloads.
const MIN_ASSET_SIZE: u64 = 1024;

/// How many header bytes are read back for container sniffing.
const SNIFF_LEN: usize = 4096;

/// Recognized video containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoContainer {
    Mp4,
    Avi,
    Mov,
    Mkv,
}

/// Recognized audio containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioContainer {
    Mp3,
    Wav,
    M4a,
}

/// Detected media kind of a fetched payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video(VideoContainer),
    Audio(AudioContainer),
}

impl MediaKind {
    /// Canonical file extension for scratch files.
    pub fn extension(&self) -> &'static str {
        match self {
            MediaKind::Video(VideoContainer::Mp4) => "mp4",
            MediaKind::Video(VideoContainer::Avi) => "avi",
            MediaKind::Video(VideoContainer::Mov) => "mov",
            MediaKind::Video(VideoContainer::Mkv) => "mkv",
            MediaKind::Audio(AudioContainer::Mp3) => "mp3",
            MediaKind::Audio(AudioContainer::Wav) => "wav",
            MediaKind::Audio(AudioContainer::M4a) => "m4a",
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, MediaKind::Video(_))
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, MediaKind::Audio(_))
    }
}

/// Classify a payload by inspecting its leading bytes.
///
/// Returns `None` when no accepted container signature is found.
pub fn classify_media(header: &[u8]) -> Option<MediaKind> {
    if header.len() < 12 {
        return None;
    }

    // RIFF containers: AVI video and WAVE audio
    if &header[0..4] == b"RIFF" {
        return match &header[8..12] {
            b"AVI " => Some(MediaKind::Video(VideoContainer::Avi)),
            b"WAVE" => Some(MediaKind::Audio(AudioContainer::Wav)),
            _ => None,
        };
    }

    // Matroska EBML magic
    if header[0..4] == [0x1A, 0x45, 0xDF, 0xA3] {
        return Some(MediaKind::Video(VideoContainer::Mkv));
    }

    // ISO base media: ftyp box with a brand
    if &header[4..8] == b"ftyp" {
        let brand = &header[8..12];
        if brand.starts_with(b"M4A") {
            return Some(MediaKind::Audio(AudioContainer::M4a));
        }
        if brand == b"qt  " {
            return Some(MediaKind::Video(VideoContainer::Mov));
        }
        return Some(MediaKind::Video(VideoContainer::Mp4));
    }

    // MP3: ID3 tag or bare frame sync
    if &header[0..3] == b"ID3" {
        return Some(MediaKind::Audio(AudioContainer::Mp3));
    }
    if header[0] == 0xFF && header[1] & 0xE0 == 0xE0 {
        return Some(MediaKind::Audio(AudioContainer::Mp3));
    }

    // Some MP4s bury the ftyp/moov boxes deeper; scan the first KB
    let scan = &header[..header.len().min(1024)];
    if contains(scan, b"ftyp") || contains(scan, b"moov") || contains(scan, b"mdat") {
        return Some(MediaKind::Video(VideoContainer::Mp4));
    }

    None
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// A locator resolved to a local scratch file.
#[derive(Debug, Clone)]
pub struct FetchedAsset {
    /// The locator this was fetched from
    pub url: String,
    /// Scratch file path
    pub path: PathBuf,
    /// Detected media kind
    pub kind: MediaKind,
    /// Payload size in bytes
    pub size: u64,
}

/// Fetcher configuration.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Maximum payload size per locator
    pub max_bytes: u64,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Bounded retries on transport-level failures
    pub max_retries: u32,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_bytes: 200 * 1024 * 1024,
            request_timeout: Duration::from_secs(60),
            max_retries: 2,
        }
    }
}

/// Outcome of one download attempt; transport failures may be retried.
struct AttemptError {
    error: MediaError,
    transient: bool,
}

/// Downloads remote media into scratch storage.
#[derive(Clone)]
pub struct MediaFetcher {
    client: reqwest::Client,
    config: FetcherConfig,
}

impl MediaFetcher {
    /// Create a fetcher.
    pub fn new(config: FetcherConfig) -> MediaResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| MediaError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Fetch a single locator into `dest_dir`.
    ///
    /// `index` keeps scratch filenames stable and ordered.
    pub async fn fetch(
        &self,
        url: &str,
        dest_dir: &Path,
        index: usize,
    ) -> MediaResult<FetchedAsset> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(url, dest_dir, index).await {
                Ok(asset) => return Ok(asset),
                Err(e) if e.transient && attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(
                        "Transient fetch failure for {} (attempt {}/{}): {}",
                        url, attempt, self.config.max_retries, e.error
                    );
                    tokio::time::sleep(Duration::from_millis(500)).await;
                }
                Err(e) => return Err(e.error),
            }
        }
    }

    async fn fetch_once(
        &self,
        url: &str,
        dest_dir: &Path,
        index: usize,
    ) -> Result<FetchedAsset, AttemptError> {
        debug!("Downloading {}", url);

        let response = self.client.get(url).send().await.map_err(|e| AttemptError {
            error: MediaError::fetch(url, format!("request failed: {}", e)),
            transient: true,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError {
                error: MediaError::fetch(url, format!("HTTP status {}", status)),
                // 5xx from a CDN is worth one more try; client errors are not
                transient: status.is_server_error(),
            });
        }

        if let Some(ct) = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !is_allowed_content_type(ct) {
                return Err(AttemptError {
                    error: MediaError::fetch(url, format!("disallowed content type '{}'", ct)),
                    transient: false,
                });
            }
        }

        if let Some(len) = response.content_length() {
            if len > self.config.max_bytes {
                return Err(AttemptError {
                    error: MediaError::fetch(
                        url,
                        format!(
                            "payload of {} bytes exceeds the {} byte limit",
                            len, self.config.max_bytes
                        ),
                    ),
                    transient: false,
                });
            }
        }

        // Stream to a scratch file, enforcing the byte cap as we go
        let tmp_path = dest_dir.join(format!("source_{:02}.download", index));
        let mut file = tokio::fs::File::create(&tmp_path)
            .await
            .map_err(|e| AttemptError {
                error: MediaError::Io(e),
                transient: false,
            })?;

        let mut downloaded: u64 = 0;
        let mut response = response;
        loop {
            let chunk = match response.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    return Err(AttemptError {
                        error: MediaError::fetch(url, format!("body read failed: {}", e)),
                        transient: true,
                    });
                }
            };

            downloaded += chunk.len() as u64;
            if downloaded > self.config.max_bytes {
                return Err(AttemptError {
                    error: MediaError::fetch(
                        url,
                        format!("payload exceeds the {} byte limit", self.config.max_bytes),
                    ),
                    transient: false,
                });
            }

            file.write_all(&chunk).await.map_err(|e| AttemptError {
                error: MediaError::Io(e),
                transient: false,
            })?;
        }

        file.flush().await.map_err(|e| AttemptError {
            error: MediaError::Io(e),
            transient: false,
        })?;
        drop(file);

        if downloaded < MIN_ASSET_SIZE {
            return Err(AttemptError {
                error: MediaError::fetch(
                    url,
                    format!("payload of {} bytes is too small to be valid media", downloaded),
                ),
                transient: false,
            });
        }

        // Classify by container signature
        let header = read_header(&tmp_path).await.map_err(|e| AttemptError {
            error: e,
            transient: false,
        })?;
        let kind = classify_media(&header).ok_or_else(|| AttemptError {
            error: MediaError::fetch(url, "payload is not a recognized media container"),
            transient: false,
        })?;

        let path = tmp_path.with_extension(kind.extension());
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| AttemptError {
                error: MediaError::Io(e),
                transient: false,
            })?;

        info!(
            "Fetched {} ({:.2} MB, {:?}) to {}",
            url,
            downloaded as f64 / (1024.0 * 1024.0),
            kind,
            path.display()
        );

        Ok(FetchedAsset {
            url: url.to_string(),
            path,
            kind,
            size: downloaded,
        })
    }

    /// Fetch all locators concurrently, bounded by the locator count.
    ///
    /// Results are returned in request order. The first failure aborts every
    /// in-flight sibling and fails the whole batch.
    pub async fn fetch_all(
        &self,
        urls: &[String],
        dest_dir: &Path,
    ) -> MediaResult<Vec<FetchedAsset>> {
        let semaphore = Arc::new(Semaphore::new(urls.len().max(1)));
        let mut tasks = JoinSet::new();

        for (index, url) in urls.iter().enumerate() {
            let fetcher = self.clone();
            let url = url.clone();
            let dest = dest_dir.to_path_buf();
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|_| MediaError::internal("fetch semaphore closed"))?;
                let asset = fetcher.fetch(&url, &dest, index).await?;
                Ok::<_, MediaError>((index, asset))
            });
        }

        let mut results: Vec<Option<FetchedAsset>> = vec![None; urls.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok((index, asset))) => results[index] = Some(asset),
                Ok(Err(e)) => {
                    tasks.abort_all();
                    return Err(e);
                }
                Err(e) => {
                    tasks.abort_all();
                    return Err(MediaError::internal(format!("fetch task panicked: {}", e)));
                }
            }
        }

        Ok(results
            .into_iter()
            .map(|r| r.expect("all fetch slots filled"))
            .collect())
    }
}

fn is_allowed_content_type(ct: &str) -> bool {
    let ct = ct.split(';').next().unwrap_or(ct).trim();
    ct.starts_with("video/")
        || ct.starts_with("audio/")
        || ct == "application/octet-stream"
        || ct == "binary/octet-stream"
}

async fn read_header(path: &Path) -> MediaResult<Vec<u8>> {
    use tokio::io::AsyncReadExt;

    let mut file = tokio::fs::File::open(path).await?;
    let mut buf = vec![0u8; SNIFF_LEN];
    let mut read = 0;
    while read < buf.len() {
        let n = file.read(&mut buf[read..]).await?;
        if n == 0 {
            break;
        }
        read += n;
    }
    buf.truncate(read);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fake_mp4(len: usize) -> Vec<u8> {
        let mut body = vec![0u8; len.max(1024)];
        body[0..4].copy_from_slice(&[0, 0, 0, 0x20]);
        body[4..8].copy_from_slice(b"ftyp");
        body[8..12].copy_from_slice(b"isom");
        body
    }

    fn fake_mp3(len: usize) -> Vec<u8> {
        let mut body = vec![0u8; len.max(1024)];
        body[0..3].copy_from_slice(b"ID3");
        body
    }

    #[test]
    fn test_classify_containers() {
        assert_eq!(
            classify_media(&fake_mp4(1024)),
            Some(MediaKind::Video(VideoContainer::Mp4))
        );
        assert_eq!(
            classify_media(&fake_mp3(1024)),
            Some(MediaKind::Audio(AudioContainer::Mp3))
        );

        let mut avi = vec![0u8; 64];
        avi[0..4].copy_from_slice(b"RIFF");
        avi[8..12].copy_from_slice(b"AVI ");
        assert_eq!(
            classify_media(&avi),
            Some(MediaKind::Video(VideoContainer::Avi))
        );

        let mut wav = vec![0u8; 64];
        wav[0..4].copy_from_slice(b"RIFF");
        wav[8..12].copy_from_slice(b"WAVE");
        assert_eq!(
            classify_media(&wav),
            Some(MediaKind::Audio(AudioContainer::Wav))
        );

        let mut mkv = vec![0u8; 64];
        mkv[0..4].copy_from_slice(&[0x1A, 0x45, 0xDF, 0xA3]);
        assert_eq!(
            classify_media(&mkv),
            Some(MediaKind::Video(VideoContainer::Mkv))
        );

        let mut m4a = vec![0u8; 64];
        m4a[4..8].copy_from_slice(b"ftyp");
        m4a[8..12].copy_from_slice(b"M4A ");
        assert_eq!(
            classify_media(&m4a),
            Some(MediaKind::Audio(AudioContainer::M4a))
        );

        assert_eq!(classify_media(&[0u8; 64]), None);
        assert_eq!(classify_media(b"short"), None);
    }

    #[test]
    fn test_classify_buried_moov() {
        let mut body = vec![0u8; 1024];
        body[500..504].copy_from_slice(b"moov");
        assert_eq!(
            classify_media(&body),
            Some(MediaKind::Video(VideoContainer::Mp4))
        );
    }

    #[test]
    fn test_allowed_content_types() {
        assert!(is_allowed_content_type("video/mp4"));
        assert!(is_allowed_content_type("audio/mpeg; charset=binary"));
        assert!(is_allowed_content_type("application/octet-stream"));
        assert!(!is_allowed_content_type("text/html"));
        assert!(!is_allowed_content_type("application/json"));
    }

    #[tokio::test]
    async fn test_fetch_video() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.mp4"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(fake_mp4(2048))
                    .insert_header("content-type", "video/mp4"),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let fetcher = MediaFetcher::new(FetcherConfig::default()).unwrap();
        let asset = fetcher
            .fetch(&format!("{}/a.mp4", server.uri()), dir.path(), 0)
            .await
            .unwrap();

        assert!(asset.kind.is_video());
        assert_eq!(asset.size, 2048);
        assert!(asset.path.exists());
        assert_eq!(asset.path.extension().unwrap(), "mp4");
    }

    #[tokio::test]
    async fn test_fetch_rejects_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone.mp4"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let fetcher = MediaFetcher::new(FetcherConfig::default()).unwrap();
        let err = fetcher
            .fetch(&format!("{}/gone.mp4", server.uri()), dir.path(), 0)
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::Fetch { .. }));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_fetch_rejects_oversized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/big.mp4"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(fake_mp4(8192))
                    .insert_header("content-type", "video/mp4"),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let fetcher = MediaFetcher::new(FetcherConfig {
            max_bytes: 4096,
            ..Default::default()
        })
        .unwrap();

        let err = fetcher
            .fetch(&format!("{}/big.mp4", server.uri()), dir.path(), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Fetch { .. }));
        assert!(err.to_string().contains("limit"));
    }

    #[tokio::test]
    async fn test_fetch_rejects_wrong_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html></html>")
                    .insert_header("content-type", "text/html"),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let fetcher = MediaFetcher::new(FetcherConfig::default()).unwrap();
        let err = fetcher
            .fetch(&format!("{}/page", server.uri()), dir.path(), 0)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("content type"));
    }

    #[tokio::test]
    async fn test_fetch_rejects_unrecognized_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/junk"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![7u8; 4096])
                    .insert_header("content-type", "application/octet-stream"),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let fetcher = MediaFetcher::new(FetcherConfig::default()).unwrap();
        let err = fetcher
            .fetch(&format!("{}/junk", server.uri()), dir.path(), 0)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not a recognized media container"));
    }

    #[tokio::test]
    async fn test_fetch_all_preserves_order() {
        let server = MockServer::start().await;
        for name in ["a", "b", "c"] {
            Mock::given(method("GET"))
                .and(path(format!("/{}.mp4", name)))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_bytes(fake_mp4(2048))
                        .insert_header("content-type", "video/mp4"),
                )
                .mount(&server)
                .await;
        }

        let urls: Vec<String> = ["a", "b", "c"]
            .iter()
            .map(|n| format!("{}/{}.mp4", server.uri(), n))
            .collect();

        let dir = TempDir::new().unwrap();
        let fetcher = MediaFetcher::new(FetcherConfig::default()).unwrap();
        let assets = fetcher.fetch_all(&urls, dir.path()).await.unwrap();

        assert_eq!(assets.len(), 3);
        for (asset, url) in assets.iter().zip(&urls) {
            assert_eq!(&asset.url, url);
        }
    }

    #[tokio::test]
    async fn test_fetch_all_aborts_on_single_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok.mp4"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(fake_mp4(2048))
                    .insert_header("content-type", "video/mp4"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/broken.mp4"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let urls = vec![
            format!("{}/ok.mp4", server.uri()),
            format!("{}/broken.mp4", server.uri()),
        ];

        let dir = TempDir::new().unwrap();
        let fetcher = MediaFetcher::new(FetcherConfig::default()).unwrap();
        let err = fetcher.fetch_all(&urls, dir.path()).await.unwrap_err();

        match err {
            MediaError::Fetch { url, .. } => assert!(url.contains("broken.mp4")),
            other => panic!("expected fetch error, got {:?}", other),
        }
    }
}
