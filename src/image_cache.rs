//! Local cache of animal photos, filled from Wikimedia Commons on first use.

use image::ImageFormat;
use reqwest::{
    blocking::Client,
    header::{HeaderMap, HeaderValue, ACCEPT, RETRY_AFTER},
    StatusCode,
};
use serde::Deserialize;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
    thread,
    time::{Duration, Instant},
};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const COMMONS_API: &str = "https://commons.wikimedia.org/w/api.php";
pub const THUMB_WIDTH: u32 = 640;
/// Longest a server may make us wait between attempts.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

const API_USER_AGENT: &str =
    "LizardType/0.1 (educational animal typing game for kids; terminal edition)";
const DOWNLOAD_USER_AGENT: &str =
    "LizardType/0.1 (educational animal typing game for kids) AppleWebKit/537.36 (KHTML, like Gecko)";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{0:?} is not cached and the network is off")]
    Offline(String),

    #[error("commons has no image for {0:?}")]
    NotFound(String),

    #[error("rate limited by the image server")]
    RateLimited { retry_after: Option<Duration> },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("image cache io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("gave up on {image_ref:?} after {attempts} attempts")]
    GaveUp { image_ref: String, attempts: u32 },

    #[error("image worker stopped before answering")]
    WorkerGone,
}

/// Where image bytes come from when they are not cached yet. Shared by every
/// in-flight lookup, hence `Sync`.
pub trait RemoteImages: Send + Sync {
    /// Download URL for a Commons file name.
    fn resolve_url(&self, file_name: &str) -> Result<String, FetchError>;

    /// Raw bytes behind `url`. A 429 answer maps to [`FetchError::RateLimited`].
    fn download(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

#[derive(Deserialize)]
struct ApiResponse {
    query: Option<ApiQuery>,
}

#[derive(Deserialize)]
struct ApiQuery {
    #[serde(default)]
    pages: HashMap<String, ApiPage>,
}

#[derive(Deserialize)]
struct ApiPage {
    #[serde(default)]
    imageinfo: Vec<ImageInfo>,
}

#[derive(Deserialize)]
struct ImageInfo {
    thumburl: Option<String>,
    url: Option<String>,
}

/// Commons API lookup plus thumbnail download.
///
/// Two clients because upload.wikimedia.org turns away generic bot agents
/// while the API asks for a descriptive one.
pub struct WikimediaClient {
    api: Client,
    download: Client,
    thumb_width: u32,
}

impl WikimediaClient {
    pub fn new() -> Result<Self, FetchError> {
        let api = Client::builder()
            .user_agent(API_USER_AGENT)
            .timeout(Duration::from_secs(15))
            .build()?;

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("image/webp,image/apng,image/*,*/*;q=0.8"),
        );
        let download = Client::builder()
            .user_agent(DOWNLOAD_USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(20))
            .build()?;

        Ok(Self {
            api,
            download,
            thumb_width: THUMB_WIDTH,
        })
    }
}

impl RemoteImages for WikimediaClient {
    fn resolve_url(&self, file_name: &str) -> Result<String, FetchError> {
        let title = format!("File:{}", strip_file_prefix(file_name));
        let width = self.thumb_width.to_string();
        let response: ApiResponse = self
            .api
            .get(COMMONS_API)
            .query(&[
                ("action", "query"),
                ("titles", title.as_str()),
                ("prop", "imageinfo"),
                ("iiprop", "url"),
                ("iiurlwidth", width.as_str()),
                ("format", "json"),
            ])
            .send()?
            .error_for_status()?
            .json()?;

        response
            .query
            .into_iter()
            .flat_map(|q| q.pages.into_values())
            .flat_map(|page| page.imageinfo)
            .find_map(|info| info.thumburl.or(info.url))
            .ok_or_else(|| FetchError::NotFound(file_name.to_string()))
    }

    fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.download.get(url).send()?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            return Err(FetchError::RateLimited { retry_after });
        }
        Ok(response.error_for_status()?.bytes()?.to_vec())
    }
}

/// `Retry-After` in its delay-seconds form, capped at [`MAX_RETRY_AFTER`].
/// HTTP dates and anything unparsable fall back to the default backoff.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let secs = value.trim().parse::<u64>().ok()?;
    Some(Duration::from_secs(secs).min(MAX_RETRY_AFTER))
}

/// Download retry and pacing knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Minimum gap between two requests to the image server.
    pub min_request_gap: Duration,
    /// Failed downloads wait `1.5 * unit * attempt`; a 429 without
    /// `Retry-After` waits `2 * unit * attempt`.
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_request_gap: Duration::from_millis(500),
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// No waiting at all, for tests.
    pub fn immediate() -> Self {
        Self {
            max_attempts: 3,
            min_request_gap: Duration::ZERO,
            backoff_unit: Duration::ZERO,
        }
    }
}

fn strip_file_prefix(name: &str) -> &str {
    for prefix in ["file:", "image:"] {
        if name
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        {
            return &name[prefix.len()..];
        }
    }
    name
}

/// Cache file name for an image reference: the Commons file name made
/// filesystem-safe, always stored as PNG.
pub fn cache_key(image_ref: &str) -> String {
    let name = strip_file_prefix(image_ref.trim());
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);
    let safe: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{safe}.png")
}

/// Write-through cache keyed by image reference. A file that exists is never
/// downloaded again.
///
/// Safe to share between lookup threads; requests to the server stay at least
/// `min_request_gap` apart across all of them.
pub struct ImageCache {
    dir: PathBuf,
    remote: Option<Box<dyn RemoteImages>>,
    policy: RetryPolicy,
    last_request: Mutex<Option<Instant>>,
}

impl ImageCache {
    pub fn new<P: AsRef<Path>>(dir: P, remote: Box<dyn RemoteImages>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            remote: Some(remote),
            policy: RetryPolicy::default(),
            last_request: Mutex::new(None),
        }
    }

    /// A cache that only serves what is already on disk.
    pub fn offline<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            remote: None,
            policy: RetryPolicy::default(),
            last_request: Mutex::new(None),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_offline(&self) -> bool {
        self.remote.is_none()
    }

    pub fn cache_path(&self, image_ref: &str) -> PathBuf {
        self.dir.join(cache_key(image_ref))
    }

    pub fn resolve(&self, image_ref: &str) -> Result<PathBuf, FetchError> {
        let path = self.cache_path(image_ref);
        if path.exists() {
            debug!(image = image_ref, "image cache hit");
            return Ok(path);
        }

        let remote = self
            .remote
            .as_ref()
            .ok_or_else(|| FetchError::Offline(image_ref.to_string()))?;
        fs::create_dir_all(&self.dir)?;

        self.pace();
        let url = remote.resolve_url(image_ref)?;
        debug!(image = image_ref, url = %url, "resolved image url");

        let max_attempts = self.policy.max_attempts;
        for attempt in 1..=max_attempts {
            self.pace();
            match remote
                .download(&url)
                .and_then(|bytes| store_png(&bytes, &path))
            {
                Ok(()) => {
                    info!(image = image_ref, path = %path.display(), "cached image");
                    return Ok(path);
                }
                Err(FetchError::RateLimited { retry_after }) => {
                    let wait = retry_after.unwrap_or(self.policy.backoff_unit * 2 * attempt);
                    warn!(image = image_ref, attempt, ?wait, "rate limited");
                    thread::sleep(wait);
                }
                Err(err) => {
                    warn!(image = image_ref, attempt, error = %err, "download failed");
                    if attempt < max_attempts {
                        thread::sleep(self.policy.backoff_unit * 3 * attempt / 2);
                    }
                }
            }
        }

        Err(FetchError::GaveUp {
            image_ref: image_ref.to_string(),
            attempts: max_attempts,
        })
    }

    fn pace(&self) {
        // held across the sleep so concurrent lookups queue up behind it
        let mut last_request = self
            .last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(last) = *last_request {
            let elapsed = last.elapsed();
            if elapsed < self.policy.min_request_gap {
                thread::sleep(self.policy.min_request_gap - elapsed);
            }
        }
        *last_request = Some(Instant::now());
    }
}

/// Decodes whatever format came over the wire and stores it as PNG. The file
/// only appears under its final name once fully written.
fn store_png(bytes: &[u8], path: &Path) -> Result<(), FetchError> {
    let img = image::load_from_memory(bytes)?;
    let partial = path.with_extension("png.part");
    img.to_rgba8().save_with_format(&partial, ImageFormat::Png)?;
    fs::rename(&partial, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use image::{DynamicImage, RgbImage};
    use std::collections::VecDeque;
    use std::io::Cursor;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    };
    use tempfile::tempdir;

    fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 2, image::Rgb([0, 200, 0])));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    struct FakeRemote {
        downloads: Mutex<VecDeque<Result<Vec<u8>, FetchError>>>,
        calls: Arc<AtomicUsize>,
        known: bool,
    }

    impl FakeRemote {
        fn new(downloads: Vec<Result<Vec<u8>, FetchError>>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let remote = Self {
                downloads: Mutex::new(downloads.into()),
                calls: calls.clone(),
                known: true,
            };
            (remote, calls)
        }
    }

    impl RemoteImages for FakeRemote {
        fn resolve_url(&self, file_name: &str) -> Result<String, FetchError> {
            if self.known {
                Ok(format!("https://upload.example/{file_name}"))
            } else {
                Err(FetchError::NotFound(file_name.to_string()))
            }
        }

        fn download(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.downloads
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(FetchError::NotFound("no more canned downloads".into())))
        }
    }

    #[test]
    fn test_cache_key() {
        assert_eq!(
            cache_key("Iguana_iguana_Portoviejo_02.jpg"),
            "Iguana_iguana_Portoviejo_02.png"
        );
        assert_eq!(cache_key("File:Green anole.JPG"), "Green_anole.png");
        assert_eq!(
            cache_key("image:Gila_monster_(Heloderma_suspectum).jpg"),
            "Gila_monster__Heloderma_suspectum_.png"
        );
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after("5"), Some(Duration::from_secs(5)));
        assert_eq!(parse_retry_after(" 0 "), Some(Duration::ZERO));
        assert_eq!(parse_retry_after("86400"), Some(MAX_RETRY_AFTER));
        assert_eq!(parse_retry_after("18446744073709551615"), Some(MAX_RETRY_AFTER));

        for junk in ["1e30", "-3", "2.5", "NaN", "inf", "", "Wed, 21 Oct 2015 07:28:00 GMT"] {
            assert_eq!(parse_retry_after(junk), None, "{junk:?}");
        }
    }

    #[test]
    fn test_offline_miss() {
        let dir = tempdir().unwrap();
        let cache = ImageCache::offline(dir.path());
        assert!(cache.is_offline());
        assert_matches!(cache.resolve("Tuatara.jpg"), Err(FetchError::Offline(_)));
    }

    #[test]
    fn test_offline_hit() {
        let dir = tempdir().unwrap();
        let cache = ImageCache::offline(dir.path());
        let path = cache.cache_path("Tuatara.jpg");
        fs::write(&path, png_bytes()).unwrap();

        assert_eq!(cache.resolve("Tuatara.jpg").unwrap(), path);
    }

    #[test]
    fn test_downloads_once_then_serves_from_disk() {
        let dir = tempdir().unwrap();
        let (remote, calls) = FakeRemote::new(vec![Ok(png_bytes())]);
        let cache =
            ImageCache::new(dir.path(), Box::new(remote)).with_policy(RetryPolicy::immediate());

        let path = cache.resolve("Tuatara.jpg").unwrap();
        assert!(path.exists());
        assert_eq!(path.extension().unwrap(), "png");
        assert!(image::open(&path).is_ok());

        let again = cache.resolve("Tuatara.jpg").unwrap();
        assert_eq!(again, path);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_retries_after_rate_limit_and_bad_bytes() {
        let dir = tempdir().unwrap();
        let (remote, calls) = FakeRemote::new(vec![
            Err(FetchError::RateLimited {
                retry_after: Some(Duration::ZERO),
            }),
            Ok(b"not an image".to_vec()),
            Ok(png_bytes()),
        ]);
        let cache =
            ImageCache::new(dir.path(), Box::new(remote)).with_policy(RetryPolicy::immediate());

        assert!(cache.resolve("Tuatara.jpg").is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let dir = tempdir().unwrap();
        let (remote, calls) = FakeRemote::new(vec![
            Ok(b"junk".to_vec()),
            Ok(b"junk".to_vec()),
            Ok(b"junk".to_vec()),
            Ok(png_bytes()),
        ]);
        let cache =
            ImageCache::new(dir.path(), Box::new(remote)).with_policy(RetryPolicy::immediate());

        assert_matches!(
            cache.resolve("Tuatara.jpg"),
            Err(FetchError::GaveUp { attempts: 3, .. })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(!cache.cache_path("Tuatara.jpg").exists());
    }

    #[test]
    fn test_unknown_file_is_not_downloaded() {
        let dir = tempdir().unwrap();
        let (mut remote, calls) = FakeRemote::new(vec![Ok(png_bytes())]);
        remote.known = false;
        let cache =
            ImageCache::new(dir.path(), Box::new(remote)).with_policy(RetryPolicy::immediate());

        assert_matches!(cache.resolve("Nope.jpg"), Err(FetchError::NotFound(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
