//! Offline shell cache.
//!
//! Cache-then-network provider for the application shell: a request is served
//! from the cache when present, otherwise fetched and (if it succeeded)
//! stored. When the network is gone, navigation requests fall back to the
//! cached shell root so the viewfinder still loads offline.
//!
//! Entries live on disk under `<root>/<cache name>/`, keyed by a SHA-256
//! prefix of the request path.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Current cache generation. Caches with any other name are removed on
/// activation.
pub const CACHE_NAME: &str = "cinematic-camera-v2";

/// Assets that make up the application shell.
pub const SHELL_ASSETS: &[&str] = &[
    "/",
    "/index.html",
    "/manifest.json",
    "/app.js",
    "/app.css",
    "/icon-512.png",
];

/// Root path served for offline navigations.
pub const SHELL_ROOT: &str = "/";

/// Default timeout for shell fetches (10 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur in the shell cache.
#[derive(Debug, thiserror::Error)]
pub enum ShellCacheError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt cache metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("Only GET requests are cached, got {0}")]
    NotCacheable(String),

    #[error("Failed to precache {path}: HTTP {status}")]
    Install { path: String, status: u16 },
}

/// How the request was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    /// Top-level page load
    Navigate,
    /// Subresource (script, style, image, ...)
    Asset,
}

/// A request intercepted by the cache.
#[derive(Debug, Clone)]
pub struct ShellRequest {
    pub method: String,
    pub path: String,
    pub mode: RequestMode,
}

impl ShellRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            path: path.into(),
            mode: RequestMode::Asset,
        }
    }

    pub fn navigate(path: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            path: path.into(),
            mode: RequestMode::Navigate,
        }
    }
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Network,
}

/// A response as seen by the shell.
#[derive(Debug, Clone)]
pub struct ShellResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub source: ResponseSource,
}

/// Network side of the cache.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<ShellResponse, ShellCacheError>;
}

/// Fetches shell assets from an HTTP origin.
pub struct HttpFetcher {
    client: reqwest::Client,
    origin: String,
}

impl HttpFetcher {
    pub fn new(origin: impl Into<String>) -> Result<Self, ShellCacheError> {
        let client = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self {
            client,
            origin: origin.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, path: &str) -> Result<ShellResponse, ShellCacheError> {
        let url = format!("{}{}", self.origin, path);
        let response = self.client.get(&url).send().await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk?);
        }

        Ok(ShellResponse {
            status,
            content_type,
            body,
            source: ResponseSource::Network,
        })
    }
}

/// Metadata stored next to each cached body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub path: String,
    pub status: u16,
    pub content_type: Option<String>,
    #[serde(default)]
    pub size: u64,
}

/// Versioned on-disk cache in front of a [`Fetcher`].
pub struct ShellCache<F> {
    root: PathBuf,
    name: String,
    fetcher: F,
}

impl<F: Fetcher> ShellCache<F> {
    /// Cache named [`CACHE_NAME`] under `root`.
    pub fn new(root: impl Into<PathBuf>, fetcher: F) -> Self {
        Self::with_name(root, CACHE_NAME, fetcher)
    }

    pub fn with_name(root: impl Into<PathBuf>, name: impl Into<String>, fetcher: F) -> Self {
        Self {
            root: root.into(),
            name: name.into(),
            fetcher,
        }
    }

    /// Default root: `~/.cache/cinematic-camera/shell`.
    pub fn default_root() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("cinematic-camera")
            .join("shell")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory holding this generation's entries.
    pub fn dir(&self) -> PathBuf {
        self.root.join(&self.name)
    }

    /// Fetch and store every asset. Fails on the first asset that cannot
    /// be fetched with status 200, leaving earlier ones cached.
    pub async fn install(&self, assets: &[&str]) -> Result<usize, ShellCacheError> {
        log::info!("Caching shell assets");
        std::fs::create_dir_all(self.dir())?;

        for path in assets {
            let response = self.fetcher.fetch(path).await?;
            if response.status != 200 {
                return Err(ShellCacheError::Install {
                    path: path.to_string(),
                    status: response.status,
                });
            }
            self.put(path, &response)?;
        }
        Ok(assets.len())
    }

    /// Remove caches from other generations. Returns their names.
    pub fn activate(&self) -> Result<Vec<String>, ShellCacheError> {
        let mut removed = Vec::new();
        if !self.root.exists() {
            return Ok(removed);
        }

        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name != self.name && entry.file_type()?.is_dir() {
                log::info!("Clearing old cache {}", name);
                std::fs::remove_dir_all(entry.path())?;
                removed.push(name);
            }
        }
        removed.sort();
        Ok(removed)
    }

    /// Serve a request cache-first.
    pub async fn fetch(&self, request: &ShellRequest) -> Result<ShellResponse, ShellCacheError> {
        if !request.method.eq_ignore_ascii_case("GET") {
            return Err(ShellCacheError::NotCacheable(request.method.clone()));
        }

        if let Some(cached) = self.lookup(&request.path)? {
            return Ok(cached);
        }

        match self.fetcher.fetch(&request.path).await {
            Ok(response) => {
                if response.status == 200 {
                    if let Err(e) = self.put(&request.path, &response) {
                        log::warn!("Failed to cache {}: {}", request.path, e);
                    }
                }
                Ok(response)
            }
            Err(e) => {
                if request.mode == RequestMode::Navigate {
                    if let Some(shell) = self.lookup(SHELL_ROOT)? {
                        log::info!("Offline: serving cached shell for {}", request.path);
                        return Ok(shell);
                    }
                }
                Err(e)
            }
        }
    }

    /// Cached response for `path`, if any.
    pub fn lookup(&self, path: &str) -> Result<Option<ShellResponse>, ShellCacheError> {
        let (meta_path, body_path) = self.entry_paths(path);
        if !meta_path.exists() || !body_path.exists() {
            return Ok(None);
        }

        let entry: CacheEntry = serde_json::from_str(&std::fs::read_to_string(&meta_path)?)?;
        let body = std::fs::read(&body_path)?;
        Ok(Some(ShellResponse {
            status: entry.status,
            content_type: entry.content_type,
            body,
            source: ResponseSource::Cache,
        }))
    }

    /// All entries of this generation, sorted by path.
    pub fn list(&self) -> Result<Vec<CacheEntry>, ShellCacheError> {
        let dir = self.dir();
        let mut entries = Vec::new();
        if !dir.exists() {
            return Ok(entries);
        }

        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                let meta: CacheEntry = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
                entries.push(meta);
            }
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    /// Remove every entry of this generation. Returns how many were removed.
    pub fn clear(&self) -> Result<usize, ShellCacheError> {
        let count = self.list()?.len();
        let dir = self.dir();
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
        }
        Ok(count)
    }

    fn put(&self, path: &str, response: &ShellResponse) -> Result<(), ShellCacheError> {
        std::fs::create_dir_all(self.dir())?;
        let (meta_path, body_path) = self.entry_paths(path);
        std::fs::write(&body_path, &response.body)?;

        let entry = CacheEntry {
            path: path.to_string(),
            status: response.status,
            content_type: response.content_type.clone(),
            size: response.body.len() as u64,
        };
        std::fs::write(&meta_path, serde_json::to_string_pretty(&entry)?)?;
        log::debug!("Cached {} ({} bytes)", path, entry.size);
        Ok(())
    }

    fn entry_paths(&self, path: &str) -> (PathBuf, PathBuf) {
        let key = cache_key(path);
        let dir = self.dir();
        (
            dir.join(format!("{}.json", key)),
            dir.join(format!("{}.body", key)),
        )
    }
}

/// Deterministic file key for a request path.
///
/// First 16 bytes of SHA-256, hex encoded (32 chars).
pub fn cache_key(path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    hex::encode(&hasher.finalize()[..16])
}

/// Whether `root` contains a cache with the given name.
pub fn has_generation(root: &Path, name: &str) -> bool {
    root.join(name).is_dir()
}
