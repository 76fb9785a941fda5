//! Scryfall bulk data download.

use crate::config::DownloadConfig;
use crate::fetch::retry::{with_retries, Transient, RETRY_BASE_DELAY};
use crate::pipeline::byte_progress_bar;
use futures::StreamExt;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Bulk file name prefix; the suffix is the snapshot timestamp.
const DEFAULT_CARDS_PREFIX: &str = "default-cards-";

/// Errors from the bulk data fetcher.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Cannot connect to {url}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} timed out")]
    Timeout {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} from {url}")]
    Status { url: String, status: StatusCode },

    #[error("No '{0}' entry in the bulk data index")]
    MissingBulkType(String),

    #[error("Invalid download URL: {0}")]
    InvalidUrl(String),

    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        let url = url.to_string();
        if source.is_timeout() {
            FetchError::Timeout { url, source }
        } else if source.is_connect() {
            FetchError::Connect { url, source }
        } else {
            FetchError::Request { url, source }
        }
    }

    fn io(path: &Path, source: std::io::Error) -> Self {
        FetchError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl Transient for FetchError {
    fn is_transient(&self) -> bool {
        match self {
            FetchError::Connect { .. } | FetchError::Timeout { .. } | FetchError::Request { .. } => true,
            FetchError::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

/// One entry of the bulk data index.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BulkDataEntry {
    #[serde(rename = "type")]
    pub bulk_type: String,
    pub name: String,
    pub download_uri: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub updated_at: String,
}

impl BulkDataEntry {
    /// File name of the download, taken from the last URL path segment.
    pub fn file_name(&self) -> Result<String, FetchError> {
        let url = Url::parse(&self.download_uri)
            .map_err(|_| FetchError::InvalidUrl(self.download_uri.clone()))?;
        url.path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
            .map(String::from)
            .ok_or_else(|| FetchError::InvalidUrl(self.download_uri.clone()))
    }
}

#[derive(Debug, Deserialize)]
struct BulkIndex {
    data: Vec<BulkDataEntry>,
}

/// Fetch the bulk data index and return the configured entry.
pub async fn fetch_bulk_index(
    client: &Client,
    config: &DownloadConfig,
) -> Result<BulkDataEntry, FetchError> {
    let url = &config.bulk_data_url;
    debug!("Fetching bulk data index from {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::from_reqwest(url, e))?;

    if !response.status().is_success() {
        return Err(FetchError::Status {
            url: url.clone(),
            status: response.status(),
        });
    }

    let index: BulkIndex = response
        .json()
        .await
        .map_err(|e| FetchError::from_reqwest(url, e))?;

    index
        .data
        .into_iter()
        .find(|entry| entry.bulk_type == config.bulk_type)
        .ok_or_else(|| FetchError::MissingBulkType(config.bulk_type.clone()))
}

/// Whether `path` already holds a complete download of `expected_size` bytes.
pub fn is_cached(path: &Path, expected_size: u64) -> bool {
    expected_size > 0
        && std::fs::metadata(path)
            .map(|m| m.is_file() && m.len() == expected_size)
            .unwrap_or(false)
}

/// Path of the in-progress download for `target`.
fn part_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Download the latest bulk file into `data_folder`.
///
/// An existing file with the expected size is reused.
pub async fn download_default_cards(
    client: &Client,
    config: &DownloadConfig,
    data_folder: &Path,
    show_progress: bool,
) -> Result<PathBuf, FetchError> {
    let entry = with_retries("Fetching bulk data index", config.retries, RETRY_BASE_DELAY, || {
        fetch_bulk_index(client, config)
    })
    .await?;

    info!(
        "Latest {} ({} bytes, updated {})",
        entry.name, entry.size, entry.updated_at
    );

    let target = data_folder.join(entry.file_name()?);
    if is_cached(&target, entry.size) {
        info!("Using cached bulk file: {}", target.display());
        return Ok(target);
    }

    tokio::fs::create_dir_all(data_folder)
        .await
        .map_err(|e| FetchError::io(data_folder, e))?;

    let written = with_retries("Downloading bulk file", config.retries, RETRY_BASE_DELAY, || {
        download_to(client, &entry.download_uri, &target, entry.size, show_progress)
    })
    .await?;

    if entry.size > 0 && written != entry.size {
        warn!(
            "Downloaded {} bytes but the index listed {} bytes",
            written, entry.size
        );
    }

    info!("Downloaded {} to {}", entry.name, target.display());
    Ok(target)
}

/// Stream `url` to `<target>.part`, renaming it to `target` when complete.
async fn download_to(
    client: &Client,
    url: &str,
    target: &Path,
    expected_size: u64,
    show_progress: bool,
) -> Result<u64, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::from_reqwest(url, e))?;

    if !response.status().is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: response.status(),
        });
    }

    let total = response.content_length().unwrap_or(expected_size);
    let pb = byte_progress_bar(total, show_progress);

    let part = part_path(target);
    let mut file = tokio::fs::File::create(&part)
        .await
        .map_err(|e| FetchError::io(&part, e))?;

    let mut written = 0u64;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| FetchError::from_reqwest(url, e))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| FetchError::io(&part, e))?;
        written += chunk.len() as u64;
        pb.inc(chunk.len() as u64);
    }

    file.flush().await.map_err(|e| FetchError::io(&part, e))?;
    drop(file);
    pb.finish_and_clear();

    tokio::fs::rename(&part, target)
        .await
        .map_err(|e| FetchError::io(target, e))?;

    Ok(written)
}

/// Find the newest `default-cards-*.json` in `data_folder`.
///
/// Files are ordered by the timestamp after the last `-` of the stem.
pub fn find_latest_default_cards(data_folder: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(data_folder).ok()?;

    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?;
            if !name.starts_with(DEFAULT_CARDS_PREFIX) || !name.ends_with(".json") {
                return None;
            }
            let stem = path.file_stem()?.to_str()?;
            let timestamp = stem.rsplit('-').next()?.to_string();
            Some((timestamp, path))
        })
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, path)| path)
}
