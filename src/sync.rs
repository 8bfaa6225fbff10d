//! Best-effort refresh of the local remarks workbook from a remote URL.
//!
//! The remote copy is advisory: a failed fetch is logged and the existing
//! local file keeps serving reads.

use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{error, info, warn};

use crate::cache::{FsModifiedTime, ModifiedTime, Purpose, TabularCache};
use crate::excel::{checksum_bytes, compute_checksum, ExcelError, ExcelErrorType};

/// Upper bound on a single remote fetch
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Something that can download the remote workbook
pub trait RemoteSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ExcelError>;
}

/// Plain HTTP GET with the fetch timeout
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpSource;

impl RemoteSource for HttpSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ExcelError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| ExcelError::fetch_error(format!("Failed to create HTTP client: {}", e)))?;

        let response = client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| ExcelError::fetch_error(format!("GET {} failed: {}", url, e)))?;

        let body = response
            .bytes()
            .map_err(|e| ExcelError::fetch_error(format!("Failed to read body from {}: {}", url, e)))?;

        Ok(body.to_vec())
    }
}

/// Source of "now" for age checks
pub trait Clock {
    fn now(&self) -> SystemTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

impl<F> Clock for F
where
    F: Fn() -> SystemTime,
{
    fn now(&self) -> SystemTime {
        self()
    }
}

/// What a sync attempt did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// No remote URL configured
    Disabled,
    /// Local file is within TTL
    UsedCache,
    FetchedFresh { checksum: String, changed: bool },
    /// Fetch failed, the previous local file is still served
    FetchFailedServingStale { reason: String },
    /// Fetch failed and there is no local file to fall back on
    NoData { reason: String },
}

impl SyncOutcome {
    pub fn fetched(&self) -> bool {
        matches!(self, SyncOutcome::FetchedFresh { .. })
    }
}

pub struct RemoteSyncManager {
    url: Option<String>,
    path: PathBuf,
    ttl: Duration,
    source: Box<dyn RemoteSource>,
    clock: Box<dyn Clock>,
    mtime: Box<dyn ModifiedTime>,
}

impl RemoteSyncManager {
    /// An empty or missing `url` disables syncing
    pub fn new(url: Option<String>, path: impl Into<PathBuf>, ttl: Duration) -> Self {
        let url = url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());

        RemoteSyncManager {
            url,
            path: path.into(),
            ttl,
            source: Box::new(HttpSource),
            clock: Box::new(SystemClock),
            mtime: Box::new(FsModifiedTime),
        }
    }

    pub fn with_source(mut self, source: impl RemoteSource + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_modified_time(mut self, mtime: impl ModifiedTime + 'static) -> Self {
        self.mtime = Box::new(mtime);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.url.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file, unreadable mtime, or older than the TTL
    pub fn is_stale(&self) -> bool {
        let Some(modified) = self.mtime.modified(&self.path) else {
            return true;
        };

        // An mtime in the future counts as age zero
        let age = self
            .clock
            .now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);

        age > self.ttl
    }

    /// Fetch only when the local copy is stale
    pub fn sync_if_stale(&self, cache: &mut TabularCache) -> SyncOutcome {
        let Some(url) = self.url.as_deref() else {
            return SyncOutcome::Disabled;
        };

        if !self.is_stale() {
            return SyncOutcome::UsedCache;
        }

        info!(path = %self.path.display(), "remarks workbook stale, fetching");
        self.fetch_and_replace(url, cache)
    }

    /// Fetch regardless of freshness
    pub fn force(&self, cache: &mut TabularCache) -> SyncOutcome {
        match self.url.as_deref() {
            Some(url) => self.fetch_and_replace(url, cache),
            None => SyncOutcome::Disabled,
        }
    }

    /// `force` reduced to success or failure
    pub fn sync_force(&self, cache: &mut TabularCache) -> bool {
        self.force(cache).fetched()
    }

    fn fetch_and_replace(&self, url: &str, cache: &mut TabularCache) -> SyncOutcome {
        match self.try_fetch_and_replace(url) {
            Ok((checksum, changed)) => {
                cache.invalidate(Purpose::Remarks);
                info!(path = %self.path.display(), %checksum, changed, "remarks workbook refreshed");
                SyncOutcome::FetchedFresh { checksum, changed }
            }
            Err(e) => {
                let reason = e.to_string();
                if self.path.exists() {
                    warn!(error = %reason, "remote fetch failed, serving stale remarks");
                    SyncOutcome::FetchFailedServingStale { reason }
                } else {
                    error!(error = %reason, "remote fetch failed and no local remarks file");
                    SyncOutcome::NoData { reason }
                }
            }
        }
    }

    fn try_fetch_and_replace(&self, url: &str) -> Result<(String, bool), ExcelError> {
        let body = self.source.fetch(url)?;
        if body.is_empty() {
            return Err(ExcelError::fetch_error(format!("Empty response from {}", url)));
        }

        let previous = compute_checksum(&self.path).ok();
        let checksum = checksum_bytes(&body);

        write_atomically(&self.path, &body)?;

        let changed = previous.as_deref() != Some(checksum.as_str());
        Ok((checksum, changed))
    }
}

/// Stage `bytes` next to `path` and rename over it, so readers never see a
/// half-written file and a failed write leaves the old one untouched.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), ExcelError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut staged = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| ExcelError::write_error(format!("Failed to create staging file: {}", e)))?;

    staged
        .write_all(bytes)
        .and_then(|_| staged.as_file().sync_all())
        .map_err(|e| ExcelError::write_error(format!("Failed to write staging file: {}", e)))?;

    staged.persist(path).map_err(|e| {
        let kind = if e.error.kind() == std::io::ErrorKind::PermissionDenied {
            ExcelErrorType::FileLocked
        } else {
            ExcelErrorType::WriteError
        };
        ExcelError::new(format!("Failed to replace {}: {}", path.display(), e.error), kind)
    })?;

    Ok(())
}
