//! Library indexing: bounded parallel scans of the top-level folders and a single cached
//! snapshot that is swapped wholesale on refresh.

use std::{
    collections::HashSet,
    ffi::OsStr,
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::Utc;
use globset::{Glob, GlobSet, GlobSetBuilder};
use tokio::sync::{Mutex, RwLock, Semaphore};
use tokio::task::{self, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::LibraryConfig;
use crate::error::LibraryError;
use crate::metrics::Metrics;
use crate::types::{FileEntry, IndexSnapshot, ROOT_FOLDER};

/// Scan parameters fixed at startup.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    /// Canonical library root.
    pub root: PathBuf,
    pub extensions: HashSet<String>,
    pub excludes: GlobSet,
    pub include_hidden: bool,
    pub follow_symlinks: bool,
    pub workers: usize,
    pub timeout: Option<Duration>,
}

impl ScanSettings {
    pub fn from_config(root: PathBuf, cfg: &LibraryConfig) -> anyhow::Result<Self> {
        Ok(Self {
            root,
            extensions: cfg.extension_set(),
            excludes: build_globset(&cfg.excludes)?,
            include_hidden: cfg.include_hidden,
            follow_symlinks: cfg.follow_symlinks,
            workers: cfg.worker_count(),
            timeout: cfg.scan_timeout(),
        })
    }

    fn is_skipped(&self, path: &Path, name: &OsStr) -> bool {
        if !self.include_hidden && name.to_str().map(|n| n.starts_with('.')).unwrap_or(false) {
            return true;
        }
        matches_excludes(path, &self.excludes)
    }

    fn is_media(&self, path: &Path) -> bool {
        path.extension()
            .and_then(OsStr::to_str)
            .map(|ext| self.extensions.contains(&ext.to_ascii_lowercase()))
            .unwrap_or(false)
    }

    fn stays_inside(&self, path: &Path) -> bool {
        !self.follow_symlinks
            || path.canonicalize().map(|c| c.starts_with(&self.root)).unwrap_or(false)
    }
}

/// Caches the library index and rebuilds it on demand.
///
/// Readers take a cheap clone of the published `Arc`; a refresh builds a complete new
/// snapshot first and only then swaps the slot, so no reader ever sees a partial index.
/// Refreshes are serialized so concurrent callers never trigger duplicate scans.
pub struct LibraryIndexer {
    settings: Arc<ScanSettings>,
    ttl: Duration,
    slot: RwLock<Option<Arc<IndexSnapshot>>>,
    // guards the refresh path; holds the last published generation
    refresh: Mutex<u64>,
    metrics: Metrics,
}

impl LibraryIndexer {
    pub fn new(settings: ScanSettings, ttl: Duration, metrics: Metrics) -> Self {
        Self {
            settings: Arc::new(settings),
            ttl,
            slot: RwLock::new(None),
            refresh: Mutex::new(0),
            metrics,
        }
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// The currently published snapshot, fresh or not.
    pub async fn current(&self) -> Option<Arc<IndexSnapshot>> {
        self.slot.read().await.clone()
    }

    /// Returns the cached snapshot while it is fresh, otherwise scans and publishes a new one.
    ///
    /// `force_refresh` bypasses the TTL. If the scan cannot run at all (root unreadable,
    /// ceiling exceeded) the previous snapshot is returned; the error surfaces only when
    /// there is nothing to fall back to.
    pub async fn list(&self, force_refresh: bool) -> Result<Arc<IndexSnapshot>, LibraryError> {
        let requested = Instant::now();
        if !force_refresh {
            if let Some(snapshot) = self.current().await {
                if snapshot.is_fresh() {
                    self.metrics.inc_cache_hits();
                    debug!(generation = snapshot.generation(), "Serving cached library index");
                    return Ok(snapshot);
                }
            }
        }

        let mut generation = self.refresh.lock().await;

        // Another caller may have completed a scan while we waited for the lock.
        if let Some(snapshot) = self.current().await {
            if snapshot.scan_started() >= requested || (!force_refresh && snapshot.is_fresh()) {
                return Ok(snapshot);
            }
        }

        let scan_started = Instant::now();
        match self.scan().await {
            Ok(entries) => {
                let previous = self.current().await;
                let mut generated_at = Utc::now();
                // generated_at is strictly increasing within one slot
                if let Some(prev) = previous.as_ref() {
                    if generated_at <= prev.generated_at() {
                        generated_at = prev.generated_at() + chrono::Duration::microseconds(1);
                    }
                }
                *generation += 1;
                let snapshot = Arc::new(IndexSnapshot::new(
                    entries,
                    generated_at,
                    self.ttl.as_secs(),
                    *generation,
                    scan_started,
                ));
                self.metrics.inc_scans_completed();
                self.metrics.set_files_indexed(snapshot.len() as u64);
                *self.slot.write().await = Some(snapshot.clone());
                Ok(snapshot)
            }
            Err(e) => {
                self.metrics.inc_scans_failed();
                match self.current().await {
                    Some(previous) => {
                        warn!("Library scan failed, serving previous index: {}", e);
                        Ok(previous)
                    }
                    None => Err(e),
                }
            }
        }
    }

    async fn scan(&self) -> Result<Vec<FileEntry>, LibraryError> {
        let started = Instant::now();
        self.metrics.inc_scans_started();
        info!(root = %self.settings.root.display(), workers = self.settings.workers, "Library scan started");

        let settings = self.settings.clone();
        let (folders, mut entries) = task::spawn_blocking(move || partition_root(&settings))
            .await
            .map_err(|e| LibraryError::RootUnavailable(io::Error::other(e.to_string())))??;

        // Cancels still-running walkers if this future is dropped or times out.
        let cancel = CancellationToken::new();
        let _cancel_on_exit = cancel.clone().drop_guard();

        let sem = Arc::new(Semaphore::new(self.settings.workers.max(1)));
        let mut set: JoinSet<(String, Result<Vec<FileEntry>, LibraryError>)> = JoinSet::new();
        for (folder, dir) in folders {
            let sem = sem.clone();
            let settings = self.settings.clone();
            let cancel = cancel.clone();
            set.spawn(async move {
                let result = match sem.acquire_owned().await {
                    Ok(permit) => {
                        let folder_cl = folder.clone();
                        let walked = task::spawn_blocking(move || {
                            let _permit = permit;
                            walk_subtree(&settings, &dir, &folder_cl, &cancel)
                        })
                        .await;
                        match walked {
                            Ok(res) => res,
                            Err(e) => Err(LibraryError::ScanSubtreeFailure {
                                folder: folder.clone(),
                                source: io::Error::other(e.to_string()),
                            }),
                        }
                    }
                    Err(_) => Err(LibraryError::ScanSubtreeFailure {
                        folder: folder.clone(),
                        source: io::Error::other("scan worker pool closed"),
                    }),
                };
                (folder, result)
            });
        }

        let collect = async {
            let mut results = Vec::new();
            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok(r) => results.push(r),
                    Err(e) => {
                        self.metrics.add_subtree_failures(1);
                        warn!("Scan task aborted: {}", e);
                    }
                }
            }
            results
        };
        let results = match self.settings.timeout {
            Some(limit) => tokio::time::timeout(limit, collect)
                .await
                .map_err(|_| LibraryError::ScanTimedOut(limit.as_secs()))?,
            None => collect.await,
        };

        let (merged, failures) = merge_subtrees(results);
        self.metrics.add_subtree_failures(failures);
        entries.extend(merged);

        info!(
            entries = entries.len(),
            failed_folders = failures,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Library scan finished"
        );
        Ok(entries)
    }
}

/// Splits the root's children into top-level folders and root-level media files.
fn partition_root(
    settings: &ScanSettings,
) -> Result<(Vec<(String, PathBuf)>, Vec<FileEntry>), LibraryError> {
    let rd = fs::read_dir(&settings.root).map_err(LibraryError::RootUnavailable)?;
    let mut folders: Vec<(String, PathBuf)> = Vec::new();
    let mut files: Vec<FileEntry> = Vec::new();
    for entry in rd {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Failed to read root entry: {}", e);
                continue;
            }
        };
        let path = entry.path();
        let name = entry.file_name();
        if settings.is_skipped(&path, &name) {
            continue;
        }
        let is_link = entry.file_type().map(|t| t.is_symlink()).unwrap_or(false);
        let md = if settings.follow_symlinks { fs::metadata(&path) } else { entry.metadata() };
        let md = match md {
            Ok(m) => m,
            // A followed link that cannot be resolved is walked like a folder, so it
            // surfaces as a failed subtree instead of vanishing silently.
            Err(_) if is_link && !settings.is_media(&path) => {
                if let Some(n) = name.to_str() {
                    folders.push((n.to_string(), path));
                }
                continue;
            }
            Err(e) => {
                warn!(path = %path.display(), "Failed to stat root entry: {}", e);
                continue;
            }
        };
        if md.is_dir() {
            match name.to_str() {
                Some(n) if settings.stays_inside(&path) => folders.push((n.to_string(), path)),
                Some(_) => debug!(path = %path.display(), "Skipping folder outside library root"),
                None => debug!(path = %path.display(), "Skipping folder with non UTF-8 name"),
            }
        } else if md.is_file() && settings.is_media(&path) && settings.stays_inside(&path) {
            if let Some(fe) = make_entry(&settings.root, &path, ROOT_FOLDER, md.len()) {
                files.push(fe);
            }
        }
    }
    Ok((folders, files))
}

/// Recursively collects media files below one top-level folder.
///
/// Failing to open `dir` itself fails the whole subtree; unreadable entries further down
/// are logged and skipped.
fn walk_subtree(
    settings: &ScanSettings,
    dir: &Path,
    folder: &str,
    cancel: &CancellationToken,
) -> Result<Vec<FileEntry>, LibraryError> {
    fs::read_dir(dir)
        .map_err(|source| LibraryError::ScanSubtreeFailure { folder: folder.to_string(), source })?;

    let mut out: Vec<FileEntry> = Vec::new();
    let walker = WalkDir::new(dir)
        .follow_links(settings.follow_symlinks)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !settings.is_skipped(e.path(), e.file_name()));
    for item in walker {
        if cancel.is_cancelled() {
            return Err(LibraryError::ScanSubtreeFailure {
                folder: folder.to_string(),
                source: io::Error::new(io::ErrorKind::Interrupted, "scan cancelled"),
            });
        }
        let entry = match item {
            Ok(e) => e,
            Err(err) => {
                warn!(folder, path = ?err.path(), "Skipping unreadable entry: {}", err);
                continue;
            }
        };
        if !entry.file_type().is_file() || !settings.is_media(entry.path()) {
            continue;
        }
        if !settings.stays_inside(entry.path()) {
            debug!(path = %entry.path().display(), "Skipping file outside library root");
            continue;
        }
        let size = match entry.metadata() {
            Ok(m) => m.len(),
            Err(err) => {
                warn!(folder, path = %entry.path().display(), "Failed to stat: {}", err);
                continue;
            }
        };
        if let Some(fe) = make_entry(&settings.root, entry.path(), folder, size) {
            out.push(fe);
        }
    }
    Ok(out)
}

/// Joins per-folder results. Failed folders are logged and contribute nothing.
/// Returns the merged entries and the number of failed folders.
pub(crate) fn merge_subtrees(
    results: Vec<(String, Result<Vec<FileEntry>, LibraryError>)>,
) -> (Vec<FileEntry>, usize) {
    let mut merged: Vec<FileEntry> = Vec::new();
    let mut failures = 0usize;
    for (folder, result) in results {
        match result {
            Ok(mut entries) => merged.append(&mut entries),
            Err(e) => {
                failures += 1;
                warn!(folder = %folder, "Folder omitted from index: {}", e);
            }
        }
    }
    (merged, failures)
}

fn make_entry(root: &Path, path: &Path, folder: &str, size: u64) -> Option<FileEntry> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts: Vec<&str> = Vec::new();
    for c in rel.components() {
        match c.as_os_str().to_str() {
            Some(s) => parts.push(s),
            None => {
                debug!(path = %path.display(), "Skipping file with non UTF-8 path");
                return None;
            }
        }
    }
    let name = (*parts.last()?).to_string();
    Some(FileEntry {
        name,
        relative_path: parts.join("/"),
        top_folder: folder.to_string(),
        size_bytes: size,
    })
}

fn build_globset(patterns: &[String]) -> anyhow::Result<GlobSet> {
    let mut b = GlobSetBuilder::new();
    for p in patterns {
        if p.trim().is_empty() {
            continue;
        }
        // Normalisiere Backslashes zu Slashes, damit Muster plattformunabhängig mit
        // der Pfadnormalisierung in `matches_excludes` (\\ -> /) übereinstimmen.
        let norm = p.trim().replace('\\', "/");
        b.add(Glob::new(&norm)?);
    }
    Ok(b.build()?)
}

fn matches_excludes(path: &Path, set: &GlobSet) -> bool {
    if set.is_empty() {
        return false;
    }
    let s = path.to_string_lossy().replace('\\', "/");
    set.is_match(&s)
}
