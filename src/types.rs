use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Folder name given to files that sit directly in the library root.
pub const ROOT_FOLDER: &str = "";

/// A media file discovered under the library root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    /// Root-relative, `/`-separated path. Always resolves inside the root.
    pub relative_path: String,
    /// First path segment under the root, [`ROOT_FOLDER`] for root-level files.
    pub top_folder: String,
    pub size_bytes: u64,
}

/// Immutable result of one library scan.
///
/// Published behind an `Arc` and replaced wholesale on refresh; fields are never mutated
/// after construction.
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    entries: Vec<FileEntry>,
    generated_at: DateTime<Utc>,
    ttl_seconds: u64,
    generation: u64,
    scan_started: Instant,
    scanned_at: Instant,
}

impl IndexSnapshot {
    /// Sorts `entries` by `(top_folder, name)` and seals them into a snapshot.
    pub fn new(
        mut entries: Vec<FileEntry>,
        generated_at: DateTime<Utc>,
        ttl_seconds: u64,
        generation: u64,
        scan_started: Instant,
    ) -> Self {
        entries.sort_by(|a, b| {
            a.top_folder
                .cmp(&b.top_folder)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.relative_path.cmp(&b.relative_path))
        });
        Self { entries, generated_at, ttl_seconds, generation, scan_started, scanned_at: Instant::now() }
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// When the scan that produced this snapshot began.
    pub fn scan_started(&self) -> Instant {
        self.scan_started
    }

    /// Valid while `now - generated_at < ttl`. Measured on the monotonic clock.
    pub fn is_fresh(&self) -> bool {
        self.scanned_at.elapsed() < Duration::from_secs(self.ttl_seconds)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub refresh: bool,
}

/// One item of `GET /api/videos`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoDto {
    pub name: String,
    pub folder: String,
    pub path: String,
    pub size: u64,
}

impl From<&FileEntry> for VideoDto {
    fn from(e: &FileEntry) -> Self {
        Self {
            name: e.name.clone(),
            folder: e.top_folder.clone(),
            path: e.relative_path.clone(),
            size: e.size_bytes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderSummary {
    pub folder: String,
    pub count: u64,
    pub size: u64,
}

/// Body of `GET /api/library`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryStatus {
    pub root_name: String,
    pub generation: u64,
    pub generated_at: String,
    pub ttl_seconds: u64,
    pub count: u64,
    pub folders: Vec<FolderSummary>,
}

impl LibraryStatus {
    pub fn from_snapshot(root_name: String, snapshot: &IndexSnapshot) -> Self {
        // entries are sorted by folder, so equal folders are adjacent
        let mut folders: Vec<FolderSummary> = Vec::new();
        for e in snapshot.entries() {
            match folders.last_mut() {
                Some(last) if last.folder == e.top_folder => {
                    last.count += 1;
                    last.size = last.size.saturating_add(e.size_bytes);
                }
                _ => folders.push(FolderSummary {
                    folder: e.top_folder.clone(),
                    count: 1,
                    size: e.size_bytes,
                }),
            }
        }
        Self {
            root_name,
            generation: snapshot.generation(),
            generated_at: snapshot.generated_at().to_rfc3339(),
            ttl_seconds: snapshot.ttl_seconds(),
            count: snapshot.len() as u64,
            folders,
        }
    }
}
