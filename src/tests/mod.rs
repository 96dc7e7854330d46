//! Integration and unit tests for the MedienWald application.
//!
//! ## Test Modules
//!
//! - **resolver_tests**: path containment and traversal rejection
//! - **scanner_tests**: library indexing, caching and partial failure
//! - **streaming_tests**: chunked streaming, cancellation, response heads
//! - **api_tests**: HTTP endpoints against the real router
//! - **error_tests**: error mapping and response envelopes
//! - **config_tests**: configuration loading and validation
//!
//! Run with `cargo test`, or a single module with e.g. `cargo test scanner_tests`.

pub mod streaming_tests;

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::config::{self, AppConfig};

/// Size of `sample.mp4` in the fixture library.
pub const SAMPLE_LEN: usize = 1000;

/// Deterministic content of `sample.mp4`.
pub fn sample_bytes() -> Vec<u8> {
    (0..SAMPLE_LEN as u32).map(|i| (i % 251) as u8).collect()
}

/// A temp dir holding `library/` plus a `secret.mp4` next to it (outside the root).
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn root(&self) -> PathBuf {
        self.dir.path().join("library")
    }

    pub fn config(&self) -> AppConfig {
        self.config_with("")
    }

    /// Test config for this library with extra `[library]` keys appended.
    ///
    /// Four scan workers unless `library_extra` sets `scan_workers` itself.
    pub fn config_with(&self, library_extra: &str) -> AppConfig {
        let workers = if library_extra.contains("scan_workers") { "" } else { "scan_workers = 4\n" };
        let toml = format!(
            "[library]\nroot = '{}'\ncreate_if_missing = false\n{}{}\n\n[streaming]\nchunk_size = 4096\n",
            self.root().display(),
            workers,
            library_extra
        );
        config::from_toml_str(&toml).unwrap()
    }
}

fn write(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Layout:
///
/// ```text
/// secret.mp4                      (outside the root)
/// library/
///   sample.mp4                    1000 bytes
///   readme.md
///   .cache/hidden.mp4
///   @eaDir/thumb.mp4
///   Movies/b.mp4  Movies/A.MKV  Movies/notes.txt  Movies/.partial.mp4
///   Movies/extras/a.mp4
///   Shows/s01/ep1.webm  Shows/s01/ep2.webm
/// ```
pub fn library() -> Fixture {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("library");
    fs::create_dir_all(&root).unwrap();

    write(&dir.path().join("secret.mp4"), b"top secret");
    write(&root.join("sample.mp4"), &sample_bytes());
    write(&root.join("readme.md"), b"# not media");
    write(&root.join(".cache/hidden.mp4"), b"hidden");
    write(&root.join("@eaDir/thumb.mp4"), b"thumb");
    write(&root.join("Movies/b.mp4"), b"bbbb");
    write(&root.join("Movies/A.MKV"), b"aaaaaaa");
    write(&root.join("Movies/notes.txt"), b"notes");
    write(&root.join("Movies/.partial.mp4"), b"partial");
    write(&root.join("Movies/extras/a.mp4"), b"aa");
    write(&root.join("Shows/s01/ep1.webm"), b"episode one");
    write(&root.join("Shows/s01/ep2.webm"), b"episode two!");

    Fixture { dir }
}
