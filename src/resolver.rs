//! Resolution of client-supplied paths against the library root.

use std::path::{Component, Path, PathBuf};

use crate::error::LibraryError;

/// Upper bound on percent-decoding passes; nested encodings deeper than this are rejected.
const MAX_DECODE_PASSES: usize = 4;

/// Maps untrusted relative paths onto regular files inside the library root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Canonicalizes `root` once. The root must be an existing directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, LibraryError> {
        let root = root.as_ref();
        let canonical = root.canonicalize().map_err(LibraryError::RootUnavailable)?;
        if !canonical.is_dir() {
            return Err(LibraryError::RootUnavailable(std::io::Error::new(
                std::io::ErrorKind::NotADirectory,
                format!("{} is not a directory", canonical.display()),
            )));
        }
        Ok(Self { root: canonical })
    }

    /// The canonical library root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `requested` (percent-encoded or not) to a canonical file path under the root.
    ///
    /// Traversal that leaves the root lexically is rejected before the filesystem is touched,
    /// so the outcome does not depend on whether the target exists. Every other `..` is applied
    /// to the canonical form of the path so far, and the final path is canonicalized and
    /// checked again, so symlinks can never carry the result outside the root.
    pub fn resolve(&self, requested: &str) -> Result<PathBuf, LibraryError> {
        let decoded = decode_fully(requested)?;
        if decoded.contains('\0') {
            return Err(LibraryError::AccessDenied(requested.to_string()));
        }

        let mut joined = self.root.clone();
        let mut depth = 0usize;
        for segment in decoded.split(['/', '\\']) {
            match segment {
                "" | "." => {}
                ".." => {
                    if depth == 0 {
                        return Err(LibraryError::AccessDenied(requested.to_string()));
                    }
                    // `..` applies to the real directory, which differs from the lexical
                    // parent when the prefix ends in a symlink.
                    let real = joined
                        .canonicalize()
                        .map_err(|_| LibraryError::NotFound(requested.to_string()))?;
                    let parent = match real.parent() {
                        Some(p) if real.starts_with(&self.root) && p.starts_with(&self.root) => p,
                        _ => return Err(LibraryError::AccessDenied(requested.to_string())),
                    };
                    depth = parent.strip_prefix(&self.root).map(|p| p.components().count()).unwrap_or(0);
                    joined = parent.to_path_buf();
                }
                s => {
                    // A segment must stay a single plain name (no drive prefix, no root).
                    let mut comps = Path::new(s).components();
                    match (comps.next(), comps.next()) {
                        (Some(Component::Normal(_)), None) => {}
                        _ => return Err(LibraryError::AccessDenied(requested.to_string())),
                    }
                    joined.push(s);
                    depth += 1;
                }
            }
        }

        let canonical = joined
            .canonicalize()
            .map_err(|_| LibraryError::NotFound(requested.to_string()))?;
        if !canonical.starts_with(&self.root) {
            return Err(LibraryError::AccessDenied(requested.to_string()));
        }
        if !canonical.is_file() {
            return Err(LibraryError::NotFound(requested.to_string()));
        }
        Ok(canonical)
    }

    /// Whether an already canonical path lies inside the root.
    pub fn contains(&self, canonical: &Path) -> bool {
        canonical.starts_with(&self.root)
    }
}

/// Percent-decodes until the string is stable, so double-encoded separators and dots
/// are seen in their final form.
fn decode_fully(raw: &str) -> Result<String, LibraryError> {
    let mut current = raw.to_string();
    for _ in 0..MAX_DECODE_PASSES {
        if !current.contains('%') {
            return Ok(current);
        }
        let next = urlencoding::decode(&current)
            .map_err(|_| LibraryError::NotFound(raw.to_string()))?
            .into_owned();
        if next == current {
            return Ok(current);
        }
        current = next;
    }
    match urlencoding::decode(&current) {
        Ok(d) if d == current => Ok(current),
        _ => Err(LibraryError::AccessDenied(raw.to_string())),
    }
}
