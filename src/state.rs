use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::metrics::Metrics;
use crate::resolver::PathResolver;
use crate::scanner::{LibraryIndexer, ScanSettings};

/// The shared application state.
///
/// Everything in here is fixed at startup except the index cache slot inside
/// [`LibraryIndexer`]. Cloned into every handler by axum.
#[derive(Clone)]
pub struct AppState {
    /// The application configuration.
    pub config: Arc<AppConfig>,
    /// Maps request paths onto files under the canonical library root.
    pub resolver: Arc<PathResolver>,
    /// Owner of the cached library snapshot.
    pub indexer: Arc<LibraryIndexer>,
    /// The application metrics.
    pub metrics: Metrics,
    /// Cancelled on graceful shutdown; every media stream holds a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Creates a new `AppState`.
    ///
    /// Creates the library root when `library.create_if_missing` is set, canonicalizes it
    /// and derives the immutable scan settings from the configuration.
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let root = PathBuf::from(&config.library.root);
        if config.library.create_if_missing && !root.exists() {
            std::fs::create_dir_all(&root)
                .with_context(|| format!("failed to create library root {}", root.display()))?;
            tracing::info!("Created library root at {}", root.display());
        }
        let resolver = PathResolver::new(&root)
            .with_context(|| format!("invalid library root {}", root.display()))?;

        let metrics = Metrics::new();
        let settings = ScanSettings::from_config(resolver.root().to_path_buf(), &config.library)?;
        let indexer = LibraryIndexer::new(settings, config.library.cache_ttl(), metrics.clone());

        Ok(Self {
            config: Arc::new(config),
            resolver: Arc::new(resolver),
            indexer: Arc::new(indexer),
            metrics,
            shutdown: CancellationToken::new(),
        })
    }
}
