use std::collections::HashSet;
use std::time::Duration;

use globset::Glob;
use serde::Deserialize;

const DEFAULTS: &str = include_str!("../config/default.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_permissive: bool,
    /// Directory served as static UI at `/` (SPA fallback to `index.html`).
    pub ui_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryConfig {
    pub root: String,
    pub create_if_missing: bool,
    pub extensions: Vec<String>,
    pub excludes: Vec<String>,
    pub include_hidden: bool,
    pub follow_symlinks: bool,
    pub cache_ttl_secs: u64,
    pub scan_workers: Option<usize>,
    pub scan_timeout_secs: Option<u64>,
}

impl LibraryConfig {
    /// Allow-set of lowercase extensions without the leading dot.
    pub fn extension_set(&self) -> HashSet<String> {
        self.extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect()
    }

    /// Worker pool size for directory scans; defaults to available parallelism.
    pub fn worker_count(&self) -> usize {
        self.scan_workers.unwrap_or_else(num_cpus::get).max(1)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn scan_timeout(&self) -> Option<Duration> {
        self.scan_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamingConfig {
    pub chunk_size: usize,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SecurityConfig {
    pub enable_hsts: Option<bool>,
    pub hsts_max_age: Option<u64>,
    pub hsts_include_subdomains: Option<bool>,
    pub csp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub library: LibraryConfig,
    pub streaming: StreamingConfig,
    pub security: Option<SecurityConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        // Fallback: parse the embedded default TOML
        match ::config::Config::builder()
            .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
            .build()
        {
            Ok(cfg) => match cfg.try_deserialize() {
                Ok(app_cfg) => app_cfg,
                Err(e) => {
                    eprintln!("FATAL: Failed to deserialize default config: {}", e);
                    panic!("Failed to deserialize default config: {}", e);
                }
            },
            Err(e) => {
                eprintln!("FATAL: Failed to parse default config: {}", e);
                panic!("Failed to parse default config: {}", e);
            }
        }
    }
}

pub const MIN_CHUNK_SIZE: usize = 4 * 1024;
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

pub fn load() -> anyhow::Result<AppConfig> {
    // Load .env first (optional)
    let _ = dotenvy::dotenv();

    let mut builder = ::config::Config::builder()
        .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
        // Optional local file: medienwald.toml (in CWD)
        .add_source(::config::File::with_name("medienwald").required(false));

    if let Ok(custom_path) = std::env::var("MEDIENWALD_CONFIG") {
        builder = builder.add_source(::config::File::with_name(&custom_path).required(false));
    }
    // Environment variables last to have highest precedence
    builder = builder.add_source(
        ::config::Environment::with_prefix("MEDIENWALD")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("library.extensions")
            .with_list_parse_key("library.excludes")
            .try_parsing(true),
    );

    let cfg = builder.build()?;
    let app_cfg: AppConfig = cfg.try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

/// Embedded defaults overlaid with an inline TOML document. Ignores files and environment.
pub fn from_toml_str(overrides: &str) -> anyhow::Result<AppConfig> {
    let cfg = ::config::Config::builder()
        .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
        .add_source(::config::File::from_str(overrides, ::config::FileFormat::Toml))
        .build()?;
    let app_cfg: AppConfig = cfg.try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

pub fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    // Server
    if cfg.server.port == 0 {
        return Err(anyhow::anyhow!("invalid server.port: {}", cfg.server.port));
    }
    // Warn for privileged ports on Unix-like systems
    #[cfg(unix)]
    if cfg.server.port < 1024 {
        tracing::warn!("Using privileged port {} - may require elevated permissions", cfg.server.port);
    }

    // Library
    if cfg.library.root.trim().is_empty() {
        return Err(anyhow::anyhow!("library.root must not be empty"));
    }
    if cfg.library.extension_set().is_empty() {
        return Err(anyhow::anyhow!("library.extensions must contain at least one extension"));
    }
    for pat in &cfg.library.excludes {
        let norm = pat.trim().replace('\\', "/");
        if norm.is_empty() {
            continue;
        }
        Glob::new(&norm).map_err(|e| anyhow::anyhow!("invalid library.excludes pattern {:?}: {}", pat, e))?;
    }
    if let Some(w) = cfg.library.scan_workers {
        if w == 0 || w > 256 {
            return Err(anyhow::anyhow!("library.scan_workers must be in 1..=256"));
        }
    }
    if cfg.library.scan_timeout_secs == Some(0) {
        return Err(anyhow::anyhow!("library.scan_timeout_secs must be > 0 when set"));
    }

    // Streaming
    let cs = cfg.streaming.chunk_size;
    if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&cs) {
        return Err(anyhow::anyhow!(
            "streaming.chunk_size must be in {}..={} bytes, got {}",
            MIN_CHUNK_SIZE,
            MAX_CHUNK_SIZE,
            cs
        ));
    }

    Ok(())
}
