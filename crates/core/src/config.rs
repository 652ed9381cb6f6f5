use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_usize(profile: &str, key: &str, default: usize) -> usize {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub s3: S3Config,
    pub compute: ComputeConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `SCALEOUT_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("SCALEOUT_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            storage: StorageConfig::from_env_profiled(p),
            s3: S3Config::from_env_profiled(p),
            compute: ComputeConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:   {}:{}", self.server.host, self.server.port);
        tracing::info!(
            "  storage:  data_dir={}, temp_dir={}",
            self.storage.data_dir.display(),
            self.storage.temp_dir.display()
        );
        tracing::info!(
            "  s3:       region={}, bucket={}, configured={}",
            self.s3.region,
            self.s3.bucket.as_deref().unwrap_or("(none)"),
            self.s3.is_configured()
        );
        tracing::info!(
            "  compute:  default_scales={:?}, max_workers={}",
            self.compute.default_scales,
            self.compute.max_workers
        );
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_u16(p, "PORT", 8000),
            cors_origin: profiled_env_or(p, "CORS_ORIGIN", "*"),
        }
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root of the local object store (used when S3 is not configured).
    pub data_dir: PathBuf,
    /// Parent directory for per-job scratch directories.
    pub temp_dir: PathBuf,
}

impl StorageConfig {
    fn from_env_profiled(p: &str) -> Self {
        let temp_dir = profiled_env_opt(p, "TEMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| env::temp_dir().join("scaleout"));
        Self {
            data_dir: PathBuf::from(profiled_env_or(p, "DATA_DIR", "data")),
            temp_dir,
        }
    }
}

// ── S3 ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    pub bucket: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub endpoint_url: Option<String>,
    pub region: String,
    pub prefix: Option<String>,
}

impl S3Config {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            bucket: profiled_env_opt(p, "S3_BUCKET_NAME"),
            access_key: profiled_env_opt(p, "S3_ACCESS_KEY"),
            secret_key: profiled_env_opt(p, "S3_SECRET_KEY"),
            endpoint_url: profiled_env_opt(p, "S3_ENDPOINT"),
            region: profiled_env_or(p, "S3_REGION", "us-east-1"),
            prefix: profiled_env_opt(p, "S3_PREFIX"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.access_key.is_some() && self.bucket.is_some()
    }
}

// ── Compute ───────────────────────────────────────────────────

pub const DEFAULT_SCALES: &[usize] = &[1, 2, 4, 8];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeConfig {
    /// Scales used when a job request omits `scale_list`.
    pub default_scales: Vec<usize>,
    /// Upper bound on the worker count of a single session.
    pub max_workers: usize,
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            default_scales: DEFAULT_SCALES.to_vec(),
            max_workers: 64,
        }
    }
}

impl ComputeConfig {
    fn from_env_profiled(p: &str) -> Self {
        let default_scales = profiled_env_opt(p, "DEFAULT_SCALES")
            .and_then(|raw| parse_scale_list(&raw))
            .unwrap_or_else(|| DEFAULT_SCALES.to_vec());
        Self {
            default_scales,
            max_workers: profiled_env_usize(p, "MAX_WORKERS", 64),
        }
    }
}

/// Parse a comma separated scale list ("1,2,4,8"). Returns `None` when any
/// entry is not a positive integer or the list is empty.
pub fn parse_scale_list(raw: &str) -> Option<Vec<usize>> {
    let scales: Option<Vec<usize>> = raw
        .split(',')
        .map(|s| s.trim().parse::<usize>().ok().filter(|&n| n > 0))
        .collect();
    scales.filter(|s| !s.is_empty())
}
