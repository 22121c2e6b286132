use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::unify::SourcePriority;

/// Which `BlobStore` backend serves datasets and the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    S3,
    Local,
    Memory,
}

impl StoreBackend {
    fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s3" => Ok(StoreBackend::S3),
            "local" => Ok(StoreBackend::Local),
            "memory" => Ok(StoreBackend::Memory),
            other => bail!("INDEX_STORE must be one of s3, local, memory (got '{other}')"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub store_backend: StoreBackend,
    /// Required for the S3 backend.
    pub s3_bucket: Option<String>,
    /// MinIO / localstack endpoint; unset for AWS.
    pub s3_endpoint: Option<String>,
    pub aws_region: String,
    /// Static credentials. When unset the default provider chain is used.
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub local_store_dir: PathBuf,
    pub search_index_key: String,
    pub processed_prefix: String,
    pub source_priority: SourcePriority,
    pub program_skill_table: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            rust_log: "info".to_string(),
            store_backend: StoreBackend::Memory,
            s3_bucket: None,
            s3_endpoint: None,
            aws_region: "us-east-1".to_string(),
            aws_access_key_id: None,
            aws_secret_access_key: None,
            local_store_dir: PathBuf::from("./data"),
            search_index_key: "search-index/student-resources.json".to_string(),
            processed_prefix: "processed".to_string(),
            source_priority: SourcePriority::default(),
            program_skill_table: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let store_backend = StoreBackend::parse(&optional("INDEX_STORE").unwrap_or_else(|| "s3".to_string()))?;
        let s3_bucket = optional("S3_BUCKET");
        if store_backend == StoreBackend::S3 && s3_bucket.is_none() {
            bail!("Required environment variable 'S3_BUCKET' is not set");
        }

        let source_priority = match optional("SOURCE_PRIORITY") {
            Some(raw) => SourcePriority::parse(&raw)
                .map_err(anyhow::Error::msg)
                .context("SOURCE_PRIORITY must be a comma-separated list of oracle, workday, tableau")?,
            None => defaults.source_priority,
        };

        Ok(Config {
            port: optional("PORT")
                .unwrap_or_else(|| defaults.port.to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional("RUST_LOG").unwrap_or(defaults.rust_log),
            store_backend,
            s3_bucket,
            s3_endpoint: optional("S3_ENDPOINT"),
            aws_region: optional("AWS_REGION").unwrap_or(defaults.aws_region),
            aws_access_key_id: optional("AWS_ACCESS_KEY_ID"),
            aws_secret_access_key: optional("AWS_SECRET_ACCESS_KEY"),
            local_store_dir: optional("LOCAL_STORE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.local_store_dir),
            search_index_key: optional("SEARCH_INDEX_KEY").unwrap_or(defaults.search_index_key),
            processed_prefix: optional("PROCESSED_PREFIX").unwrap_or(defaults.processed_prefix),
            source_priority,
            program_skill_table: optional("PROGRAM_SKILL_TABLE").map(PathBuf::from),
        })
    }
}
