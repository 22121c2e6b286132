mod cleaning;
mod config;
mod errors;
mod matching;
mod models;
mod pipeline;
mod routes;
mod search;
mod state;
mod storage;
mod telemetry;
mod unify;

use anyhow::{Context, Result};
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, StoreBackend};
use crate::matching::associations::ProgramSkillTable;
use crate::matching::job::KeywordMatchScorer;
use crate::routes::build_router;
use crate::state::{AppState, SharedIndex};
use crate::storage::{load_index, BlobStore, LocalBlobStore, MemoryBlobStore, S3BlobStore};
use crate::telemetry::TracingTelemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},telemetry={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log,
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Pathways API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize blob store
    let store: Arc<dyn BlobStore> = match config.store_backend {
        StoreBackend::S3 => {
            let bucket = config
                .s3_bucket
                .clone()
                .context("S3_BUCKET is required for the s3 store")?;
            Arc::new(S3BlobStore::new(build_s3_client(&config).await, bucket))
        }
        StoreBackend::Local => Arc::new(LocalBlobStore::new(config.local_store_dir.clone())),
        StoreBackend::Memory => Arc::new(MemoryBlobStore::default()),
    };
    info!("Blob store initialized ({})", store.backend());

    // Initialize match scorer
    let table = match &config.program_skill_table {
        Some(path) => ProgramSkillTable::load(path)?,
        None => ProgramSkillTable::default(),
    };
    info!("Program/skill associations: {} entries", table.entries().len());
    let scorer = Arc::new(KeywordMatchScorer::new(table));

    // Serve whatever index the last run left behind
    let index = SharedIndex::new(load_index(store.as_ref(), &config.search_index_key).await);

    // Build app state
    let state = AppState {
        config: config.clone(),
        store,
        index,
        scorer,
        telemetry: Arc::new(TracingTelemetry),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client for AWS, or for MinIO/localstack when an endpoint is set.
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.aws_region.clone()));

    if let (Some(key_id), Some(secret)) = (&config.aws_access_key_id, &config.aws_secret_access_key) {
        loader = loader.credentials_provider(Credentials::new(key_id, secret, None, None, "pathways-static"));
    }
    if let Some(endpoint) = &config.s3_endpoint {
        loader = loader.endpoint_url(endpoint);
    }

    let shared = loader.load().await;
    let mut s3_config = aws_sdk_s3::config::Builder::from(&shared);
    if config.s3_endpoint.is_some() {
        // MinIO and localstack need path-style addressing
        s3_config = s3_config.force_path_style(true);
    }
    aws_sdk_s3::Client::from_conf(s3_config.build())
}
