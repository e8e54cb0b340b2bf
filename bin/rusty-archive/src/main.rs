//! # Rusty-Archive Binary
//!
//! Assembles the store, the content sources, the archiver loop and the HTTP
//! API from settings and compile-time features.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use ra_api::{router, AppState};
use ra_config::{LogFormat, Settings};
use ra_core::{parse_interval, Archiver, ContentSource, SourceRegistry, ThreadStore};
use ra_source_demo::DemoSource;
use ra_store_memory::MemoryThreadStore;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Feature-gated imports
#[cfg(feature = "db-sqlite")]
use ra_db_sqlite::SqliteThreadStore;

#[cfg(feature = "source-fourchan")]
use ra_source_fourchan::{FourChanConfig, FourChanSource};

#[derive(Debug, Parser)]
#[command(name = "rusty-archive")]
#[command(about = "Watches imageboard threads and archives every post")]
struct Cli {
    /// Settings file; defaults to `config.yaml` when present
    #[arg(long, env = "RA_CONFIG")]
    config: Option<String>,
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log.filter));
    let (pretty, json) = match settings.log.format {
        LogFormat::Pretty => (Some(tracing_subscriber::fmt::layer()), None),
        LogFormat::Json => (None, Some(tracing_subscriber::fmt::layer().json())),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .init();
}

async fn build_store(settings: &Settings) -> Result<Arc<dyn ThreadStore>> {
    match settings.storage.sqlite_path.as_deref().filter(|p| !p.is_empty()) {
        #[cfg(feature = "db-sqlite")]
        Some(path) => {
            let store = SqliteThreadStore::open(path)
                .await
                .with_context(|| format!("failed to open sqlite store at {path}"))?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "db-sqlite"))]
        Some(path) => {
            tracing::warn!(path, "built without db-sqlite; falling back to the in-memory store");
            Ok(Arc::new(MemoryThreadStore::new()))
        }
        None => {
            tracing::info!("no sqlite path configured; threads are kept in memory only");
            Ok(Arc::new(MemoryThreadStore::new()))
        }
    }
}

fn build_sources(settings: &Settings) -> Result<SourceRegistry> {
    #[allow(unused_mut)]
    let mut sources: Vec<Arc<dyn ContentSource>> = vec![Arc::new(DemoSource::new())];

    #[cfg(feature = "source-fourchan")]
    {
        let config = FourChanConfig {
            user_agent: settings.sources.user_agent.clone(),
            ..FourChanConfig::default()
        };
        let fourchan = FourChanSource::new(config).context("failed to build 4chan source")?;
        sources.push(Arc::new(fourchan));
    }
    #[cfg(not(feature = "source-fourchan"))]
    let _ = settings;

    Ok(SourceRegistry::new(sources))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref().filter(|p| !p.is_empty()))
        .context("failed to load configuration")?;
    init_tracing(&settings);

    let store = build_store(&settings).await?;
    let sources = build_sources(&settings)?;
    let default_every = parse_interval(&settings.archiver.default_watch_interval)
        .context("invalid archiver.default_watch_interval")?;
    tracing::info!(sources = ?sources.names(), "content sources registered");

    let archiver = Arc::new(Archiver::new(Arc::clone(&store), sources).with_tick(settings.tick()));
    let shutdown = CancellationToken::new();
    let archiver_task = tokio::spawn({
        let archiver = Arc::clone(&archiver);
        let shutdown = shutdown.clone();
        async move { archiver.run(shutdown).await }
    });

    let addr = settings.bind_addr();
    if !settings.admin_enabled() {
        tracing::warn!(
            "admin_token is empty; fetch, watch and scan routes will reject every request"
        );
    }

    let app = router(AppState {
        store,
        archiver,
        admin_token: Arc::new(settings.admin_token),
        default_every,
    });

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "rusty-archive listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    shutdown.cancel();
    archiver_task.await.context("archiver task panicked")?;
    Ok(())
}
