//! Geo Indexer Main Entry Point
//!
//! Connects to OpenSearch, makes sure the per-kind indices exist and
//! refreshes the suggestion of every stored document of the configured kinds.

use dotenv::dotenv;
use geo_indexer::{Dependencies, GeoIndexError, Settings};
use std::env;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("geo_indexer=info,geo_indexer_repository=info"));

    let json = env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .init();
    }

    info!(
        service_name = "geo-indexer",
        service_version = env!("CARGO_PKG_VERSION"),
        json = json,
        "Tracing initialized"
    );
}

async fn reindex_kinds(deps: &Dependencies) -> Result<(), GeoIndexError> {
    for kind in &deps.settings.reindex_kinds {
        let summary = deps.pipeline.reindex_all(*kind).await?;
        info!(
            kind = %summary.kind,
            pages = summary.pages,
            documents = summary.documents,
            "Kind dispatched"
        );
        if summary.interrupted {
            break;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), GeoIndexError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing();

    info!("Starting Geo Indexer");

    let settings = Settings::from_env()?;
    let deps = match Dependencies::new(settings).await {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    let run = reindex_kinds(&deps);
    tokio::pin!(run);
    let result = tokio::select! {
        result = &mut run => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Received shutdown signal, waiting for dispatched pages");
            deps.pipeline.shutdown();
            run.await
        }
    };

    let stats = deps.queue.shutdown().await;

    match result {
        Ok(()) if stats.dead_lettered == 0 => {
            info!(pages = stats.completed, "Geo indexer completed successfully");
            Ok(())
        }
        Ok(()) => {
            warn!(
                completed = stats.completed,
                dead_lettered = stats.dead_lettered,
                "Geo indexer completed with failed pages"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Geo indexer failed");
            Err(e)
        }
    }
}
