use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use flixarr::{
    api::{create_router, AppState},
    config::Config,
    db::{create_pool, create_redis_client, Cache, PgStore},
    jobs::{self, Jobs},
    services::{
        dvr::ServarrConnector,
        providers::TmdbProvider,
        recommend::RecommendationPlanner,
        scheduler::{DownloadScheduler, SchedulerOptions, UpdateScheduler},
    },
    settings::Settings,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flixarr=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    let pool = create_pool(&config.database_url)
        .await
        .context("Failed to connect to Postgres")?;
    let store = Arc::new(PgStore::new(pool));

    let (cache, cache_writer) = match &config.redis_url {
        Some(url) => {
            let (cache, writer) = Cache::new(create_redis_client(url)?);
            (Some(cache), Some(writer))
        }
        None => {
            tracing::info!("REDIS_URL not set, catalog caching disabled");
            (None, None)
        }
    };

    let settings = Arc::new(
        Settings::load(&config.settings_path)
            .with_context(|| format!("Failed to load settings from {}", config.settings_path))?,
    );
    let catalog = Arc::new(TmdbProvider::new(
        config.tmdb_api_key.clone(),
        config.tmdb_api_url.clone(),
        cache,
    ));
    let connector = Arc::new(ServarrConnector);

    let planner = RecommendationPlanner::new(catalog, store.clone(), settings.clone());
    let download = DownloadScheduler::new(
        store.clone(),
        store.clone(),
        connector.clone(),
        settings.clone(),
        SchedulerOptions::download(),
    );
    let update = UpdateScheduler::new(
        store.clone(),
        store.clone(),
        connector,
        settings,
        SchedulerOptions::update(),
    );
    let jobs = Jobs::new(planner, download, update);

    let shutdown = CancellationToken::new();
    let periodic = jobs::spawn_periodic(
        jobs.clone(),
        config.recommend_interval(),
        config.update_interval(),
        shutdown.clone(),
    );

    let app = create_router(AppState::new(jobs, store));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server running on http://{}", addr);

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
            }
            tracing::info!("Shutting down");
            server_shutdown.cancel();
        })
        .await?;

    shutdown.cancel();
    for handle in periodic {
        let _ = handle.await;
    }
    if let Some(writer) = cache_writer {
        writer.shutdown().await;
    }

    Ok(())
}
