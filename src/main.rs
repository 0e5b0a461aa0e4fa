use std::{
    io::{self, Write},
    process,
    sync::Arc,
};

use hazard_atlas::{
    application::{
        advisories::AdvisoryService,
        error::AppError,
        proxy::{AdvisoryCache, AdvisoryProxy, UpstreamTransport},
    },
    cache::{CacheConfig, spawn_sweeper},
    config,
    infra::{
        error::InfraError,
        http::{self, HttpState},
        telemetry,
        upstream::AwcTransport,
    },
};
use time::OffsetDateTime;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Snapshot(args) => run_snapshot(settings, *args).await,
    }
}

struct ApplicationContext {
    cache: Arc<AdvisoryCache>,
    cache_config: CacheConfig,
    advisories: Arc<AdvisoryService>,
}

fn build_application_context(settings: &config::Settings) -> Result<ApplicationContext, AppError> {
    let cache_config = CacheConfig::from(&settings.cache);
    let cache = Arc::new(AdvisoryCache::new(cache_config.ttl));

    let transport: Arc<dyn UpstreamTransport> =
        Arc::new(AwcTransport::new(settings.upstream.timeout).map_err(AppError::from)?);
    let proxy = Arc::new(AdvisoryProxy::new(
        settings.upstream.base_url.clone(),
        cache.clone(),
        transport,
    ));

    Ok(ApplicationContext {
        cache,
        cache_config,
        advisories: Arc::new(AdvisoryService::new(proxy)),
    })
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let app = build_application_context(&settings)?;

    let sweeper_handle = spawn_sweeper(app.cache.clone(), app.cache_config.sweep_interval);

    let result = serve_http(&settings, app.advisories).await;

    sweeper_handle.abort();
    let _ = sweeper_handle.await;

    result
}

async fn serve_http(
    settings: &config::Settings,
    advisories: Arc<AdvisoryService>,
) -> Result<(), AppError> {
    let router = http::build_router(HttpState { advisories });

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "hazard_atlas::serve",
        addr = %settings.server.addr,
        upstream = %settings.upstream.base_url,
        ttl_seconds = settings.cache.ttl.as_secs(),
        "Listening for advisory requests"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!(target = "hazard_atlas::serve", "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

async fn run_snapshot(
    settings: config::Settings,
    args: config::SnapshotArgs,
) -> Result<(), AppError> {
    let app = build_application_context(&settings)?;
    let filter = args.filter.state();

    let collection = app
        .advisories
        .feature_collection(args.query_params(), &filter, OffsetDateTime::now_utc())
        .await?;

    info!(
        target = "hazard_atlas::snapshot",
        features = collection.len(),
        "Built advisory snapshot"
    );

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&collection)
    } else {
        serde_json::to_string(&collection)
    }
    .map_err(|err| AppError::unexpected(format!("failed to serialize snapshot: {err}")))?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{rendered}").map_err(|err| AppError::from(InfraError::from(err)))?;
    Ok(())
}
