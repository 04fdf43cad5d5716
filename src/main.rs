use std::{io::Write, process, sync::Arc};

use syndic::{
    application::{
        delivery::{DeliveryOptions, FeedDeliveryService, FeedRequest},
        error::AppError,
        syndication::{AssemblerOptions, FeedAssembler},
    },
    cache::{CacheConfig, MemoryCacheStore},
    config,
    infra::{
        content::FsContentSource,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
    util::clock::{Clock, SystemClock},
};
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

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
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
        config::Command::Render(args) => run_render(settings, args).await,
    }
}

fn build_delivery(settings: &config::Settings) -> Result<FeedDeliveryService, AppError> {
    let root = &settings.content.root;
    if !root.is_dir() {
        return Err(InfraError::configuration(format!(
            "content root `{}` is not a directory",
            root.display()
        ))
        .into());
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let source = Arc::new(FsContentSource::new(root.clone(), settings.site.url.clone()));

    let mut assembler_options = AssemblerOptions::new(settings.site.clone());
    assembler_options.fallback_author = settings.feeds.author.clone();
    assembler_options.ttl_minutes = settings.cache.ttl.minutes();
    assembler_options.high_water = settings.feeds.high_water;
    let assembler = FeedAssembler::new(source, clock.clone(), assembler_options);

    let store = Arc::new(MemoryCacheStore::new(
        &CacheConfig::from(&settings.cache),
        clock.clone(),
    ));
    let options = DeliveryOptions {
        disabled: settings.feeds.disable,
        firehose: settings.feeds.firehose.clone(),
        categories: settings.feeds.categories.clone(),
        ttl: settings.cache.ttl,
    };

    Ok(FeedDeliveryService::new(assembler, store, clock, options))
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let delivery = Arc::new(build_delivery(&settings)?);
    let state = HttpState::new(delivery, settings.feeds.debug_query_value.as_str());
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        addr = %settings.server.addr,
        content_root = %settings.content.root.display(),
        cache_ttl_minutes = settings.cache.ttl.minutes().unwrap_or_default(),
        "serving feeds"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn run_render(settings: config::Settings, args: config::RenderArgs) -> Result<(), AppError> {
    let delivery = build_delivery(&settings)?;
    let scope = delivery.resolve_scope(args.category.as_deref())?;
    let request = FeedRequest::new(scope, args.format).with_debug(args.debug);
    let result = delivery.deliver(&request).await?;

    let body = result
        .body
        .ok_or_else(|| AppError::unexpected("render produced no body"))?;
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(&body)
        .and_then(|()| stdout.flush())
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
