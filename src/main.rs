use std::{process, sync::Arc};

use fontproxy::{
    application::{
        error::AppError,
        fonts::{FontProxyConfig, FontProxyService},
    },
    config::{self, Settings},
    infra::{
        cache_store::CacheStore,
        error::InfraError,
        http::{self, FontsState},
        origin::HttpOrigin,
        telemetry, tls,
    },
};
use tokio::net::TcpListener;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
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
    let (cli_args, settings) = config::load_with_cli()?;

    if let Some(config::Command::CheckConfig(_)) = cli_args.command {
        println!("{settings}");
        return Ok(());
    }

    telemetry::init(&settings.logging)?;
    run_serve(settings).await
}

async fn run_serve(settings: Settings) -> Result<(), AppError> {
    let store = CacheStore::new(settings.cache.directory.clone(), settings.cache.ttl)
        .map_err(|err| {
            InfraError::configuration(format!(
                "cache directory {} is unusable: {err}",
                settings.cache.directory.display()
            ))
        })?;
    let origin = HttpOrigin::new(&settings.upstream)?;
    let service = FontProxyService::new(
        Arc::new(store),
        Arc::new(origin),
        FontProxyConfig::from(&settings),
    );
    let router = http::build_router(FontsState {
        service: Arc::new(service),
    });

    let acceptor = settings.tls.as_ref().map(tls::build_acceptor).transpose()?;

    let listener = TcpListener::bind(settings.server.listen_addr)
        .await
        .map_err(InfraError::from)?;

    info!(
        target = "fontproxy::server",
        addr = %settings.server.listen_addr,
        public_base_url = %settings.server.public_base_url,
        tls = acceptor.is_some(),
        cache_dir = %settings.cache.directory.display(),
        ttl_secs = settings.cache.ttl.as_secs(),
        "fontproxy listening"
    );

    match acceptor {
        Some(acceptor) => tls::serve(listener, acceptor, router, shutdown_signal()).await?,
        None => axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|err| AppError::unexpected(format!("server error: {err}")))?,
    }

    info!(target = "fontproxy::server", "fontproxy stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(
            target = "fontproxy::server",
            error = %err,
            "failed to listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }
}
