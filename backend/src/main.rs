mod config;
mod handler;
mod s3;
mod stats;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use bytesize::ByteSize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::CONFIG;

const DEFAULT_LOG_FILTER: &str = "info,rda=debug,tower_http=debug";

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

async fn wait_for_ctrl_c() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "cannot listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn wait_for_terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            terminate.recv().await;
        }
        Err(error) => {
            tracing::error!(%error, "cannot listen for SIGTERM");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_terminate() {
    std::future::pending::<()>().await;
}

async fn shutdown_signal() {
    tokio::select! {
        () = wait_for_ctrl_c() => tracing::info!("received Ctrl+C"),
        () = wait_for_terminate() => tracing::info!("received SIGTERM"),
    }
    tracing::info!("finishing in-flight requests before exit");
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let listen_addr: SocketAddr = CONFIG
        .listen_addr
        .parse()
        .with_context(|| format!("invalid LISTEN_ADDR {:?}", CONFIG.listen_addr))?;

    let aws_config = aws_config::load_from_env().await;
    let router = handler::create_router(aws_sdk_s3::Client::new(&aws_config));

    tracing::info!(
        %listen_addr,
        bucket = %CONFIG.s3_bucket_name,
        static_dir = %CONFIG.static_dir,
        max_upload_size = %ByteSize(CONFIG.max_upload_size as u64),
        city_altitude_msnm = CONFIG.city_altitude_msnm,
        "flight data dashboard listening"
    );

    axum::Server::bind(&listen_addr)
        .serve(router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server stopped with an error")
}
