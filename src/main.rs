use std::net::SocketAddr;
use std::sync::Arc;

use tunelink::common::logger;
use tunelink::common::types::AnyResult;
use tunelink::configs::Config;
use tunelink::server::AppState;
use tunelink::transport;

#[tokio::main]
async fn main() -> AnyResult<()> {
    let config = Config::load()?;
    logger::init(&config);

    let host = config.server.host.clone();
    let port = config.server.port;

    let state = Arc::new(AppState::from_config(config)?);

    let app = transport::http_server::router(state)
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let address: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Tunelink listening on {}", address);

    let listener = tokio::net::TcpListener::bind(address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received");
}
