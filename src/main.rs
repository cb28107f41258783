use std::sync::Arc;

use clap::Parser;
use tracing::info;

use roster::users::{MemoryStore, UserHandler};
use roster::{Config, Router, Server, telemetry};

#[tokio::main]
async fn main() -> Result<(), roster::Error> {
    let config = Config::parse();
    telemetry::init(&config.log_filter);

    info!(
        addr = %config.addr(),
        shutdown_timeout_secs = config.shutdown_timeout_secs,
        max_body_bytes = config.max_body_bytes,
        "configuration loaded"
    );

    let store = Arc::new(MemoryStore::new());
    let router = UserHandler::new(store).routes(Router::new());

    Server::from_config(&config).serve(router).await
}
