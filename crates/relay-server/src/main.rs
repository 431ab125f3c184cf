//! WebSocket chat relay binary.

use relay_server::config::Config;
use relay_server::server;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "relay_server=info,relay_core=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    init_tracing(config.log_json);

    tracing::info!(
        addr = %config.socket_addr_string(),
        max_clients = config.max_clients,
        outbound_queue = config.outbound_queue,
        "starting chat relay v{}",
        env!("CARGO_PKG_VERSION")
    );

    server::run(config).await
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
