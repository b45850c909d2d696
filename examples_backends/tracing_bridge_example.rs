use tracing::{error, info};

use ingest_log_sink::init::{init_tracing_with_config, LayerConfig};
use ingest_log_sink::{env, Logger, Options};

#[tokio::main]
async fn main() {
    let key = env::ingest_key().unwrap_or_else(|| "YOUR INGESTION KEY".to_string());
    let logger = Logger::new(Options::from_env(), key).expect("invalid logger options");

    init_tracing_with_config(&logger, LayerConfig::default())
        .expect("global subscriber already installed");

    info!("tracing bridge example started");
    error!(order_id = 123, reason = "card expired", "order failed");

    logger.close().await;
}
