use ingest_log_sink::{env, Logger, MessageOptions, Options};

#[tokio::main]
async fn main() {
    // LOG_INGEST_KEY, LOG_INGEST_URL, LOG_INGEST_HOSTNAME, LOG_INGEST_APP, ...
    let key = env::ingest_key().unwrap_or_else(|| "YOUR INGESTION KEY".to_string());

    let options = Options {
        level: "info".into(),
        meta: r#"{"region": "eu-west-1"}"#.into(),
        index_meta: true,
        ..Options::from_env()
    };
    let logger = Logger::new(options, key).expect("invalid logger options");

    logger.log("service started");
    logger.warn("cache miss ratio above threshold");
    logger
        .log_with_level_and_app("payment declined", "error", "billing")
        .expect("valid level and app");
    logger
        .log_with_options(
            "request served",
            MessageOptions {
                env: "staging".into(),
                meta: r#"{"path": "/health", "status": 200}"#.into(),
                ..MessageOptions::default()
            },
        )
        .expect("valid message options");

    // Drains the buffer and waits for every send before exiting.
    let handle = logger.handle();
    logger.close().await;
    println!("{:?}", handle.stats());
}
