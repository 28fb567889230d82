use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use writegate_server::{config::Config, supervisor};

/// Masks the credential part of a database URL for logging.
fn mask_database_url(url: &str) -> String {
    match url.split_once("://") {
        Some((scheme, rest)) => match rest.split_once('@') {
            Some((userinfo, host)) => {
                let user = userinfo.split(':').next().unwrap_or("");
                format!("{scheme}://{user}:***@{host}")
            }
            None => format!("{scheme}://{rest}"),
        },
        None => url.to_string(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "writegate_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!(
        listen_addr = %config.listen_addr(),
        database_url = %mask_database_url(&config.database_url),
        db_max_connections = config.db_max_connections,
        db_acquire_timeout_secs = config.db_acquire_timeout_secs,
        workers = config.worker_count,
        "Loaded configuration from environment/.env"
    );

    supervisor::run(config).await
}
