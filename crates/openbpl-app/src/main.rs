use openbpl_hex::application::query_service::QueryService;
use openbpl_hex::config::Config;
use openbpl_hex::inbound::http::{HttpServer, HttpServerConfig};
use openbpl_repo::build_repos;
use std::time::Duration;

const STORE_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for DATABASE_URL / SERVER_PORT when present.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "debug".to_string()))
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        environment = %config.environment,
        addr = %config.listen_addr(),
        "starting OpenBPL server"
    );

    let repos = build_repos(config.database_url.as_deref()).await?;
    repos.ping().await?;
    let service = QueryService::new(repos.users.clone(), repos.threats.clone());

    let http = HttpServer::new(service, HttpServerConfig::from(&config)).await?;
    if let Err(e) = http.run().await {
        // Connections may still hold the store; exit without waiting on them.
        tracing::error!(error = %e, "server did not stop cleanly");
        return Err(e.into());
    }

    if !repos.close_within(STORE_CLOSE_TIMEOUT).await {
        tracing::warn!(timeout = ?STORE_CLOSE_TIMEOUT, "store did not close in time");
    }
    Ok(())
}
