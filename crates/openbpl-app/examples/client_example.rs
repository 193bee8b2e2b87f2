///  To run :
///  cargo r --example client_example
use openbpl_client::OpenBplClient;
use openbpl_hex::application::query_service::QueryService;
use openbpl_hex::inbound::http::{HttpServer, HttpServerConfig};
use openbpl_repo::sqlite::SqliteStore;
use tempfile::tempdir;

const SEEDED_AT: &str = "2024-05-01T12:00:00+00:00";

async fn seed(store: &SqliteStore) -> anyhow::Result<()> {
    for (id, name, role) in [(1, "Alice", "admin"), (2, "Bob", "analyst")] {
        sqlx::query(
            "INSERT INTO users (id, name, email, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(name)
        .bind(format!("{}@example.com", name.to_lowercase()))
        .bind(role)
        .bind(SEEDED_AT)
        .bind(SEEDED_AT)
        .execute(store.pool())
        .await?;
    }

    sqlx::query(
        "INSERT INTO threats (id, title, classification, severity, description, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(1_i64)
    .bind("Lookalike login page")
    .bind("phishing")
    .bind("high")
    .bind("credential harvesting on a typo domain")
    .bind(SEEDED_AT)
    .bind(SEEDED_AT)
    .execute(store.pool())
    .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    // Temp file-backed SQLite DB so the pool's connections share data.
    let tmp = tempdir()?;
    let db_url = format!("sqlite://{}", tmp.path().join("openbpl.db").display());
    let store = SqliteStore::connect(&db_url).await?;
    seed(&store).await?;

    let service = QueryService::new(store.users(), store.threats());
    let server = HttpServer::new(service, HttpServerConfig::new("127.0.0.1:0")).await?;
    let listening = server.start().await?;
    let client = OpenBplClient::new(&format!("http://{}/", listening.local_addr()))?;

    let health = client.health().await?;
    println!("health: {} healthy={}", health.service, health.healthy);
    let status = client.status().await?;
    println!("status: v{} ({})", status.version, status.environment);

    for user in client.list_users().await? {
        println!("user {}: {} <{}> [{}]", user.id, user.name, user.email, user.role);
    }
    match client.get_user(99).await? {
        Some(user) => println!("unexpected user: {}", user.name),
        None => println!("user 99: not found"),
    }

    for threat in client.list_threats().await? {
        println!(
            "threat {}: {} ({}, {})",
            threat.id, threat.title, threat.classification, threat.severity
        );
    }
    if let Some(threat) = client.get_threat(1).await? {
        println!(
            "threat 1 description: {}",
            threat.description.as_deref().unwrap_or("-")
        );
    }

    listening.shutdown().await?;
    store.close().await;
    Ok(())
}
