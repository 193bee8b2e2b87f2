#[cfg(not(any(feature = "memory", feature = "sqlite")))]
compile_error!("Enable a repo feature: `memory` or `sqlite`.");

use openbpl_types::ports::RepoError;
use std::time::Duration;

#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://openbpl.db";

#[cfg(feature = "sqlite")]
pub type UserRepo = sqlite::SqliteUserRepo;
#[cfg(feature = "sqlite")]
pub type ThreatRepo = sqlite::SqliteThreatRepo;

#[cfg(all(feature = "memory", not(feature = "sqlite")))]
pub type UserRepo = memory::InMemoryUserRepo;
#[cfg(all(feature = "memory", not(feature = "sqlite")))]
pub type ThreatRepo = memory::InMemoryThreatRepo;

/// The repositories for one process, plus ownership of the store behind
/// them. SQLite wins when both features are enabled.
pub struct Repos {
    pub users: UserRepo,
    pub threats: ThreatRepo,
    #[cfg(feature = "sqlite")]
    store: sqlite::SqliteStore,
}

pub async fn build_repos(url: Option<&str>) -> anyhow::Result<Repos> {
    Repos::build(url).await
}

#[cfg(feature = "sqlite")]
impl Repos {
    pub async fn build(database_url: Option<&str>) -> anyhow::Result<Self> {
        let url = database_url.unwrap_or(DEFAULT_DATABASE_URL);
        let store = sqlite::SqliteStore::connect(url).await?;
        Ok(Self {
            users: store.users(),
            threats: store.threats(),
            store,
        })
    }

    pub async fn ping(&self) -> Result<(), RepoError> {
        self.store.ping().await
    }

    pub async fn close(&self) {
        self.store.close().await;
    }

    pub async fn close_within(&self, timeout: Duration) -> bool {
        self.store.close_within(timeout).await
    }
}

#[cfg(all(feature = "memory", not(feature = "sqlite")))]
impl Repos {
    pub async fn build(database_url: Option<&str>) -> anyhow::Result<Self> {
        if let Some(url) = database_url {
            tracing::warn!(%url, "sqlite feature disabled; ignoring DATABASE_URL and using in-memory store");
        }
        Ok(Self {
            users: memory::InMemoryUserRepo::new(),
            threats: memory::InMemoryThreatRepo::new(),
        })
    }

    pub async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }

    pub async fn close(&self) {}

    pub async fn close_within(&self, _timeout: Duration) -> bool {
        true
    }
}
