use async_trait::async_trait;
use chrono::{DateTime, Utc};
use openbpl_types::domain::threat::{Severity, Threat};
use openbpl_types::domain::user::{User, UserRole};
use openbpl_types::ports::{RepoError, ThreatRepository, UserRepository};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{FromRow, SqlitePool};
use std::str::FromStr;
use std::time::Duration;

const MIGRATIONS: [&str; 2] = [
    include_str!("../migrations/0001_create_users.sql"),
    include_str!("../migrations/0002_create_threats.sql"),
];

/// An open SQLite pool shared by every repository built from it.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        for ddl in MIGRATIONS {
            sqlx::query(ddl).execute(&pool).await?;
        }

        Ok(Self { pool })
    }

    /// Raw pool access, for fixtures and external loaders.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn ping(&self) -> Result<(), RepoError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::DbError(e.to_string()))?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Like `close`, but gives up after `timeout` when connections are still
    /// checked out. The pool stays closed to new work either way. Returns
    /// whether every connection was released in time.
    pub async fn close_within(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.pool.close()).await.is_ok()
    }

    pub fn users(&self) -> SqliteUserRepo {
        SqliteUserRepo {
            pool: self.pool.clone(),
        }
    }

    pub fn threats(&self) -> SqliteThreatRepo {
        SqliteThreatRepo {
            pool: self.pool.clone(),
        }
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepoError> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .map_err(|e| RepoError::Corrupt(format!("timestamp {raw:?}: {e}")))?
        .with_timezone(&Utc))
}

#[derive(Clone)]
pub struct SqliteUserRepo {
    pool: SqlitePool,
}

#[derive(FromRow)]
struct DbUser {
    id: i64,
    name: String,
    email: String,
    role: String,
    created_at: String,
    updated_at: String,
}

impl DbUser {
    fn into_user(self) -> Result<User, RepoError> {
        let role = self
            .role
            .parse::<UserRole>()
            .map_err(|e| RepoError::Corrupt(format!("user {}: {e}", self.id)))?;
        Ok(User {
            id: self.id,
            name: self.name,
            email: self.email,
            role,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepo {
    async fn list(&self) -> Result<Vec<User>, RepoError> {
        let rows: Vec<DbUser> = sqlx::query_as(
            "SELECT id, name, email, role, created_at, updated_at FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::DbError(e.to_string()))?;

        rows.into_iter()
            .map(|r| r.into_user())
            .collect::<Result<Vec<_>, _>>()
    }

    async fn get(&self, id: i64) -> Result<Option<User>, RepoError> {
        let row: Option<DbUser> = sqlx::query_as(
            "SELECT id, name, email, role, created_at, updated_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::DbError(e.to_string()))?;
        row.map(|r| r.into_user()).transpose()
    }
}

#[derive(Clone)]
pub struct SqliteThreatRepo {
    pool: SqlitePool,
}

#[derive(FromRow)]
struct DbThreat {
    id: i64,
    title: String,
    classification: String,
    severity: String,
    description: Option<String>,
    created_at: String,
    updated_at: String,
}

impl DbThreat {
    fn into_threat(self) -> Result<Threat, RepoError> {
        let severity = self
            .severity
            .parse::<Severity>()
            .map_err(|e| RepoError::Corrupt(format!("threat {}: {e}", self.id)))?;
        Ok(Threat {
            id: self.id,
            title: self.title,
            classification: self.classification,
            severity,
            description: self.description,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

#[async_trait]
impl ThreatRepository for SqliteThreatRepo {
    async fn list(&self) -> Result<Vec<Threat>, RepoError> {
        let rows: Vec<DbThreat> = sqlx::query_as(
            "SELECT id, title, classification, severity, description, created_at, updated_at
             FROM threats ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::DbError(e.to_string()))?;

        rows.into_iter()
            .map(|r| r.into_threat())
            .collect::<Result<Vec<_>, _>>()
    }

    async fn get(&self, id: i64) -> Result<Option<Threat>, RepoError> {
        let row: Option<DbThreat> = sqlx::query_as(
            "SELECT id, title, classification, severity, description, created_at, updated_at
             FROM threats WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::DbError(e.to_string()))?;
        row.map(|r| r.into_threat()).transpose()
    }
}
