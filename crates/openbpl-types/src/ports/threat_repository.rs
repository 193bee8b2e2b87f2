use async_trait::async_trait;

use super::RepoError;
use crate::domain::threat::Threat;

/// Read access to threat records.
#[async_trait]
pub trait ThreatRepository: Send + Sync + 'static {
    /// All threats, ascending by id.
    async fn list(&self) -> Result<Vec<Threat>, RepoError>;
    async fn get(&self, id: i64) -> Result<Option<Threat>, RepoError>;
}
