use async_trait::async_trait;

use super::RepoError;
use crate::domain::user::User;

/// Read access to user records.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// All users, ascending by id.
    async fn list(&self) -> Result<Vec<User>, RepoError>;
    async fn get(&self, id: i64) -> Result<Option<User>, RepoError>;
}
