pub mod threat_repository;
pub mod user_repository;

pub use threat_repository::ThreatRepository;
pub use user_repository::UserRepository;

/// Failure reported by a repository adapter.
///
/// "No such record" is never an error: lookups return `Ok(None)` for that.
#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("db error: {0}")]
    DbError(String),

    /// A stored row could not be turned into a complete record.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}
