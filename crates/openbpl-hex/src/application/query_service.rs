use crate::errors::AppError;
use openbpl_types::domain::threat::Threat;
use openbpl_types::domain::user::User;
use openbpl_types::ports::{ThreatRepository, UserRepository};

/// Read-side use cases over users and threats.
pub struct QueryService<U: UserRepository, T: ThreatRepository> {
    users: U,
    threats: T,
}

impl<U: UserRepository, T: ThreatRepository> QueryService<U, T> {
    pub fn new(users: U, threats: T) -> Self {
        Self { users, threats }
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.users
            .list()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
    }

    pub async fn get_user(&self, id: i64) -> Result<User, AppError> {
        match self
            .users
            .get(id)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        {
            Some(u) => Ok(u),
            None => Err(AppError::NotFound("user".into())),
        }
    }

    pub async fn list_threats(&self) -> Result<Vec<Threat>, AppError> {
        self.threats
            .list()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
    }

    pub async fn get_threat(&self, id: i64) -> Result<Threat, AppError> {
        match self
            .threats
            .get(id)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        {
            Some(t) => Ok(t),
            None => Err(AppError::NotFound("threat".into())),
        }
    }
}
