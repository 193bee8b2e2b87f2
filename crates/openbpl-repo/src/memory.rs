use async_trait::async_trait;
use dashmap::DashMap;
use openbpl_types::domain::threat::Threat;
use openbpl_types::domain::user::User;
use openbpl_types::ports::{RepoError, ThreatRepository, UserRepository};
use std::sync::Arc;

/// Map-backed user store. `insert` exists only to seed fixtures; the
/// repository trait itself stays read-only.
#[derive(Clone, Default)]
pub struct InMemoryUserRepo {
    map: Arc<DashMap<i64, User>>,
}

impl InMemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: User) {
        self.map.insert(user.id, user);
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepo {
    async fn list(&self) -> Result<Vec<User>, RepoError> {
        let mut users: Vec<User> = self.map.iter().map(|kv| kv.value().clone()).collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn get(&self, id: i64) -> Result<Option<User>, RepoError> {
        Ok(self.map.get(&id).map(|r| r.clone()))
    }
}

#[derive(Clone, Default)]
pub struct InMemoryThreatRepo {
    map: Arc<DashMap<i64, Threat>>,
}

impl InMemoryThreatRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, threat: Threat) {
        self.map.insert(threat.id, threat);
    }
}

#[async_trait]
impl ThreatRepository for InMemoryThreatRepo {
    async fn list(&self) -> Result<Vec<Threat>, RepoError> {
        let mut threats: Vec<Threat> = self.map.iter().map(|kv| kv.value().clone()).collect();
        threats.sort_by_key(|t| t.id);
        Ok(threats)
    }

    async fn get(&self, id: i64) -> Result<Option<Threat>, RepoError> {
        Ok(self.map.get(&id).map(|r| r.clone()))
    }
}
