//! Shared state injected into every handler.

use axum::extract::FromRef;
use chrono::{DateTime, Utc};
use openbpl_types::ports::{ThreatRepository, UserRepository};
use std::sync::Arc;

use crate::application::query_service::QueryService;

pub const SERVICE_NAME: &str = "openbpl";

/// Process-wide metadata reported by `/api/v1/status`. Fixed at startup.
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub environment: String,
    pub started_at: DateTime<Utc>,
}

impl ServiceInfo {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            service: SERVICE_NAME.into(),
            version: env!("CARGO_PKG_VERSION").into(),
            environment: environment.into(),
            started_at: Utc::now(),
        }
    }
}

/// Everything behind an `Arc`, so cloning per request is cheap.
pub struct AppState<U: UserRepository, T: ThreatRepository> {
    pub service: Arc<QueryService<U, T>>,
    pub info: Arc<ServiceInfo>,
}

impl<U: UserRepository, T: ThreatRepository> Clone for AppState<U, T> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            info: self.info.clone(),
        }
    }
}

impl<U: UserRepository, T: ThreatRepository> FromRef<AppState<U, T>> for Arc<QueryService<U, T>> {
    fn from_ref(state: &AppState<U, T>) -> Self {
        state.service.clone()
    }
}

impl<U: UserRepository, T: ThreatRepository> FromRef<AppState<U, T>> for Arc<ServiceInfo> {
    fn from_ref(state: &AppState<U, T>) -> Self {
        state.info.clone()
    }
}
