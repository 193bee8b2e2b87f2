use axum::extract::{Path, State};
use axum::Json;
use openbpl_types::api::{Envelope, HealthInfo, Landing, StatusInfo};
use openbpl_types::domain::parse_record_id;
use openbpl_types::domain::threat::Threat;
use openbpl_types::domain::user::User;
use openbpl_types::ports::{ThreatRepository, UserRepository};
use std::sync::Arc;

use super::state::{ServiceInfo, SERVICE_NAME};
use crate::application::query_service::QueryService;
use crate::errors::AppError;

/// Routes advertised on the landing page and in the startup log.
pub const ENDPOINTS: [(&str, &str); 7] = [
    ("GET /health", "Health check"),
    ("GET /api/v1/status", "Status info"),
    ("GET /api/v1/users", "List users"),
    ("GET /api/v1/users/{id}", "Get user by ID"),
    ("GET /api/v1/threats", "List threats"),
    ("GET /api/v1/threats/{id}", "Get threat by ID"),
    ("GET /", "Home page"),
];

pub async fn health() -> Json<Envelope<HealthInfo>> {
    Json(Envelope::success(HealthInfo {
        service: SERVICE_NAME.into(),
        healthy: true,
    }))
}

pub async fn status(State(info): State<Arc<ServiceInfo>>) -> Json<Envelope<StatusInfo>> {
    Json(Envelope::success(StatusInfo {
        service: info.service.clone(),
        version: info.version.clone(),
        environment: info.environment.clone(),
        started_at: info.started_at,
    }))
}

pub async fn home(State(info): State<Arc<ServiceInfo>>) -> Json<Envelope<Landing>> {
    Json(Envelope::success(Landing {
        service: info.service.clone(),
        message: "OpenBPL brand protection API".into(),
        endpoints: ENDPOINTS
            .iter()
            .map(|(route, _)| route.to_string())
            .collect(),
    }))
}

/// Catch-all for unknown paths and unsupported methods on known ones.
pub async fn not_found() -> AppError {
    AppError::NotFound("resource".into())
}

pub async fn list_users<U, T>(
    State(service): State<Arc<QueryService<U, T>>>,
) -> Result<Json<Envelope<Vec<User>>>, AppError>
where
    U: UserRepository,
    T: ThreatRepository,
{
    let users = service.list_users().await?;
    Ok(Json(Envelope::success(users)))
}

pub async fn get_user<U, T>(
    State(service): State<Arc<QueryService<U, T>>>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<User>>, AppError>
where
    U: UserRepository,
    T: ThreatRepository,
{
    // A malformed id can never match a row.
    let id = parse_record_id(&id).ok_or_else(|| AppError::NotFound("user".into()))?;
    let user = service.get_user(id).await?;
    Ok(Json(Envelope::success(user)))
}

pub async fn list_threats<U, T>(
    State(service): State<Arc<QueryService<U, T>>>,
) -> Result<Json<Envelope<Vec<Threat>>>, AppError>
where
    U: UserRepository,
    T: ThreatRepository,
{
    let threats = service.list_threats().await?;
    Ok(Json(Envelope::success(threats)))
}

pub async fn get_threat<U, T>(
    State(service): State<Arc<QueryService<U, T>>>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Threat>>, AppError>
where
    U: UserRepository,
    T: ThreatRepository,
{
    let id = parse_record_id(&id).ok_or_else(|| AppError::NotFound("threat".into()))?;
    let threat = service.get_threat(id).await?;
    Ok(Json(Envelope::success(threat)))
}
