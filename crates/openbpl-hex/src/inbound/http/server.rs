use axum::handler::HandlerWithoutStateExt;
use axum::{routing::get, serve, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;

use super::handlers::{self, ENDPOINTS};
use super::middleware;
use super::state::{AppState, ServiceInfo};
use crate::application::query_service::QueryService;
use crate::config::Config;
use crate::errors::ServerError;
use openbpl_types::ports::{ThreatRepository, UserRepository};

/// How long in-flight requests get to finish once shutdown starts.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on a single request, from accept to response head.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone, Debug)]
pub struct HttpServerConfig {
    pub addr: String,
    pub environment: String,
    pub static_dir: PathBuf,
    pub request_timeout: Duration,
    pub shutdown_timeout: Duration,
}

impl HttpServerConfig {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            environment: "development".into(),
            static_dir: PathBuf::from("static"),
            request_timeout: REQUEST_TIMEOUT,
            shutdown_timeout: SHUTDOWN_TIMEOUT,
        }
    }
}

impl From<&Config> for HttpServerConfig {
    fn from(config: &Config) -> Self {
        Self {
            addr: config.listen_addr(),
            environment: config.environment.clone(),
            static_dir: config.static_dir.clone(),
            request_timeout: REQUEST_TIMEOUT,
            shutdown_timeout: SHUTDOWN_TIMEOUT,
        }
    }
}

pub struct HttpServer<U, T>
where
    U: UserRepository,
    T: ThreatRepository,
{
    pub state: AppState<U, T>,
    pub config: HttpServerConfig,
}

impl<U, T> HttpServer<U, T>
where
    U: UserRepository,
    T: ThreatRepository,
{
    pub async fn new(service: QueryService<U, T>, config: HttpServerConfig) -> anyhow::Result<Self> {
        let info = ServiceInfo::new(config.environment.clone());
        Ok(Self {
            state: AppState {
                service: Arc::new(service),
                info: Arc::new(info),
            },
            config,
        })
    }

    /// The full application: routes, static mount, catch-all, middleware.
    pub fn router(&self) -> Router {
        // Missing files and non-GET methods get the same 404 envelope as
        // any other unknown resource.
        let static_files = ServeDir::new(&self.config.static_dir)
            .call_fallback_on_method_not_allowed(true)
            .fallback(handlers::not_found.into_service());

        let app = Router::new()
            .route("/health", get(handlers::health))
            .route("/api/v1/status", get(handlers::status))
            .route("/api/v1/users", get(handlers::list_users::<U, T>))
            .route("/api/v1/users/{id}", get(handlers::get_user::<U, T>))
            .route("/api/v1/threats", get(handlers::list_threats::<U, T>))
            .route("/api/v1/threats/{id}", get(handlers::get_threat::<U, T>))
            .route("/", get(handlers::home))
            .nest_service("/static", static_files)
            .fallback(handlers::not_found)
            .method_not_allowed_fallback(handlers::not_found)
            .with_state(self.state.clone());

        middleware::wrap(app, self.config.request_timeout)
    }

    /// Binds the listener and starts serving on a background task.
    pub async fn start(self) -> Result<Listening, ServerError> {
        let app = self.router();
        let addr = self.config.addr.clone();
        let bind_err = |source| ServerError::Bind {
            addr: addr.clone(),
            source,
        };
        let listener = tokio::net::TcpListener::bind(addr.as_str())
            .await
            .map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;

        tracing::info!(
            %local_addr,
            environment = %self.config.environment,
            "server listening"
        );
        for (route, description) in ENDPOINTS {
            tracing::info!("  {route} - {description}");
        }

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            serve(listener, app.into_make_service())
                .with_graceful_shutdown(async move {
                    let _ = stop_rx.await;
                })
                .await
        });

        Ok(Listening {
            local_addr,
            stop_tx,
            task,
            shutdown_timeout: self.config.shutdown_timeout,
        })
    }

    /// Serves until SIGINT or SIGTERM, then shuts down gracefully.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(shutdown_signal()).await
    }

    pub async fn run_until<F>(self, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let mut listening = self.start().await?;
        let exited_early = tokio::select! {
            _ = signal => None,
            res = &mut listening.task => Some(res),
        };
        match exited_early {
            None => listening.shutdown().await,
            Some(res) => {
                tracing::error!("server stopped without a shutdown signal");
                flatten(res)
            }
        }
    }
}

/// A bound, serving server.
pub struct Listening {
    local_addr: SocketAddr,
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
    shutdown_timeout: Duration,
}

impl Listening {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting connections and waits for in-flight requests, up to
    /// the shutdown timeout. Past the deadline the serving task is aborted
    /// and `ShutdownTimeout` is returned.
    pub async fn shutdown(self) -> Result<(), ServerError> {
        let Listening {
            stop_tx,
            mut task,
            shutdown_timeout,
            ..
        } = self;

        tracing::info!(timeout = ?shutdown_timeout, "server shutting down");
        let _ = stop_tx.send(());

        match tokio::time::timeout(shutdown_timeout, &mut task).await {
            Ok(res) => {
                flatten(res)?;
                tracing::info!("server stopped gracefully");
                Ok(())
            }
            Err(_) => {
                task.abort();
                tracing::error!(timeout = ?shutdown_timeout, "server forced to shut down");
                Err(ServerError::ShutdownTimeout(shutdown_timeout))
            }
        }
    }
}

fn flatten(res: Result<std::io::Result<()>, tokio::task::JoinError>) -> Result<(), ServerError> {
    match res {
        Ok(inner) => inner.map_err(ServerError::Serve),
        Err(join) => Err(ServerError::Serve(std::io::Error::other(join))),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }
}
