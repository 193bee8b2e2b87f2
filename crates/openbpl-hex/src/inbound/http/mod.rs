pub mod handlers;
pub mod middleware;
pub mod server;
pub mod state;

pub use server::{HttpServer, HttpServerConfig, Listening, REQUEST_TIMEOUT, SHUTDOWN_TIMEOUT};
pub use state::{AppState, ServiceInfo};
