//! openbpl-hex: read-only OpenBPL API library (core + inbound HTTP)

pub mod config;
pub mod errors;

pub mod application;

pub use openbpl_types::{api, domain, ports};

pub mod inbound; // HTTP adapter (server, handlers, middleware)
