//! openbpl-types: domain records, repository ports and the wire envelope
//! shared by the server, the repositories and the client.

pub mod api;
pub mod domain;
pub mod ports;
