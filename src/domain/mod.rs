//! Domain layer: pure business models and port contracts.
//!
//! Nothing in here performs I/O; infrastructure adapters implement the port
//! traits and are injected at composition time.

pub mod models;
pub mod ports;
