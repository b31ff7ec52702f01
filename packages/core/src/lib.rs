// Library root: exposes internal modules for integration tests in `tests/`.
// Production entry point remains `src/main.rs`.

pub mod alerts;
pub mod api;
pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod monitor;
pub mod reading;
pub mod scheduler;
pub mod source;
pub mod store;

// Startup wiring used by the binary; config parsing is covered by its own
// unit tests.
pub mod cli;
pub mod config;
pub mod logging;
