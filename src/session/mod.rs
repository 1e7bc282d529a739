//! Listener session management.
//!
//! Dependency order within the module: [`queue`] (per-stream line FIFOs) →
//! [`capture`] + [`listener`] (one external process with two capture tasks)
//! → [`registry`] (port-keyed session map and selection).

pub mod capture;
pub mod listener;
pub mod queue;
pub mod registry;

pub use listener::Session;
pub use queue::OutputQueue;
pub use registry::SessionRegistry;
