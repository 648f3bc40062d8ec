//! Observability subsystem.
//!
//! Every subsystem emits `tracing` events with structured fields
//! (`connection_id`, `peer_addr`, `error`); `logging.rs` installs the
//! subscriber that formats them.

pub mod logging;

pub use logging::init_logging;
