//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     close() → set closed flag → wake accept loop → drop listener
//!     in-flight connections run to completion
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → binary calls close()
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
