//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, connection limit)
//!     → connection.rs (connection ID, live connection count)
//!     → Hand off to the HTTP layer
//! ```

pub mod connection;
pub mod listener;
