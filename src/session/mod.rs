//! Call session orchestration
//!
//! This module provides the per-call [`Session`] that owns:
//! - The streaming connection to the recognition engine
//! - The reply generator and its conversation context
//! - A single-assignment handle to the response-relay connection
//! - The event-filtering state machine between all three
//!
//! plus the process-wide [`SessionRegistry`] the connection handlers use to
//! correlate the two independently-established WebSockets to one call.

mod registry;
mod session;

pub use registry::SessionRegistry;
pub use session::{Session, SessionState};
