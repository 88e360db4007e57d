//! Feed Client
//!
//! Native client for the real-time feed, built around a per-connection
//! session state machine with bounded local history and capped
//! exponential reconnect backoff.

mod session;

pub use session::{FeedSession, FeedUpdate, SessionConfig, SessionError, SessionState};
