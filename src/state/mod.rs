//! State module for tracking session progress
//!
//! This module provides the state machine a scraping session moves through
//! while it fetches, extracts and paces batches.

mod session_state;

// Re-export main types
pub use session_state::SessionState;
