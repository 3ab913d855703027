/// Session state definitions for tracking pipeline progress
///
/// A session moves through `Ready → Fetching(n) → Extracting(n) →
/// Delaying(n) → Fetching(n + 1) → … → Done`. Batch numbers are 1-based.
use crate::SiftError;
use std::fmt;

/// Represents the current state of a scraping session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    // ===== Active States =====
    /// Session constructed, no batch popped yet
    Ready,

    /// Batch `n` is being fetched
    Fetching(usize),

    /// Batch `n` responses are being extracted
    Extracting(usize),

    /// Pausing after batch `n` before the next one
    Delaying(usize),

    // ===== Terminal States =====
    /// All batches processed
    Done,

    /// A session failure stopped the remaining batches
    Aborted,
}

impl SessionState {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }

    /// Batch number the state refers to, if any
    pub fn batch(&self) -> Option<usize> {
        match self {
            Self::Fetching(n) | Self::Extracting(n) | Self::Delaying(n) => Some(*n),
            _ => None,
        }
    }

    /// Checks whether moving to `next` is a legal transition
    ///
    /// Any active state may abort. Extraction may finish the session
    /// directly when it was the last batch.
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        match (*self, next) {
            (from, Aborted) => !from.is_terminal(),
            (Ready, Fetching(1)) | (Ready, Done) => true,
            (Fetching(a), Extracting(b)) => a == b,
            (Extracting(a), Delaying(b)) => a == b,
            (Extracting(_), Done) => true,
            (Delaying(a), Fetching(b)) => b == a + 1,
            (Delaying(_), Done) => true,
            _ => false,
        }
    }

    /// Moves to `next`, rejecting illegal transitions
    pub fn transition(self, next: SessionState) -> Result<SessionState, SiftError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(SiftError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Fetching(_) => "fetching",
            Self::Extracting(_) => "extracting",
            Self::Delaying(_) => "delaying",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Ready
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.batch() {
            Some(n) => write!(f, "{}({})", self.as_str(), n),
            None => f.write_str(self.as_str()),
        }
    }
}
