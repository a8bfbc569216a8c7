//! Session lifecycle state.

use crate::error::{CoreError, CoreResult};

/// State of a session.
///
/// ```text
/// Inactive --begin--> Active --commit/close--> Closed
///     \_______________close_______________/
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created; reads are allowed, writes need [`crate::Session::begin`].
    Inactive,
    /// A transaction is active and writes are accepted.
    Active,
    /// Closed; every operation fails with [`CoreError::SessionClosed`].
    Closed,
}

impl SessionState {
    /// Fails if the session is closed.
    pub(crate) fn ensure_open(self) -> CoreResult<()> {
        match self {
            SessionState::Closed => Err(CoreError::SessionClosed),
            _ => Ok(()),
        }
    }

    /// Fails unless a transaction is active.
    pub(crate) fn ensure_active(self, operation: &'static str) -> CoreResult<()> {
        match self {
            SessionState::Active => Ok(()),
            SessionState::Inactive => Err(CoreError::TransactionRequired { operation }),
            SessionState::Closed => Err(CoreError::SessionClosed),
        }
    }
}
