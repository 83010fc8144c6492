//! Error types for voxview-state.

use std::fmt;

use thiserror::Error;

/// Result type for viewer state operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Which registry an untracked entity was looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A [`Source`](crate::Source)
    Source,
    /// A [`SourceGroup`](crate::SourceGroup)
    Group,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Source => f.write_str("source"),
            EntityKind::Group => f.write_str("group"),
        }
    }
}

/// Errors that can occur when mutating viewer state.
///
/// All of these are contract violations by the caller. None of them are
/// transient, so nothing in this crate retries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The referenced source or group is not registered with the state.
    #[error("{kind} '{name}' is not tracked by this viewer state")]
    NotTracked { kind: EntityKind, name: String },

    /// A mutation was attempted through a read-only view.
    #[error("'{operation}' is not supported on a read-only viewer state")]
    UnsupportedMutation { operation: &'static str },

    /// A change listener tried to mutate the state that is notifying it.
    #[error("viewer state mutated from inside one of its own change listeners")]
    ReentrantMutation,
}

impl Error {
    /// Creates a not-tracked error for a source.
    pub fn source_not_tracked(name: impl fmt::Display) -> Self {
        Self::NotTracked {
            kind: EntityKind::Source,
            name: name.to_string(),
        }
    }

    /// Creates a not-tracked error for a group.
    pub fn group_not_tracked(name: impl fmt::Display) -> Self {
        Self::NotTracked {
            kind: EntityKind::Group,
            name: name.to_string(),
        }
    }

    /// Creates an unsupported-mutation error naming the rejected operation.
    pub fn unsupported(operation: &'static str) -> Self {
        Self::UnsupportedMutation { operation }
    }
}
