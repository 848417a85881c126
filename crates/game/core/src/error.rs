//! Common error infrastructure for game-core.
//!
//! Domain-specific errors (`PlaceError`, `RegistryError`) live next to the
//! engine operations that produce them. This module provides the shared
//! classification every one of them implements, so callers can tell a
//! transient rejection ("not allowed right now") from a structural one
//! ("unknown player") without matching on individual variants.

/// Severity level of an error, used for categorization and recovery strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Expected, temporary condition. The same request may succeed later.
    ///
    /// Examples: action cooldown, round not running, no bits left
    Recoverable,

    /// Invalid input, should not retry without changes.
    ///
    /// Examples: unknown player, unknown team, coordinates off the grid
    Validation,

    /// Unexpected state inconsistency. Indicates a bug.
    Internal,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
        }
    }

    /// Returns true if this error is potentially recoverable.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    /// Returns true if this error indicates an internal bug.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal)
    }
}

/// Common trait for all game-core errors.
///
/// # Implementation Guidelines
///
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity based on recoverability, not impact
pub trait GameError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    ///
    /// Used as a stable code by transports and in logs.
    fn error_code(&self) -> &'static str;
}
