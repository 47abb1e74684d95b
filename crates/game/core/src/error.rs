//! Common error infrastructure for vtt-core.
//!
//! Domain-specific errors (`WireError`, `SkillError`, `ScriptError`,
//! `ContentError`) are defined next to the code that produces them. This module
//! provides the shared classification used by callers to pick a recovery
//! strategy:
//!
//! - content errors skip a single compendium entry
//! - deserialization errors are fatal for the message or connection
//! - logic errors (dangling references) are "not found" and short-circuit

/// Severity level of an error, used for categorization and recovery strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorSeverity {
    /// Recoverable error - the request can be retried later or differently.
    ///
    /// Examples: skill on cooldown, layer occupied
    Recoverable,

    /// Validation error - invalid input, should not retry without changes.
    ///
    /// Examples: argument type mismatch, malformed content entry
    Validation,

    /// Internal error - unexpected state inconsistency.
    ///
    /// Examples: scripted hook exceeded its budget
    Internal,

    /// Fatal error - the stream or connection cannot continue.
    ///
    /// Examples: unknown wire type name, truncated record
    Fatal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    /// Returns true if this error is potentially recoverable.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    /// Returns true if this error indicates a bug or a corrupted stream.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Common trait for all vtt-core errors.
///
/// # Implementation Guidelines
///
/// - All error enums should implement this trait
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity based on recoverability, not impact
pub trait GameError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    ///
    /// Useful for error categorization, metrics, and testing.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}
