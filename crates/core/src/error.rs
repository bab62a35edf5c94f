//! Error types shared by the validation and reconciliation code.

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while validating input or planning mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// The caller supplied an invalid value.
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// The named logical object does not exist.
    #[error("{kind} {name} not found")]
    NotFound { kind: &'static str, name: String },

    /// A logical object with the same identity already exists.
    #[error("{kind} {name} already exists")]
    AlreadyExists { kind: &'static str, name: String },

    /// The desired state collides with something already configured.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A managed remote object could not be decoded.
    #[error("Failed to decode {kind} {name}: {reason}")]
    Decode {
        kind: &'static str,
        name: String,
        reason: String,
    },
}

impl CoreError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Whether the error was caused by the caller's input rather than remote state.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}
