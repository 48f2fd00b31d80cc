//! # Error Types
//!
//! Domain-specific error types for shelf-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  shelf-core errors (this file)                                         │
//! │  ├── IsbnError        - Identifier parsing/validation failures         │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── CoreError        - Domain rule denials (wraps the two above)      │
//! │                                                                         │
//! │  shelf-db errors (separate crate)                                      │
//! │  └── DbError          - Store failures, commit conflicts               │
//! │                                                                         │
//! │  shelf-lending errors                                                  │
//! │  └── LendingError     - What callers see: Domain | Conflict | Store    │
//! │                                                                         │
//! │  Flow: IsbnError/ValidationError → CoreError → LendingError            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Domain errors are never retried automatically. They carry enough
//! context (ids, limits, offending input) for the caller to fix the request.

use thiserror::Error;

// =============================================================================
// ISBN Error
// =============================================================================

/// Failures raised by the ISBN codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IsbnError {
    /// Wrong digit count, misplaced `X`, or digits that fall outside every
    /// group/registrant band.
    #[error("Malformed ISBN '{input}': {reason}")]
    Format { input: String, reason: String },

    /// A 13-digit form whose first three digits are neither 978 nor 979.
    #[error("Invalid ISBN prefix '{prefix}': must be 978 or 979")]
    InvalidPrefix { prefix: String },

    /// The check digit does not satisfy the weighted checksum.
    #[error("ISBN checksum mismatch for '{input}'")]
    Checksum { input: String },

    /// The registration group is well-formed but not assigned to any region.
    #[error("Registration group {group} is not assigned to a region")]
    InvalidRegion { group: String },
}

impl IsbnError {
    pub(crate) fn format(input: &str, reason: impl Into<String>) -> Self {
        IsbnError::Format {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any business rule runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., invalid UUID, unknown capability token).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Denial Reasons
// =============================================================================

/// Why a checkout was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutDenial {
    /// The copy already has an open checkout.
    #[error("copy {copy_id} is already checked out")]
    AlreadyOut { copy_id: String },

    /// The borrower is at their concurrent-loan limit.
    #[error("person {person_id} has reached the limit of {limit} open checkouts")]
    LimitReached { person_id: String, limit: u32 },
}

/// Why a hold was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HoldDenial {
    /// The person currently holds a copy of this ISBN.
    #[error("person {person_id} already has {isbn} checked out")]
    AlreadyCheckedOut { person_id: String, isbn: String },

    /// The person already has a pending hold for this ISBN.
    #[error("person {person_id} already has a pending hold on {isbn}")]
    AlreadyOnHold { person_id: String, isbn: String },
}

// =============================================================================
// Core Error
// =============================================================================

/// Domain rule violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Copy, person, hold, or checkout does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The acting principal lacks the capability for the operation.
    #[error("Permission denied: {reason}")]
    PermissionDenied { reason: String },

    /// Checkout refused by a circulation rule.
    #[error("Checkout denied: {0}")]
    CheckoutDenied(CheckoutDenial),

    /// Hold refused by a queue rule.
    #[error("Hold denied: {0}")]
    HoldDenied(HoldDenial),

    /// Return attempted for a copy with no open checkout.
    #[error("Copy {copy_id} is not checked out")]
    NotCheckedOut { copy_id: String },

    /// An update tried to change a field that never changes.
    #[error("{field} cannot be changed")]
    ImmutableField { field: String },

    /// Identifier codec failure.
    #[error("Invalid ISBN: {0}")]
    Isbn(#[from] IsbnError),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a PermissionDenied error.
    pub fn permission_denied(reason: impl Into<String>) -> Self {
        CoreError::PermissionDenied {
            reason: reason.into(),
        }
    }
}

impl From<CheckoutDenial> for CoreError {
    fn from(denial: CheckoutDenial) -> Self {
        CoreError::CheckoutDenied(denial)
    }
}

impl From<HoldDenial> for CoreError {
    fn from(denial: HoldDenial) -> Self {
        CoreError::HoldDenied(denial)
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::from(CheckoutDenial::LimitReached {
            person_id: "p-1".to_string(),
            limit: 3,
        });
        assert_eq!(
            err.to_string(),
            "Checkout denied: person p-1 has reached the limit of 3 open checkouts"
        );

        let err = IsbnError::InvalidPrefix {
            prefix: "977".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid ISBN prefix '977': must be 978 or 979");
    }

    #[test]
    fn test_isbn_error_converts_to_core_error() {
        let core_err: CoreError = IsbnError::Checksum {
            input: "0306406153".to_string(),
        }
        .into();
        assert!(matches!(core_err, CoreError::Isbn(IsbnError::Checksum { .. })));
    }
}
