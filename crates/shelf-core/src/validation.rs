//! # Validation Module
//!
//! Input validation and person-update rules.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Deserialization (serde)                                      │
//! │  ├── PersonPatch rejects unknown keys (deny_unknown_fields)            │
//! │  └── Capability tokens must be known                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Shape checks (non-empty name, positive limits, loan length)       │
//! │  └── Per-field mutability rules for person updates                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── Partial UNIQUE indexes (one open loan per copy, one pending hold) │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use shelf_core::validation::{validate_loan_length, PersonPatch};
//!
//! validate_loan_length(14).unwrap();
//! assert!(validate_loan_length(0).is_err());
//!
//! // Unknown keys are refused outright
//! assert!(serde_json::from_str::<PersonPatch>(r#"{"nickname":"x"}"#).is_err());
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Capability, CapabilitySet, Limits, Person, Principal};
use crate::{MAX_LOAN_DAYS, MAX_PENALTY_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Shortest accepted password.
pub const MIN_PASSWORD_LEN: usize = 8;

// =============================================================================
// Loan Inputs
// =============================================================================

/// Validates a requested loan length in days.
///
/// ## Rules
/// - Must be at least 1
/// - Must not exceed [`MAX_LOAN_DAYS`]
pub fn validate_loan_length(days: u32) -> ValidationResult<()> {
    if days == 0 {
        return Err(ValidationError::MustBePositive {
            field: "length_days".to_string(),
        });
    }
    if days > MAX_LOAN_DAYS {
        return Err(ValidationError::OutOfRange {
            field: "length_days".to_string(),
            min: 1,
            max: i64::from(MAX_LOAN_DAYS),
        });
    }
    Ok(())
}

/// Validates a per-day penalty rate in whole cents.
///
/// Zero is allowed (fine-free loan). The upper bound keeps
/// rate × overdue days inside `i64` for any representable return date.
pub fn validate_penalty_rate(rate: Money) -> ValidationResult<()> {
    if !(0..=MAX_PENALTY_CENTS).contains(&rate.cents()) {
        return Err(ValidationError::OutOfRange {
            field: "penalty_rate".to_string(),
            min: 0,
            max: MAX_PENALTY_CENTS,
        });
    }
    Ok(())
}

/// Validates a person's display name.
pub fn validate_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::OutOfRange {
            field: "name".to_string(),
            min: 1,
            max: 200,
        });
    }

    Ok(())
}

/// Validates limits: when set, each must be at least 1.
pub fn validate_limits(limits: &Limits) -> ValidationResult<()> {
    if limits.books == Some(0) {
        return Err(ValidationError::MustBePositive {
            field: "limits.books".to_string(),
        });
    }
    if let Some(days) = limits.days {
        validate_loan_length(days).map_err(|err| match err {
            ValidationError::MustBePositive { .. } => ValidationError::MustBePositive {
                field: "limits.days".to_string(),
            },
            _ => ValidationError::OutOfRange {
                field: "limits.days".to_string(),
                min: 1,
                max: i64::from(MAX_LOAN_DAYS),
            },
        })?;
    }
    Ok(())
}

/// Validates that an ID string is a valid UUID.
///
/// ## Example
/// ```rust
/// use shelf_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Person Patch
// =============================================================================

/// A partial update to a person record.
///
/// Only the fields listed here can be sent; anything else fails to
/// deserialize. `id` is accepted so that a client echoing the record back
/// gets a clear `ImmutableField` error instead of a parse error when it
/// tries to change it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersonPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<CapabilitySet>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<Limits>,

    /// Plain text; hashed before it reaches the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl PersonPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.permissions.is_none()
            && self.limits.is_none()
            && self.password.is_none()
    }

    /// Applies the non-secret fields to `person`. The password is left to
    /// the caller, which owns hashing.
    pub fn apply_to(&self, person: &mut Person) {
        if let Some(name) = &self.name {
            person.name = name.trim().to_string();
        }
        if let Some(email) = &self.email {
            person.email = Some(email.trim().to_string());
        }
        if let Some(permissions) = &self.permissions {
            person.permissions = permissions.clone();
        }
        if let Some(limits) = self.limits {
            person.limits = limits;
        }
    }
}

/// Checks the shape of every field present in the patch.
pub fn validate_patch(patch: &PersonPatch) -> ValidationResult<()> {
    if let Some(name) = &patch.name {
        validate_name(name)?;
    }
    if let Some(email) = &patch.email {
        if !email.contains('@') {
            return Err(ValidationError::InvalidFormat {
                field: "email".to_string(),
                reason: "must contain '@'".to_string(),
            });
        }
    }
    if let Some(limits) = &patch.limits {
        validate_limits(limits)?;
    }
    if let Some(password) = &patch.password {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::OutOfRange {
                field: "password".to_string(),
                min: MIN_PASSWORD_LEN as i64,
                max: 1024,
            });
        }
    }
    Ok(())
}

/// Decides whether `actor` may apply `patch` to `target`.
///
/// ## Rules
/// | Field         | Who may change it                                   |
/// |---------------|-----------------------------------------------------|
/// | `id`          | nobody                                              |
/// | `name/email`  | the person themselves, or `manage_users`            |
/// | `limits`      | `manage_users`                                      |
/// | `permissions` | `admin` only; nobody may drop their own admin token |
/// | `password`    | the person themselves, or `admin`                   |
pub fn authorize_patch(actor: &Principal, target: &Person, patch: &PersonPatch) -> CoreResult<()> {
    if let Some(id) = &patch.id {
        if id != &target.id {
            return Err(CoreError::ImmutableField {
                field: "id".to_string(),
            });
        }
    }

    let is_self = actor.id == target.id;

    if (patch.name.is_some() || patch.email.is_some())
        && !is_self
        && !actor.can(Capability::ManageUsers)
    {
        return Err(CoreError::permission_denied(
            "changing another person's profile requires manage_users",
        ));
    }

    if patch.limits.is_some() && !actor.can(Capability::ManageUsers) {
        return Err(CoreError::permission_denied(
            "changing limits requires manage_users",
        ));
    }

    if let Some(permissions) = &patch.permissions {
        if !actor.is_admin() {
            let reason = if target.permissions.is_admin() {
                "only an admin may change an admin's permissions"
            } else {
                "changing permissions requires admin"
            };
            return Err(CoreError::permission_denied(reason));
        }
        if is_self && !permissions.is_admin() {
            return Err(CoreError::permission_denied(
                "cannot remove your own admin status",
            ));
        }
    }

    if patch.password.is_some() && !is_self && !actor.is_admin() {
        return Err(CoreError::permission_denied(
            "changing another person's password requires admin",
        ));
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn person(id: &str, caps: &[Capability]) -> Person {
        Person {
            id: id.to_string(),
            name: format!("Person {}", id),
            email: None,
            permissions: caps.iter().copied().collect(),
            limits: Limits::default(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_validate_loan_length() {
        assert!(validate_loan_length(1).is_ok());
        assert!(validate_loan_length(90).is_ok());
        assert!(validate_loan_length(MAX_LOAN_DAYS).is_ok());
        assert!(matches!(
            validate_loan_length(0),
            Err(ValidationError::MustBePositive { .. })
        ));
        assert!(matches!(
            validate_loan_length(u32::MAX),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_validate_penalty_rate() {
        assert!(validate_penalty_rate(Money::zero()).is_ok());
        assert!(validate_penalty_rate(Money::from_cents(100)).is_ok());
        assert!(validate_penalty_rate(Money::from_cents(MAX_PENALTY_CENTS)).is_ok());
        assert!(validate_penalty_rate(Money::from_cents(-1)).is_err());
        assert!(matches!(
            validate_penalty_rate(Money::from_cents(i64::MAX / 2)),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("123").is_err());
    }

    #[test]
    fn test_patch_rejects_unknown_fields() {
        let ok: PersonPatch = serde_json::from_str(r#"{"name":"Ada"}"#).unwrap();
        assert_eq!(ok.name.as_deref(), Some("Ada"));

        assert!(serde_json::from_str::<PersonPatch>(r#"{"name":"Ada","role":"x"}"#).is_err());
        assert!(serde_json::from_str::<PersonPatch>(r#"{"permissions":["wizard"]}"#).is_err());
    }

    #[test]
    fn test_validate_patch_shapes() {
        let patch = PersonPatch {
            name: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(validate_patch(&patch).is_err());

        let patch = PersonPatch {
            password: Some("short".to_string()),
            ..Default::default()
        };
        assert!(validate_patch(&patch).is_err());

        let patch = PersonPatch {
            limits: Some(Limits { books: Some(0), days: None }),
            ..Default::default()
        };
        assert!(validate_patch(&patch).is_err());
    }

    #[test]
    fn test_id_is_immutable() {
        let target = person("p-1", &[Capability::Borrow]);
        let admin = person("a-1", &[Capability::Admin]).principal();

        let same = PersonPatch { id: Some("p-1".to_string()), ..Default::default() };
        assert!(authorize_patch(&admin, &target, &same).is_ok());

        let changed = PersonPatch { id: Some("p-2".to_string()), ..Default::default() };
        assert!(matches!(
            authorize_patch(&admin, &target, &changed),
            Err(CoreError::ImmutableField { .. })
        ));
    }

    #[test]
    fn test_permission_changes_need_admin() {
        let target = person("p-1", &[Capability::Borrow]);
        let manager = person("m-1", &[Capability::ManageUsers]).principal();
        let admin = person("a-1", &[Capability::Admin]).principal();

        let patch = PersonPatch {
            permissions: Some([Capability::Borrow, Capability::ManageHolds].into_iter().collect()),
            ..Default::default()
        };
        assert!(matches!(
            authorize_patch(&manager, &target, &patch),
            Err(CoreError::PermissionDenied { .. })
        ));
        assert!(authorize_patch(&admin, &target, &patch).is_ok());

        // Self-promotion is still a permissions change
        let self_actor = target.principal();
        assert!(authorize_patch(&self_actor, &target, &patch).is_err());
    }

    #[test]
    fn test_admin_permissions_guarded() {
        let other_admin = person("a-2", &[Capability::Admin]);
        let manager = person("m-1", &[Capability::ManageUsers]).principal();
        let admin = person("a-1", &[Capability::Admin]).principal();

        let demote = PersonPatch {
            permissions: Some([Capability::Borrow].into_iter().collect()),
            ..Default::default()
        };
        assert!(authorize_patch(&manager, &other_admin, &demote).is_err());
        assert!(authorize_patch(&admin, &other_admin, &demote).is_ok());

        // Nobody may remove their own admin token
        let me = person("a-1", &[Capability::Admin]);
        assert!(matches!(
            authorize_patch(&admin, &me, &demote),
            Err(CoreError::PermissionDenied { .. })
        ));

        let keep = PersonPatch {
            permissions: Some([Capability::Admin, Capability::Borrow].into_iter().collect()),
            ..Default::default()
        };
        assert!(authorize_patch(&admin, &me, &keep).is_ok());
    }

    #[test]
    fn test_password_self_or_admin() {
        let target = person("p-1", &[Capability::Borrow]);
        let patch = PersonPatch {
            password: Some("correct horse".to_string()),
            ..Default::default()
        };

        assert!(authorize_patch(&target.principal(), &target, &patch).is_ok());
        assert!(authorize_patch(&person("a-1", &[Capability::Admin]).principal(), &target, &patch).is_ok());

        let manager = person("m-1", &[Capability::ManageUsers]).principal();
        assert!(authorize_patch(&manager, &target, &patch).is_err());
    }

    #[test]
    fn test_profile_and_limits() {
        let target = person("p-1", &[Capability::Borrow]);
        let stranger = person("p-2", &[Capability::Borrow]).principal();
        let manager = person("m-1", &[Capability::ManageUsers]).principal();

        let rename = PersonPatch { name: Some("New".to_string()), ..Default::default() };
        assert!(authorize_patch(&target.principal(), &target, &rename).is_ok());
        assert!(authorize_patch(&stranger, &target, &rename).is_err());
        assert!(authorize_patch(&manager, &target, &rename).is_ok());

        let limits = PersonPatch {
            limits: Some(Limits { books: Some(10), days: None }),
            ..Default::default()
        };
        assert!(authorize_patch(&target.principal(), &target, &limits).is_err());
        assert!(authorize_patch(&manager, &target, &limits).is_ok());
    }

    #[test]
    fn test_apply_to() {
        let mut target = person("p-1", &[Capability::Borrow]);
        let patch = PersonPatch {
            name: Some(" Grace ".to_string()),
            limits: Some(Limits { books: Some(2), days: Some(14) }),
            ..Default::default()
        };
        patch.apply_to(&mut target);
        assert_eq!(target.name, "Grace");
        assert_eq!(target.limits.books, Some(2));
    }
}
