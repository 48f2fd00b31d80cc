//! # Accounts
//!
//! Person records: enrolment, partial updates and password checks.
//!
//! Who may change what is decided by
//! [`authorize_patch`](shelf_core::validation::authorize_patch); this module
//! loads the target, applies the patch and hashes passwords with argon2.

use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use shelf_core::validation::{authorize_patch, validate_limits, validate_name, validate_patch, PersonPatch};
use shelf_core::{Capability, CapabilitySet, Clock, CoreError, Limits, Person, Principal};
use shelf_db::{persons, Database};

use crate::error::{LendingError, LendingResult};

/// Enrolment request for a new person.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewPerson {
    pub name: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub permissions: CapabilitySet,

    #[serde(default)]
    pub limits: Limits,

    /// Plain text; only the hash is stored.
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

/// Person management service.
#[derive(Clone)]
pub struct Accounts {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl Accounts {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Accounts { db, clock }
    }

    /// Enrols a person.
    ///
    /// Requires `manage_users`. Granting anything beyond `borrow` requires
    /// `admin`.
    pub async fn add_person(&self, actor: &Principal, request: NewPerson) -> LendingResult<Person> {
        if !actor.can(Capability::ManageUsers) {
            return Err(CoreError::permission_denied("adding people requires manage_users").into());
        }

        if request.permissions.iter().any(|c| c != Capability::Borrow) && !actor.is_admin() {
            return Err(CoreError::permission_denied(
                "granting capabilities other than borrow requires admin",
            )
            .into());
        }

        validate_name(&request.name)?;
        validate_limits(&request.limits)?;

        // Same shape rules as an update
        validate_patch(&PersonPatch {
            email: request.email.clone(),
            password: request.password.clone(),
            ..PersonPatch::default()
        })?;

        let hash = request.password.as_deref().map(hash_password).transpose()?;

        let person = Person {
            id: Uuid::new_v4().to_string(),
            name: request.name.trim().to_string(),
            email: request.email.map(|e| e.trim().to_string()),
            permissions: request.permissions,
            limits: request.limits,
            created_at: self.clock.now(),
        };

        let mut conn = self.db.acquire().await?;
        persons::insert(&mut conn, &person, hash.as_deref()).await?;

        info!(person_id = %person.id, added_by = %actor.id, "Person added");
        Ok(person)
    }

    pub async fn get_person(&self, person_id: &str) -> LendingResult<Person> {
        let mut conn = self.db.acquire().await?;
        persons::get(&mut conn, person_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Person", person_id).into())
    }

    /// Applies `patch` to a person on behalf of `actor`.
    ///
    /// Every field is checked before anything is written; the update and
    /// any password change commit together.
    pub async fn update_person(
        &self,
        actor: &Principal,
        person_id: &str,
        patch: PersonPatch,
    ) -> LendingResult<Person> {
        validate_patch(&patch)?;

        let hash = patch.password.as_deref().map(hash_password).transpose()?;

        let mut tx = self.db.begin().await?;

        let mut person = persons::get(&mut tx, person_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Person", person_id))?;

        authorize_patch(actor, &person, &patch)?;

        if patch.is_empty() {
            debug!(person_id = %person_id, "Empty patch");
            return Ok(person);
        }

        patch.apply_to(&mut person);
        persons::update(&mut tx, &person).await?;

        if let Some(hash) = &hash {
            persons::set_password_hash(&mut tx, person_id, hash).await?;
        }

        tx.commit().await?;

        info!(
            person_id = %person_id,
            updated_by = %actor.id,
            permissions_changed = patch.permissions.is_some(),
            password_changed = hash.is_some(),
            "Person updated"
        );
        Ok(person)
    }

    /// True when `password` matches the stored hash. A person without a
    /// password never matches.
    pub async fn verify_password(&self, person_id: &str, password: &str) -> LendingResult<bool> {
        let mut conn = self.db.acquire().await?;

        let stored = match persons::password_hash(&mut conn, person_id).await? {
            Some(hash) => hash,
            None => return Ok(false),
        };

        let parsed = match PasswordHash::new(&stored) {
            Ok(h) => h,
            Err(_) => return Ok(false),
        };

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

fn hash_password(password: &str) -> LendingResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| LendingError::Internal(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use shelf_core::ValidationError;

    async fn staff(fx: &Fixture) -> (Principal, Principal) {
        let admin = fx.person("admin", &[Capability::Admin], Limits::default()).await;
        let clerk = fx.person("clerk", &[Capability::ManageUsers], Limits::default()).await;
        (admin.principal(), clerk.principal())
    }

    fn denied(result: LendingResult<Person>) -> bool {
        matches!(result, Err(LendingError::Domain(CoreError::PermissionDenied { .. })))
    }

    #[tokio::test]
    async fn test_add_person() {
        let fx = Fixture::new().await;
        let (admin, clerk) = staff(&fx).await;
        let accounts = fx.accounts();

        let request: NewPerson = serde_json::from_str(
            r#"{"name":"  Ada  ","permissions":["borrow"],"limits":{"books":2,"days":14}}"#,
        )
        .unwrap();
        let ada = accounts.add_person(&clerk, request).await.unwrap();
        assert_eq!(ada.name, "Ada");
        assert_eq!(accounts.get_person(&ada.id).await.unwrap(), ada);

        // Clerks cannot mint staff
        let staffer = NewPerson {
            name: "Desk".into(),
            permissions: [Capability::ManageHolds].into_iter().collect(),
            ..NewPerson::default()
        };
        assert!(denied(accounts.add_person(&clerk, staffer.clone()).await));
        assert!(accounts.add_person(&admin, staffer).await.is_ok());

        // Borrowers cannot add anyone
        let borrower = ada.principal();
        let eve = NewPerson {
            name: "Eve".into(),
            ..NewPerson::default()
        };
        assert!(denied(accounts.add_person(&borrower, eve).await));

        assert!(serde_json::from_str::<NewPerson>(r#"{"name":"x","role":"admin"}"#).is_err());
    }

    #[tokio::test]
    async fn test_update_profile() {
        let fx = Fixture::new().await;
        let (_, clerk) = staff(&fx).await;
        let ada = fx.person("ada", &[Capability::Borrow], Limits::default()).await;
        let bob = fx.person("bob", &[Capability::Borrow], Limits::default()).await;
        let accounts = fx.accounts();

        let patch = PersonPatch {
            name: Some("Ada L.".into()),
            email: Some("ada@example.org".into()),
            ..PersonPatch::default()
        };
        let updated = accounts.update_person(&ada.principal(), "ada", patch.clone()).await.unwrap();
        assert_eq!(updated.name, "Ada L.");
        assert_eq!(accounts.get_person("ada").await.unwrap().email.as_deref(), Some("ada@example.org"));

        assert!(denied(accounts.update_person(&bob.principal(), "ada", patch.clone()).await));
        assert!(accounts.update_person(&clerk, "ada", patch).await.is_ok());

        let limits = PersonPatch {
            limits: Some(Limits { books: Some(1), days: None }),
            ..PersonPatch::default()
        };
        assert!(denied(accounts.update_person(&ada.principal(), "ada", limits.clone()).await));
        let limited = accounts.update_person(&clerk, "ada", limits).await.unwrap();
        assert_eq!(limited.limits.books, Some(1));
    }

    #[tokio::test]
    async fn test_id_is_immutable() {
        let fx = Fixture::new().await;
        let (admin, _) = staff(&fx).await;
        fx.person("ada", &[Capability::Borrow], Limits::default()).await;

        let patch = PersonPatch {
            id: Some("someone-else".into()),
            ..PersonPatch::default()
        };
        let result = fx.accounts().update_person(&admin, "ada", patch).await;
        assert!(matches!(
            result,
            Err(LendingError::Domain(CoreError::ImmutableField { ref field })) if field == "id"
        ));
    }

    #[tokio::test]
    async fn test_permission_changes() {
        let fx = Fixture::new().await;
        let (admin, clerk) = staff(&fx).await;
        fx.person("ada", &[Capability::Borrow], Limits::default()).await;
        let accounts = fx.accounts();

        let promote = PersonPatch {
            permissions: Some([Capability::Borrow, Capability::ManageHolds].into_iter().collect()),
            ..PersonPatch::default()
        };
        assert!(denied(accounts.update_person(&clerk, "ada", promote.clone()).await));

        let promoted = accounts.update_person(&admin, "ada", promote).await.unwrap();
        assert!(promoted.permissions.allows(Capability::ManageHolds));

        // Only an admin touches an admin's permissions, and never their own admin bit
        let demote_admin = PersonPatch {
            permissions: Some(CapabilitySet::new()),
            ..PersonPatch::default()
        };
        assert!(denied(accounts.update_person(&clerk, "admin", demote_admin.clone()).await));
        assert!(denied(accounts.update_person(&admin, "admin", demote_admin).await));

        let still_admin = accounts.get_person("admin").await.unwrap();
        assert!(still_admin.permissions.is_admin());
    }

    #[tokio::test]
    async fn test_password_change() {
        let fx = Fixture::new().await;
        let (admin, clerk) = staff(&fx).await;
        let ada = fx.person("ada", &[Capability::Borrow], Limits::default()).await;
        let accounts = fx.accounts();

        assert!(!accounts.verify_password("ada", "correct horse").await.unwrap());

        let patch = PersonPatch {
            password: Some("correct horse".into()),
            ..PersonPatch::default()
        };
        accounts.update_person(&ada.principal(), "ada", patch.clone()).await.unwrap();
        assert!(accounts.verify_password("ada", "correct horse").await.unwrap());
        assert!(!accounts.verify_password("ada", "wrong horse").await.unwrap());

        // manage_users is not enough for someone else's password
        assert!(denied(accounts.update_person(&clerk, "ada", patch.clone()).await));
        assert!(accounts.update_person(&admin, "ada", patch).await.is_ok());

        let short = PersonPatch {
            password: Some("short".into()),
            ..PersonPatch::default()
        };
        let result = accounts.update_person(&ada.principal(), "ada", short).await;
        assert!(matches!(
            result,
            Err(LendingError::Domain(CoreError::Validation(ValidationError::OutOfRange { .. })))
        ));
    }

    #[tokio::test]
    async fn test_update_missing_person() {
        let fx = Fixture::new().await;
        let (admin, _) = staff(&fx).await;

        let result = fx.accounts().update_person(&admin, "ghost", PersonPatch::default()).await;
        assert!(matches!(result, Err(LendingError::Domain(CoreError::NotFound { .. }))));
    }
}
