//! Contact person domain model.
//!
//! # Responsibility
//! - Define the address-book record persisted in `ContactPerson`.
//! - Own the single derived-field rule (`mail` from `name`).
//!
//! # Invariants
//! - `id` is `None` until the store assigns one on insert.
//! - Once assigned, `id` never changes.
//! - `name` is required and must not be blank.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned row identifier.
pub type ContactId = i64;

/// Mail domain used by the bulk mail derivation.
pub const DERIVED_MAIL_DOMAIN: &str = "edu.eg";

/// One address-book entry.
///
/// Field names serialize with the column naming of the `ContactPerson`
/// table (`homePhone`, `workPhone`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    /// Assigned by the store; `None` for an entity not yet persisted.
    pub id: Option<ContactId>,
    pub name: String,
    pub nickname: Option<String>,
    pub address: Option<String>,
    pub home_phone: Option<String>,
    pub work_phone: Option<String>,
    pub cellphone: Option<String>,
    pub mail: Option<String>,
    /// Calendar date only; there is no time-of-day component to lose.
    pub birthdate: Option<NaiveDate>,
    pub website: Option<String>,
    pub profession: Option<String>,
}

impl Contact {
    /// Creates an unpersisted contact with every optional field unset.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            nickname: None,
            address: None,
            home_phone: None,
            work_phone: None,
            cellphone: None,
            mail: None,
            birthdate: None,
            website: None,
            profession: None,
        }
    }

    /// Returns whether the store has assigned an identity to this contact.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Validates field-level invariants.
    ///
    /// # Errors
    /// - `EmptyName` when `name` is empty or whitespace only.
    pub fn validate(&self) -> Result<(), ContactValidationError> {
        if self.name.trim().is_empty() {
            return Err(ContactValidationError::EmptyName);
        }
        Ok(())
    }

    /// Validates a contact about to be inserted.
    ///
    /// On top of [`Contact::validate`], rejects contacts that already carry
    /// an id: identity is assigned by the store only.
    pub fn validate_for_insert(&self) -> Result<(), ContactValidationError> {
        self.validate()?;
        if let Some(id) = self.id {
            return Err(ContactValidationError::AlreadyPersisted(id));
        }
        Ok(())
    }
}

/// Derives the institutional mail address for a contact name.
///
/// Every space becomes `_`; nothing else is normalized.
pub fn derive_mail(name: &str) -> String {
    format!("{}@{DERIVED_MAIL_DOMAIN}", name.replace(' ', "_"))
}

/// Validation failures for contact write paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactValidationError {
    EmptyName,
    AlreadyPersisted(ContactId),
}

impl Display for ContactValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "contact name must not be empty"),
            Self::AlreadyPersisted(id) => {
                write!(f, "contact already has store-assigned id {id}")
            }
        }
    }
}

impl Error for ContactValidationError {}

#[cfg(test)]
mod tests {
    use super::{derive_mail, Contact, ContactValidationError};

    #[test]
    fn derive_mail_replaces_every_space() {
        assert_eq!(derive_mail("Ahmed Ali"), "Ahmed_Ali@edu.eg");
        assert_eq!(derive_mail("Abd El Rahman"), "Abd_El_Rahman@edu.eg");
        assert_eq!(derive_mail("Mona"), "Mona@edu.eg");
    }

    #[test]
    fn derive_mail_keeps_leading_and_trailing_spaces_as_underscores() {
        assert_eq!(derive_mail(" Omar "), "_Omar_@edu.eg");
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = Contact::new("   ").validate().unwrap_err();
        assert_eq!(err, ContactValidationError::EmptyName);
    }

    #[test]
    fn insert_validation_rejects_assigned_id() {
        let mut contact = Contact::new("Ahmed Ali");
        assert!(contact.validate_for_insert().is_ok());

        contact.id = Some(7);
        let err = contact.validate_for_insert().unwrap_err();
        assert_eq!(err, ContactValidationError::AlreadyPersisted(7));
        assert!(contact.is_persisted());
    }
}
