use std::fmt;

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,6}$").expect("email pattern compiles")
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("First name is empty")]
    EmptyFirstName,
    #[error("Last name is empty")]
    EmptyLastName,
    #[error("\"{0}\" is not a valid email address")]
    InvalidEmail(String),
    #[error("Missing field {0}")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameField {
    First,
    Last,
}

/// A first or last name, trimmed and guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonName(String);

impl PersonName {
    pub fn parse(field: NameField, value: &str) -> Result<Self, ValidationError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(match field {
                NameField::First => ValidationError::EmptyFirstName,
                NameField::Last => ValidationError::EmptyLastName,
            });
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// An email address that matches the whole of `EMAIL_PATTERN`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        if !EMAIL_PATTERN.is_match(value) {
            return Err(ValidationError::InvalidEmail(value.to_string()));
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A person that is valid for persistence.
///
/// `id` and `created_at` are only present once the store has written the
/// record; everything else is checked when the record is built, so there is
/// no way to hold a `PersonRecord` with an empty name or a bad email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRecord {
    id: Option<i64>,
    first_name: PersonName,
    last_name: PersonName,
    email: EmailAddress,
    created_at: Option<NaiveDateTime>,
}

impl PersonRecord {
    pub fn new(first_name: &str, last_name: &str, email: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            id: None,
            first_name: PersonName::parse(NameField::First, first_name)?,
            last_name: PersonName::parse(NameField::Last, last_name)?,
            email: EmailAddress::parse(email)?,
            created_at: None,
        })
    }

    pub(crate) fn with_identity(mut self, id: i64, created_at: Option<NaiveDateTime>) -> Self {
        self.id = Some(id);
        self.created_at = created_at;
        self
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn first_name(&self) -> &str {
        self.first_name.as_str()
    }

    pub fn last_name(&self) -> &str {
        self.last_name.as_str()
    }

    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    pub fn created_at(&self) -> Option<NaiveDateTime> {
        self.created_at
    }
}

impl fmt::Display for PersonRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        if let Some(id) = self.id {
            write!(f, "id={}, ", id)?;
        }
        write!(
            f,
            "firstName=\"{}\", lastName=\"{}\", email=\"{}\"",
            self.first_name(),
            self.last_name(),
            self.email()
        )?;
        if let Some(created_at) = self.created_at {
            write!(f, ", created=\"{}\"", created_at)?;
        }
        f.write_str("}")
    }
}
