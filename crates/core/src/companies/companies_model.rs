//! Companies domain models and validation.

use std::sync::LazyLock;

use chrono::{NaiveDateTime, Utc};
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::constants::{ERROR_CODE_INVALID_VALUE, ERROR_CODE_REQUIRED};
use crate::entity::Entity;
use crate::errors::{Result, ValidationError};

/// International phone numbers with optional country code, separators and extension.
static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?:\(?(?:00|\+)([1-4]\d\d|[1-9]\d?)\)?)?[-. \\/]?)?((?:\(?\d+\)?[-. \\/]?)*)(?:[-. \\/]?(?:#|ext\.?|extension|x)[-. \\/]?(\d+))?$",
    )
    .expect("phone pattern is a valid regex")
});

/// Domain model representing a registered company
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: String,
    pub name: String,
    pub code: String,
    pub country: String,
    pub website: String,
    pub phone: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

/// User-supplied company fields, used for both creation and update
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub phone: String,
}

/// Equality filters accepted when listing companies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompanyFilter {
    Name(String),
    Code(String),
    Country(String),
    Website(String),
    Phone(String),
}

impl Company {
    /// Validates the input and builds a company with a fresh identifier.
    pub fn new(input: CompanyInput) -> Result<Self> {
        input.validate()?;

        let now = Utc::now().naive_utc();
        Ok(Company {
            id: Uuid::new_v4().to_string(),
            name: input.name,
            code: input.code,
            country: input.country,
            website: input.website,
            phone: input.phone,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    /// Validates the input and replaces the domain fields. Identifier and
    /// timestamps are left to the repository.
    pub fn apply(&mut self, input: CompanyInput) -> Result<()> {
        input.validate()?;

        self.name = input.name;
        self.code = input.code;
        self.country = input.country;
        self.website = input.website;
        self.phone = input.phone;
        Ok(())
    }
}

impl Entity for Company {
    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> NaiveDateTime {
        self.created_at
    }

    fn updated_at(&self) -> NaiveDateTime {
        self.updated_at
    }

    fn deleted_at(&self) -> Option<NaiveDateTime> {
        self.deleted_at
    }
}

impl CompanyInput {
    /// Checks the fields in declaration order and reports the first failure.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        let failure = if self.name.is_empty() {
            Some(("name", ERROR_CODE_REQUIRED))
        } else if self.code.is_empty() {
            Some(("code", ERROR_CODE_REQUIRED))
        } else if self.country.is_empty() {
            Some(("country", ERROR_CODE_REQUIRED))
        } else if !is_request_uri(&self.website) {
            Some(("website", ERROR_CODE_INVALID_VALUE))
        } else if !PHONE_PATTERN.is_match(&self.phone) {
            Some(("phone", ERROR_CODE_INVALID_VALUE))
        } else {
            None
        };

        match failure {
            Some((field, code)) => {
                debug!("Company validation failed on '{}': {}", field, code);
                Err(ValidationError::invalid_field(field, code))
            }
            None => Ok(()),
        }
    }
}

impl CompanyFilter {
    pub fn value(&self) -> &str {
        match self {
            CompanyFilter::Name(v)
            | CompanyFilter::Code(v)
            | CompanyFilter::Country(v)
            | CompanyFilter::Website(v)
            | CompanyFilter::Phone(v) => v,
        }
    }
}

/// Absolute URL, or an absolute path as accepted in an HTTP request line.
fn is_request_uri(value: &str) -> bool {
    if value.starts_with('/') {
        return !value.chars().any(char::is_whitespace);
    }
    Url::parse(value).is_ok()
}
