//! Database models for companies.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use xm_core::companies::Company;

/// Database model for companies
#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::companies)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CompanyDB {
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

/// Partial update of a company row. `None` fields keep their stored value.
#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::companies)]
pub struct CompanyChangesetDB {
    pub name: Option<String>,
    pub code: Option<String>,
    pub country: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub deleted_at: Option<NaiveDateTime>,
    pub updated_at: NaiveDateTime,
}

fn present(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl From<CompanyDB> for Company {
    fn from(db: CompanyDB) -> Self {
        Self {
            id: db.id,
            name: db.name,
            code: db.code,
            country: db.country,
            website: db.website,
            phone: db.phone,
            created_at: db.created_at,
            updated_at: db.updated_at,
            deleted_at: db.deleted_at,
        }
    }
}

impl From<&Company> for CompanyDB {
    fn from(domain: &Company) -> Self {
        Self {
            id: domain.id.clone(),
            name: domain.name.clone(),
            code: domain.code.clone(),
            country: domain.country.clone(),
            website: domain.website.clone(),
            phone: domain.phone.clone(),
            created_at: domain.created_at,
            updated_at: domain.updated_at,
            deleted_at: domain.deleted_at,
        }
    }
}

impl CompanyChangesetDB {
    /// Builds the merge changeset for `domain`, stamped with `now`.
    pub fn merge(domain: &Company, now: NaiveDateTime) -> Self {
        Self {
            name: present(&domain.name),
            code: present(&domain.code),
            country: present(&domain.country),
            website: present(&domain.website),
            phone: present(&domain.phone),
            deleted_at: domain.deleted_at,
            updated_at: now,
        }
    }
}
