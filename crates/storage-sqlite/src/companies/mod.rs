//! SQLite storage implementation for companies.

mod model;
mod repository;

pub use model::{CompanyChangesetDB, CompanyDB};
pub use repository::{
    condition_for, filter_by, order_by_name, CompanyCondition, CompanyQuery, CompanyRepository,
};
