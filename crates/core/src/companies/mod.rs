//! Companies module - domain models and validation.

mod companies_model;

pub use companies_model::{Company, CompanyFilter, CompanyInput};
