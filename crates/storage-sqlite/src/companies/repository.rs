use chrono::Utc;
use diesel::prelude::*;
use diesel::sql_types::Bool;
use diesel::sqlite::Sqlite;

use xm_core::companies::{Company, CompanyFilter};
use xm_core::Result;

use super::model::{CompanyChangesetDB, CompanyDB};
use crate::db::UnitOfWork;
use crate::errors::IntoCore;
use crate::repository::{apply_processors, QueryProcessor, Repository};
use crate::schema::companies;

/// Boxed `SELECT` over the companies table.
pub type CompanyQuery = companies::BoxedQuery<'static, Sqlite>;

/// Boxed predicate over the companies table.
pub type CompanyCondition = Box<dyn BoxableExpression<companies::table, Sqlite, SqlType = Bool>>;

/// Equality predicate for a single filter.
pub fn condition_for(filter: CompanyFilter) -> CompanyCondition {
    match filter {
        CompanyFilter::Name(value) => Box::new(companies::name.eq(value)),
        CompanyFilter::Code(value) => Box::new(companies::code.eq(value)),
        CompanyFilter::Country(value) => Box::new(companies::country.eq(value)),
        CompanyFilter::Website(value) => Box::new(companies::website.eq(value)),
        CompanyFilter::Phone(value) => Box::new(companies::phone.eq(value)),
    }
}

/// Processor that narrows a listing to rows matching `filter`.
pub fn filter_by(filter: CompanyFilter) -> QueryProcessor<CompanyQuery> {
    Box::new(move |query: CompanyQuery| Ok(query.filter(condition_for(filter))))
}

/// Processor that orders a listing by name, then code.
pub fn order_by_name() -> QueryProcessor<CompanyQuery> {
    Box::new(|query: CompanyQuery| {
        Ok(query.order((companies::name.asc(), companies::code.asc())))
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CompanyRepository;

impl CompanyRepository {
    pub fn new() -> Self {
        CompanyRepository
    }
}

impl Repository<Company> for CompanyRepository {
    type Query = CompanyQuery;
    type Condition = CompanyCondition;

    fn get_all(
        &self,
        uow: &mut UnitOfWork,
        processors: Vec<QueryProcessor<CompanyQuery>>,
    ) -> Result<Vec<Company>> {
        let query = apply_processors(companies::table.into_boxed(), processors)?;
        let rows = query.load::<CompanyDB>(uow.reader()).into_core()?;
        Ok(rows.into_iter().map(Company::from).collect())
    }

    fn get(&self, uow: &mut UnitOfWork, id: &str) -> Result<Company> {
        companies::table
            .find(id)
            .first::<CompanyDB>(uow.reader())
            .map(Company::from)
            .into_core()
    }

    fn add(&self, uow: &mut UnitOfWork, entity: &Company) -> Result<Company> {
        let row = CompanyDB::from(entity);
        diesel::insert_into(companies::table)
            .values(&row)
            .returning(CompanyDB::as_returning())
            .get_result::<CompanyDB>(uow.writer()?)
            .map(Company::from)
            .into_core()
    }

    fn update(&self, uow: &mut UnitOfWork, entity: &Company) -> Result<Company> {
        let changes = CompanyChangesetDB::merge(entity, Utc::now().naive_utc());
        diesel::update(companies::table.find(entity.id.as_str()))
            .set(&changes)
            .returning(CompanyDB::as_returning())
            .get_result::<CompanyDB>(uow.writer()?)
            .map(Company::from)
            .into_core()
    }

    fn delete(
        &self,
        uow: &mut UnitOfWork,
        entity: &Company,
        conditions: Vec<CompanyCondition>,
    ) -> Result<usize> {
        let mut statement =
            diesel::delete(companies::table.filter(companies::id.eq(entity.id.clone())))
                .into_boxed::<Sqlite>();
        for condition in conditions {
            statement = statement.filter(condition);
        }
        statement.execute(uow.writer()?).into_core()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, init, run_migrations, DbPool};
    use std::sync::Arc;
    use tempfile::TempDir;
    use xm_core::companies::CompanyInput;
    use xm_core::errors::DatabaseError;
    use xm_core::Error;

    fn setup() -> (TempDir, Arc<DbPool>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("companies.db");
        let path = init(path.to_str().unwrap()).unwrap();
        let pool = create_pool(&path).unwrap();
        run_migrations(&pool).unwrap();
        (dir, pool)
    }

    fn company(name: &str, code: &str, country: &str) -> Company {
        Company::new(CompanyInput {
            name: name.to_string(),
            code: code.to_string(),
            country: country.to_string(),
            website: "https://example.com".to_string(),
            phone: "+357 22 000000".to_string(),
        })
        .unwrap()
    }

    fn seed(pool: &DbPool, companies: &[Company]) {
        let repo = CompanyRepository::new();
        let mut uow = UnitOfWork::begin(pool, false).unwrap();
        for c in companies {
            repo.add(&mut uow, c).unwrap();
        }
        uow.commit().unwrap();
    }

    #[test]
    fn test_add_then_get_returns_identical_fields() {
        let (_dir, pool) = setup();
        let repo = CompanyRepository::new();
        let created = company("XM", "XM01", "Cyprus");

        let mut uow = UnitOfWork::begin(&pool, false).unwrap();
        let stored = repo.add(&mut uow, &created).unwrap();
        let fetched = repo.get(&mut uow, &created.id).unwrap();
        uow.commit().unwrap();

        assert_eq!(stored, created);
        assert_eq!(fetched, created);
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let (_dir, pool) = setup();
        let mut uow = UnitOfWork::begin(&pool, true).unwrap();

        let err = CompanyRepository::new().get(&mut uow, "missing").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_update_merges_only_present_fields() {
        let (_dir, pool) = setup();
        let original = company("XM", "XM01", "Cyprus");
        seed(&pool, &[original.clone()]);

        let repo = CompanyRepository::new();
        let mut patch = original.clone();
        patch.name = "XM Global".to_string();
        patch.code = String::new();
        patch.website = String::new();

        let mut uow = UnitOfWork::begin(&pool, false).unwrap();
        let merged = repo.update(&mut uow, &patch).unwrap();
        uow.commit().unwrap();

        assert_eq!(merged.name, "XM Global");
        assert_eq!(merged.code, original.code);
        assert_eq!(merged.website, original.website);
        assert_eq!(merged.country, original.country);
        assert_eq!(merged.created_at, original.created_at);
        assert!(merged.updated_at >= original.updated_at);
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let (_dir, pool) = setup();
        let mut uow = UnitOfWork::begin(&pool, false).unwrap();

        let err = CompanyRepository::new()
            .update(&mut uow, &company("XM", "XM01", "Cyprus"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_filters_are_order_independent() {
        let (_dir, pool) = setup();
        let wanted = company("Alpha", "A1", "Cyprus");
        seed(
            &pool,
            &[
                wanted.clone(),
                company("Beta", "B1", "Cyprus"),
                company("Alpha", "A2", "Greece"),
            ],
        );

        let repo = CompanyRepository::new();
        let mut uow = UnitOfWork::begin(&pool, true).unwrap();

        let forward = repo
            .get_all(
                &mut uow,
                vec![
                    filter_by(CompanyFilter::Name("Alpha".to_string())),
                    filter_by(CompanyFilter::Country("Cyprus".to_string())),
                ],
            )
            .unwrap();
        let backward = repo
            .get_all(
                &mut uow,
                vec![
                    filter_by(CompanyFilter::Country("Cyprus".to_string())),
                    filter_by(CompanyFilter::Name("Alpha".to_string())),
                ],
            )
            .unwrap();

        assert_eq!(forward, vec![wanted]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_get_all_with_order_processor() {
        let (_dir, pool) = setup();
        seed(
            &pool,
            &[
                company("Gamma", "G1", "Cyprus"),
                company("Alpha", "A1", "Cyprus"),
                company("Beta", "B1", "Cyprus"),
            ],
        );

        let mut uow = UnitOfWork::begin(&pool, true).unwrap();
        let names: Vec<String> = CompanyRepository::new()
            .get_all(&mut uow, vec![order_by_name()])
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();

        assert_eq!(names, vec!["Alpha", "Beta", "Gamma"]);
    }

    #[test]
    fn test_delete_applies_extra_conditions() {
        let (_dir, pool) = setup();
        let target = company("XM", "XM01", "Cyprus");
        seed(&pool, &[target.clone()]);

        let repo = CompanyRepository::new();
        let mut uow = UnitOfWork::begin(&pool, false).unwrap();

        let skipped = repo
            .delete(
                &mut uow,
                &target,
                vec![condition_for(CompanyFilter::Country("Greece".to_string()))],
            )
            .unwrap();
        assert_eq!(skipped, 0);

        let deleted = repo
            .delete(
                &mut uow,
                &target,
                vec![condition_for(CompanyFilter::Country("Cyprus".to_string()))],
            )
            .unwrap();
        assert_eq!(deleted, 1);
        uow.commit().unwrap();

        let mut uow = UnitOfWork::begin(&pool, true).unwrap();
        assert!(repo.get(&mut uow, &target.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_rolled_back_add_leaves_no_row() {
        let (_dir, pool) = setup();
        let repo = CompanyRepository::new();
        let created = company("XM", "XM01", "Cyprus");
        {
            let mut uow = UnitOfWork::begin(&pool, false).unwrap();
            repo.add(&mut uow, &created).unwrap();
        }

        let mut uow = UnitOfWork::begin(&pool, true).unwrap();
        assert!(repo.get_all(&mut uow, Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_code_is_unique_violation() {
        let (_dir, pool) = setup();
        seed(&pool, &[company("XM", "XM01", "Cyprus")]);

        let mut uow = UnitOfWork::begin(&pool, false).unwrap();
        let err = CompanyRepository::new()
            .add(&mut uow, &company("Other", "XM01", "Greece"))
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Database(DatabaseError::UniqueViolation(_))
        ));
    }

    #[test]
    fn test_add_in_read_only_scope_is_rejected() {
        let (_dir, pool) = setup();
        let mut uow = UnitOfWork::begin(&pool, true).unwrap();

        let err = CompanyRepository::new()
            .add(&mut uow, &company("XM", "XM01", "Cyprus"))
            .unwrap_err();
        assert!(matches!(err, Error::Database(DatabaseError::ReadOnly(_))));
    }
}
