//! Generic repository contract and composable query processors.

use crate::db::UnitOfWork;
use xm_core::{Entity, Result};

/// A query transformation applied before execution.
///
/// Processors typically add one predicate each; chaining them ANDs the
/// predicates, so the resulting row set does not depend on their order.
pub type QueryProcessor<Q> = Box<dyn FnOnce(Q) -> Result<Q> + Send>;

/// Applies `processors` to `query` in the order given.
pub fn apply_processors<Q>(query: Q, processors: Vec<QueryProcessor<Q>>) -> Result<Q> {
    processors
        .into_iter()
        .try_fold(query, |query, processor| processor(query))
}

/// CRUD operations for one entity type, always run inside a [`UnitOfWork`].
///
/// None of the operations retry. Writes require a read-write unit of work and
/// become visible to other scopes only once it commits.
pub trait Repository<E: Entity> {
    /// Boxed query the processors of [`get_all`](Self::get_all) operate on.
    type Query;
    /// Extra predicate accepted by [`delete`](Self::delete).
    type Condition;

    fn get_all(
        &self,
        uow: &mut UnitOfWork,
        processors: Vec<QueryProcessor<Self::Query>>,
    ) -> Result<Vec<E>>;

    /// Fetches one entity; `DatabaseError::NotFound` on a miss.
    fn get(&self, uow: &mut UnitOfWork, id: &str) -> Result<E>;

    /// Inserts the entity and returns the stored row.
    fn add(&self, uow: &mut UnitOfWork, entity: &E) -> Result<E>;

    /// Merges the non-empty fields of `entity` into the stored row with the
    /// same id, refreshes `updated_at` and returns the merged row.
    fn update(&self, uow: &mut UnitOfWork, entity: &E) -> Result<E>;

    /// Deletes the row matching the entity id and every extra condition.
    /// Returns the number of rows deleted.
    fn delete(
        &self,
        uow: &mut UnitOfWork,
        entity: &E,
        conditions: Vec<Self::Condition>,
    ) -> Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use xm_core::Error;

    #[test]
    fn test_processors_run_in_order() {
        let processors: Vec<QueryProcessor<Vec<&'static str>>> = vec![
            Box::new(|mut q| {
                q.push("a");
                Ok(q)
            }),
            Box::new(|mut q| {
                q.push("b");
                Ok(q)
            }),
        ];

        let query = apply_processors(Vec::new(), processors).unwrap();
        assert_eq!(query, vec!["a", "b"]);
    }

    #[test]
    fn test_failing_processor_stops_the_chain() {
        let processors: Vec<QueryProcessor<u32>> = vec![
            Box::new(|_| Err(Error::Unexpected("bad filter".to_string()))),
            Box::new(|q| Ok(q + 1)),
        ];

        assert!(apply_processors(0, processors).is_err());
    }
}
