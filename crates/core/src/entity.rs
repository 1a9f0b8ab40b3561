use chrono::NaiveDateTime;

/// Common shape of every persisted entity.
///
/// Repositories only rely on the identifier; the timestamps are carried
/// through CRUD operations without being interpreted.
pub trait Entity: Send + Sync {
    fn id(&self) -> &str;

    fn created_at(&self) -> NaiveDateTime;

    fn updated_at(&self) -> NaiveDateTime;

    fn deleted_at(&self) -> Option<NaiveDateTime>;
}
