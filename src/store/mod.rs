//! Persistence seam used by every service.
//!
//! The services only rely on these five operations and never on the order
//! in which a backend returns rows: anything order-sensitive is sorted
//! explicitly by the caller.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Record;

pub mod sqlite;

pub use sqlite::SqliteStore;

#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    /// Inserts or replaces the record under its key, index entries included.
    async fn put<R: Record>(&self, record: &R) -> Result<()>;

    async fn get<R: Record>(&self, key: &str) -> Result<Option<R>>;

    /// Deleting a missing key is not an error.
    async fn delete<R: Record>(&self, key: &str) -> Result<()>;

    async fn all<R: Record>(&self) -> Result<Vec<R>>;

    /// Every record whose index `index` holds `value`, in no defined order.
    async fn by_index<R: Record>(&self, index: &str, value: &str) -> Result<Vec<R>>;
}
