//! Destination store abstraction.
//!
//! The loader only ever runs plain DDL and a CSV `COPY`, so that is all a store
//! has to offer. [`PgStore`] is the Postgres implementation.

pub mod postgres;

pub use postgres::PgStore;

use async_trait::async_trait;

#[async_trait]
pub trait RelationStore: Send {
    /// Run one statement; it is committed on success.
    async fn execute(&mut self, statement: &str) -> Result<(), sqlx::Error>;

    /// Stream `data` through a `COPY … FROM STDIN` statement and return the
    /// number of rows written.
    async fn copy_in(&mut self, statement: &str, data: &[u8]) -> Result<u64, sqlx::Error>;
}
