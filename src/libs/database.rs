use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::libs::error::DbError;
use crate::libs::query_builder::{Dialect, Statement};

/// The two things the reconciler and the seed loader need from a database.
#[async_trait]
pub trait Database: Send {
    fn dialect(&self) -> Dialect;

    /// Names of the base tables that exist right now.
    async fn list_existing_tables(&mut self) -> Result<BTreeSet<String>, DbError>;

    /// Runs one statement and returns the number of affected rows.
    async fn execute(&mut self, statement: &Statement) -> Result<u64, DbError>;
}
