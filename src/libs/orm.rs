use std::collections::BTreeSet;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::any::{AnyArguments, AnyPoolOptions};
use sqlx::query::Query;
use sqlx::{Any, AnyPool, Row};
use tracing::debug;

use crate::libs::database::Database;
use crate::libs::error::{DbError, Result};
use crate::libs::query_builder::{Dialect, Statement};

/// A single live connection, shared by the reconciler and the seed loader
/// for the length of one run.
pub struct SqlxDatabase {
    pool: AnyPool,
    dialect: Dialect,
}

impl SqlxDatabase {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let dialect = Dialect::from_url(database_url)?;
        sqlx::any::install_default_drivers();

        debug!(scheme = dialect.scheme(), "connecting");
        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .map_err(DbError::from)?;

        Ok(Self { pool, dialect })
    }

    /// Column names and declared types of `table`, in ordinal order.
    pub async fn list_columns(&mut self, table: &str) -> Result<Vec<(String, String)>> {
        let rows = sqlx::query(self.dialect.list_columns_sql())
            .bind(table.to_string())
            .fetch_all(&self.pool)
            .await?;

        let mut columns = Vec::with_capacity(rows.len());
        for r in rows {
            let name: String = r.try_get(0)?;
            let sql_type: Option<String> = r.try_get(1)?;
            columns.push((name, sql_type.unwrap_or_default()));
        }
        Ok(columns)
    }

    /// Counts the rows of `table`.
    pub async fn count_rows(&mut self, table: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.dialect.quote(table));
        let row = sqlx::query(&sql).fetch_one(&self.pool).await?;
        Ok(row.try_get(0)?)
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

fn bind_value<'q>(
    query: Query<'q, Any, AnyArguments<'q>>,
    value: &Value,
) -> Query<'q, Any, AnyArguments<'q>> {
    match value {
        Value::String(s) => query.bind(s.clone()),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64()),
        },
        Value::Bool(b) => query.bind(*b),
        Value::Null => query.bind(None::<String>),
        nested => query.bind(nested.to_string()),
    }
}

#[async_trait]
impl Database for SqlxDatabase {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn list_existing_tables(&mut self) -> std::result::Result<BTreeSet<String>, DbError> {
        let rows = sqlx::query(self.dialect.list_tables_sql())
            .fetch_all(&self.pool)
            .await?;

        let mut tables = BTreeSet::new();
        for r in rows {
            tables.insert(r.try_get::<String, _>(0)?);
        }
        Ok(tables)
    }

    async fn execute(&mut self, statement: &Statement) -> std::result::Result<u64, DbError> {
        debug!(sql = %statement.sql, params = statement.params.len(), "executing");

        let mut query = sqlx::query(&statement.sql);
        for v in &statement.params {
            query = bind_value(query, v);
        }

        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
