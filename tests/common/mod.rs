#![allow(dead_code)]

use std::collections::BTreeSet;

use async_trait::async_trait;
use crmseed::{
    ColumnSpec, ColumnType, Database, DbError, Dialect, OnDelete, SqlxDatabase, Statement,
    TableDefinition,
};

/// Remembers every statement and keeps track of the tables it "created".
#[derive(Default)]
pub struct RecordingDatabase {
    pub tables: BTreeSet<String>,
    pub executed: Vec<Statement>,
    /// Statements containing the pattern fail with the paired error.
    pub failures: Vec<(String, DbError)>,
}

impl RecordingDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tables(tables: &[&str]) -> Self {
        let mut db = Self::new();
        db.tables = tables.iter().map(|t| t.to_string()).collect();
        db
    }

    pub fn fail_when(mut self, pattern: &str, error: DbError) -> Self {
        self.failures.push((pattern.to_string(), error));
        self
    }

    pub fn attempted_creates(&self) -> Vec<String> {
        self.executed
            .iter()
            .filter_map(|s| s.sql.strip_prefix("CREATE TABLE \""))
            .filter_map(|rest| rest.split('"').next())
            .map(|name| name.to_string())
            .collect()
    }
}

#[async_trait]
impl Database for RecordingDatabase {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn list_existing_tables(&mut self) -> Result<BTreeSet<String>, DbError> {
        Ok(self.tables.clone())
    }

    async fn execute(&mut self, statement: &Statement) -> Result<u64, DbError> {
        self.executed.push(statement.clone());
        if let Some((_, error)) = self
            .failures
            .iter()
            .find(|(pattern, _)| statement.sql.contains(pattern.as_str()))
        {
            return Err(error.clone());
        }
        if let Some(rest) = statement.sql.strip_prefix("CREATE TABLE \"") {
            if let Some(name) = rest.split('"').next() {
                self.tables.insert(name.to_string());
            }
        }
        Ok(1)
    }
}

pub async fn memory_db() -> SqlxDatabase {
    SqlxDatabase::connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite should open")
}

pub fn table(name: &str, references: &[&str]) -> TableDefinition {
    let mut def = TableDefinition::new(name).column(ColumnSpec::id("id"));
    for target in references {
        let column = format!("{}_id", target);
        def = def
            .column(ColumnSpec::new(&column, ColumnType::Integer))
            .foreign_key(&column, target, "id", OnDelete::Cascade);
    }
    def
}

pub fn users() -> TableDefinition {
    TableDefinition::new("users")
        .column(ColumnSpec::id("id"))
        .column(ColumnSpec::new("name", ColumnType::Varchar { length: 100 }).not_null())
        .column(
            ColumnSpec::new("email", ColumnType::Varchar { length: 191 })
                .not_null()
                .unique(),
        )
}

pub fn leads() -> TableDefinition {
    TableDefinition::new("leads")
        .column(ColumnSpec::id("id"))
        .column(
            ColumnSpec::new("email", ColumnType::Varchar { length: 191 })
                .not_null()
                .unique(),
        )
        .column(ColumnSpec::new("owner_id", ColumnType::Integer).not_null())
        .foreign_key("owner_id", "users", "id", OnDelete::Cascade)
}
