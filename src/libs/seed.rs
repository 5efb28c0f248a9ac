use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::libs::database::Database;
use crate::libs::error::DbError;
use crate::libs::query_builder::InsertBuilder;
use crate::libs::schema::TableDefinition;

/// One row to insert. Identifiers of other rows are given literally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedRow {
    pub table: String,
    pub values: Map<String, Value>,
    /// Columns that name this row in reports. The table is expected to carry
    /// a unique constraint over them.
    #[serde(default)]
    pub natural_key: Vec<String>,
}

impl SeedRow {
    pub fn new(table: &str, values: Map<String, Value>) -> Self {
        Self {
            table: table.to_string(),
            values,
            natural_key: Vec::new(),
        }
    }

    pub fn keyed_by(mut self, columns: &[&str]) -> Self {
        self.natural_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// `leads[email=ada@example.com]`, or `leads#3` without a natural key.
    pub fn identifier(&self, position: usize) -> String {
        if self.natural_key.is_empty() {
            return format!("{}#{}", self.table, position);
        }
        let parts: Vec<String> = self
            .natural_key
            .iter()
            .map(|column| match self.values.get(column) {
                Some(Value::String(s)) => format!("{}={}", column, s),
                Some(other) => format!("{}={}", column, other),
                None => format!("{}=?", column),
            })
            .collect();
        format!("{}[{}]", self.table, parts.join(","))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Inserted,
    SkippedDuplicate,
    Failed(String),
}

impl fmt::Display for RowOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowOutcome::Inserted => write!(f, "inserted"),
            RowOutcome::SkippedDuplicate => write!(f, "skipped (duplicate)"),
            RowOutcome::Failed(reason) => write!(f, "FAILED: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowReportEntry {
    pub row: String,
    pub outcome: RowOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub entries: Vec<RowReportEntry>,
}

impl SeedReport {
    pub fn inserted(&self) -> usize {
        self.count(|o| matches!(o, RowOutcome::Inserted))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, RowOutcome::SkippedDuplicate))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, RowOutcome::Failed(_)))
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, predicate: impl Fn(&RowOutcome) -> bool) -> usize {
        self.entries.iter().filter(|e| predicate(&e.outcome)).count()
    }
}

impl fmt::Display for SeedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Seed rows:")?;
        for entry in &self.entries {
            writeln!(f, "  {:<40} {}", entry.row, entry.outcome)?;
        }
        write!(
            f,
            "  {} inserted, {} skipped, {} failed",
            self.inserted(),
            self.skipped(),
            self.failed()
        )
    }
}

/// Inserts seed rows, treating unique violations as "already seeded".
pub struct SeedLoader<'a, D: ?Sized> {
    db: &'a mut D,
    definitions: &'a [TableDefinition],
}

impl<'a, D> SeedLoader<'a, D>
where
    D: Database + ?Sized,
{
    pub fn new(db: &'a mut D) -> Self {
        Self {
            db,
            definitions: &[],
        }
    }

    /// Column types drive placeholder casts and `auto_uuid` filling.
    pub fn with_definitions(mut self, definitions: &'a [TableDefinition]) -> Self {
        self.definitions = definitions;
        self
    }

    /// Applies `rows` in order. Only a connection error stops the run.
    #[instrument(skip_all, fields(rows = rows.len()))]
    pub async fn load(mut self, rows: &[SeedRow]) -> Result<SeedReport, DbError> {
        let dialect = self.db.dialect();
        let mut entries = Vec::with_capacity(rows.len());

        for (position, row) in rows.iter().enumerate() {
            let id = row.identifier(position + 1);
            let definition = self.definitions.iter().find(|d| d.name == row.table);

            let mut builder = InsertBuilder::new(&row.table, dialect).with_definition(definition);
            for (column, value) in &row.values {
                builder = builder.value(column, value.clone());
            }
            if let Some(def) = definition {
                for column in def.columns.iter().filter(|c| c.auto_uuid) {
                    if !row.values.contains_key(&column.name) {
                        builder = builder
                            .value(&column.name, Value::String(Uuid::new_v4().to_string()));
                    }
                }
            }

            let result = self.db.execute(&builder.build()).await;
            let outcome = match result {
                Ok(_) => {
                    info!(row = %id, "inserted");
                    RowOutcome::Inserted
                }
                Err(DbError::DuplicateKey(_)) => {
                    debug!(row = %id, "already seeded");
                    RowOutcome::SkippedDuplicate
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(row = %id, error = %e, "insert failed");
                    RowOutcome::Failed(e.to_string())
                }
            };
            entries.push(RowReportEntry { row: id, outcome });
        }

        Ok(SeedReport { entries })
    }
}

/// Seeds without table definitions.
pub async fn load_seeds<D>(db: &mut D, rows: &[SeedRow]) -> Result<SeedReport, DbError>
where
    D: Database + ?Sized,
{
    SeedLoader::new(db).load(rows).await
}
