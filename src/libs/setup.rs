use std::fmt;

use tracing::{info, instrument};

use crate::libs::database::Database;
use crate::libs::error::DbError;
use crate::libs::reconcile::{ReconciliationReport, reconcile_live};
use crate::libs::schema::TableDefinition;
use crate::libs::seed::{SeedLoader, SeedReport, SeedRow};

/// Outcome of reconcile-then-seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupReport {
    pub tables: ReconciliationReport,
    /// `None` when seeding was skipped.
    pub seeds: Option<SeedReport>,
}

impl SetupReport {
    pub fn is_success(&self) -> bool {
        self.tables.is_success() && self.seeds.as_ref().is_none_or(SeedReport::is_success)
    }
}

impl fmt::Display for SetupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tables)?;
        if let Some(seeds) = &self.seeds {
            write!(f, "\n{}", seeds)?;
        }
        Ok(())
    }
}

/// Creates the missing tables, then loads `seeds` unless `schema_only`.
#[instrument(skip_all)]
pub async fn run_setup<D>(
    db: &mut D,
    definitions: &[TableDefinition],
    seeds: &[SeedRow],
    schema_only: bool,
) -> Result<SetupReport, DbError>
where
    D: Database + ?Sized,
{
    let tables = reconcile_live(db, definitions).await?;
    info!(
        created = tables.created(),
        existing = tables.already_existed(),
        failed = tables.failed(),
        "schema reconciled"
    );

    if schema_only {
        return Ok(SetupReport {
            tables,
            seeds: None,
        });
    }

    let seeds = SeedLoader::new(db)
        .with_definitions(definitions)
        .load(seeds)
        .await?;
    info!(
        inserted = seeds.inserted(),
        skipped = seeds.skipped(),
        failed = seeds.failed(),
        "seeds loaded"
    );

    Ok(SetupReport {
        tables,
        seeds: Some(seeds),
    })
}
