//! Creates the tables a set of definitions expects but the database lacks.
//!
//! Existing tables are never altered, even when their columns differ from the
//! definition. Creation follows foreign keys so a referenced table is always
//! created before the tables that point at it.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use tracing::{debug, info, instrument, warn};

use crate::libs::database::Database;
use crate::libs::error::DbError;
use crate::libs::query_builder::{create_indexes, create_table};
use crate::libs::schema::TableDefinition;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableOutcome {
    AlreadyExisted,
    Created,
    Failed(String),
}

impl fmt::Display for TableOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableOutcome::AlreadyExisted => write!(f, "already existed"),
            TableOutcome::Created => write!(f, "created"),
            TableOutcome::Failed(reason) => write!(f, "FAILED: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReportEntry {
    pub table: String,
    pub outcome: TableOutcome,
}

/// One entry per input definition, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub entries: Vec<TableReportEntry>,
}

impl ReconciliationReport {
    pub fn outcome_of(&self, table: &str) -> Option<&TableOutcome> {
        self.entries
            .iter()
            .find(|e| e.table == table)
            .map(|e| &e.outcome)
    }

    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, TableOutcome::Created))
    }

    pub fn already_existed(&self) -> usize {
        self.count(|o| matches!(o, TableOutcome::AlreadyExisted))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, TableOutcome::Failed(_)))
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, predicate: impl Fn(&TableOutcome) -> bool) -> usize {
        self.entries.iter().filter(|e| predicate(&e.outcome)).count()
    }
}

impl fmt::Display for ReconciliationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tables:")?;
        for entry in &self.entries {
            writeln!(f, "  {:<24} {}", entry.table, entry.outcome)?;
        }
        write!(
            f,
            "  {} created, {} already existed, {} failed",
            self.created(),
            self.already_existed(),
            self.failed()
        )
    }
}

/// Creation order as indexes into `definitions`.
///
/// Definitions named in `existing_tables` come first, in input order, and
/// satisfy any dependency on them. After that the order is stable: among
/// tables whose dependencies are met, the earliest input wins. Only
/// dependencies on other definitions in the set count; references to tables
/// outside it are checked when the table is created. Whatever cannot be
/// ordered sits on a cycle, or behind one, and is returned second.
pub fn creation_order(
    definitions: &[TableDefinition],
    existing_tables: &BTreeSet<String>,
) -> (Vec<usize>, Vec<usize>) {
    let mut index_of: HashMap<&str, usize> = HashMap::new();
    for (i, def) in definitions.iter().enumerate() {
        index_of.entry(def.name.as_str()).or_insert(i);
    }

    let pending_deps: Vec<HashSet<usize>> = definitions
        .iter()
        .enumerate()
        .map(|(i, def)| {
            def.dependencies()
                .filter_map(|target| index_of.get(target).copied())
                .filter(|&dep| dep != i)
                .collect()
        })
        .collect();

    let mut placed = vec![false; definitions.len()];
    let mut order = Vec::with_capacity(definitions.len());
    for (i, def) in definitions.iter().enumerate() {
        if existing_tables.contains(&def.name) {
            placed[i] = true;
            order.push(i);
        }
    }

    while let Some(next) = (0..definitions.len())
        .find(|&i| !placed[i] && pending_deps[i].iter().all(|&dep| placed[dep]))
    {
        placed[next] = true;
        order.push(next);
    }

    let cyclic = (0..definitions.len()).filter(|&i| !placed[i]).collect();
    (order, cyclic)
}

/// Brings the database up to `definitions`, given the tables it already has.
///
/// Per-table failures are recorded in the report and the run goes on. Only a
/// connection error ends the run early.
#[instrument(skip_all, fields(definitions = definitions.len()))]
pub async fn reconcile<D>(
    db: &mut D,
    existing_tables: &BTreeSet<String>,
    definitions: &[TableDefinition],
) -> Result<ReconciliationReport, DbError>
where
    D: Database + ?Sized,
{
    let dialect = db.dialect();
    let (order, cyclic) = creation_order(definitions, existing_tables);

    let mut outcomes: Vec<Option<TableOutcome>> = vec![None; definitions.len()];
    let mut available: HashSet<String> = existing_tables.iter().cloned().collect();
    let mut seen: HashSet<&str> = HashSet::new();

    for &i in &cyclic {
        let def = &definitions[i];
        let others: Vec<&str> = cyclic
            .iter()
            .map(|&j| definitions[j].name.as_str())
            .filter(|name| *name != def.name)
            .collect();
        warn!(table = %def.name, "foreign key cycle");
        outcomes[i] = Some(TableOutcome::Failed(format!(
            "dependency cycle involving {}",
            others.join(", ")
        )));
    }

    for i in order {
        let def = &definitions[i];

        if !seen.insert(def.name.as_str()) {
            warn!(table = %def.name, "duplicate definition");
            outcomes[i] = Some(TableOutcome::Failed(format!(
                "table `{}` is defined more than once",
                def.name
            )));
            continue;
        }

        if existing_tables.contains(&def.name) {
            debug!(table = %def.name, "already exists");
            outcomes[i] = Some(TableOutcome::AlreadyExisted);
            continue;
        }

        if let Some(missing) = def.dependencies().find(|t| !available.contains(*t)) {
            warn!(table = %def.name, missing, "foreign key target missing");
            outcomes[i] = Some(TableOutcome::Failed(format!(
                "foreign key target `{}` does not exist",
                missing
            )));
            continue;
        }

        let result = db.execute(&create_table(def, dialect)).await;
        if matches!(result, Ok(_) | Err(DbError::AlreadyExists(_))) {
            available.insert(def.name.clone());
        }
        let outcome = match result {
            Ok(_) => create_table_indexes(db, def).await?,
            Err(DbError::AlreadyExists(_)) => {
                debug!(table = %def.name, "created concurrently");
                TableOutcome::AlreadyExisted
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => TableOutcome::Failed(e.to_string()),
        };

        match &outcome {
            TableOutcome::Failed(reason) => warn!(table = %def.name, %reason, "create failed"),
            TableOutcome::Created => info!(table = %def.name, "created"),
            TableOutcome::AlreadyExisted => {}
        }
        outcomes[i] = Some(outcome);
    }

    let entries = definitions
        .iter()
        .zip(outcomes)
        .map(|(def, outcome)| TableReportEntry {
            table: def.name.clone(),
            outcome: outcome.unwrap_or_else(|| TableOutcome::Failed("not processed".into())),
        })
        .collect();

    Ok(ReconciliationReport { entries })
}

async fn create_table_indexes<D>(
    db: &mut D,
    def: &TableDefinition,
) -> Result<TableOutcome, DbError>
where
    D: Database + ?Sized,
{
    for statement in create_indexes(def, db.dialect()) {
        match db.execute(&statement).await {
            Ok(_) | Err(DbError::AlreadyExists(_)) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                return Ok(TableOutcome::Failed(format!(
                    "table created but index failed: {}",
                    e
                )));
            }
        }
    }
    Ok(TableOutcome::Created)
}

/// Lists the live tables first, then reconciles.
pub async fn reconcile_live<D>(
    db: &mut D,
    definitions: &[TableDefinition],
) -> Result<ReconciliationReport, DbError>
where
    D: Database + ?Sized,
{
    let existing = db.list_existing_tables().await?;
    reconcile(db, &existing, definitions).await
}
