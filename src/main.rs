use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use crmseed::{
    ConnectionArgs, Database, Result, SeedLoader, SeedRow, SqlxDatabase, TableDefinition,
    catalog, run_setup,
};
use serde::de::DeserializeOwned;
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "crmseed", version, about = "Create missing CRM tables and load seed data")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create missing tables in dependency order, then insert the seed rows
    Setup {
        #[command(flatten)]
        input: InputArgs,

        /// Only create tables, do not insert seed rows
        #[arg(long, default_value_t = false)]
        schema_only: bool,
    },
    /// Insert the seed rows into an existing schema
    Seed {
        #[command(flatten)]
        input: InputArgs,
    },
    /// List existing tables and their columns
    Inspect,
}

#[derive(Args, Debug)]
struct InputArgs {
    /// JSON file with table definitions, replacing the built-in CRM schema
    #[arg(long)]
    definitions: Option<PathBuf>,

    /// JSON file with seed rows, replacing the built-in CRM sample data
    #[arg(long)]
    seeds: Option<PathBuf>,
}

impl InputArgs {
    async fn definitions(&self) -> Result<Vec<TableDefinition>> {
        match &self.definitions {
            Some(path) => read_json(path).await,
            None => Ok(catalog::definitions()),
        }
    }

    async fn seeds(&self) -> Result<Vec<SeedRow>> {
        match &self.seeds {
            Some(path) => read_json(path).await,
            None => Ok(catalog::seeds()),
        }
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&text)?)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let database_url = cli.connection.database_url()?;

    let mut db = SqlxDatabase::connect(&database_url).await?;
    let result = run(cli.command, &mut db).await;
    db.close().await;

    let success = result?;
    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[instrument(skip_all)]
async fn run(command: Command, db: &mut SqlxDatabase) -> Result<bool> {
    match command {
        Command::Setup { input, schema_only } => {
            let definitions = input.definitions().await?;
            let seeds = if schema_only {
                Vec::new()
            } else {
                input.seeds().await?
            };

            let report = run_setup(db, &definitions, &seeds, schema_only).await?;
            println!("{}", report);
            Ok(report.is_success())
        }
        Command::Seed { input } => {
            let definitions = input.definitions().await?;
            let seeds = input.seeds().await?;

            let report = SeedLoader::new(db)
                .with_definitions(&definitions)
                .load(&seeds)
                .await?;
            println!("{}", report);
            Ok(report.is_success())
        }
        Command::Inspect => {
            let tables = db.list_existing_tables().await?;
            info!(tables = tables.len(), "inspected");
            for table in tables {
                println!("{}", table);
                for (column, sql_type) in db.list_columns(&table).await? {
                    println!("  {:<28} {}", column, sql_type);
                }
            }
            Ok(true)
        }
    }
}
