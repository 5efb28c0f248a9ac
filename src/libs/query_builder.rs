use serde_json::Value;

use crate::libs::error::ConfigError;
use crate::libs::schema::{ColumnSpec, TableDefinition};

/// SQL flavour spoken by the connected server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Dialect {
    #[value(name = "mysql", alias = "mariadb")]
    MySql,
    #[value(name = "postgres", alias = "postgresql")]
    Postgres,
    #[value(name = "sqlite")]
    Sqlite,
}

impl Dialect {
    pub fn from_url(database_url: &str) -> Result<Self, ConfigError> {
        let scheme = database_url
            .split_once(':')
            .map(|(scheme, _)| scheme)
            .unwrap_or(database_url);
        match scheme {
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "sqlite" => Ok(Dialect::Sqlite),
            other => Err(ConfigError::UnsupportedScheme(other.to_string())),
        }
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
        }
    }

    pub fn default_port(&self) -> Option<u16> {
        match self {
            Dialect::MySql => Some(3306),
            Dialect::Postgres => Some(5432),
            Dialect::Sqlite => None,
        }
    }

    pub fn quote(&self, identifier: &str) -> String {
        match self {
            Dialect::MySql => format!("`{}`", identifier.replace('`', "``")),
            Dialect::Postgres | Dialect::Sqlite => {
                format!("\"{}\"", identifier.replace('"', "\"\""))
            }
        }
    }

    /// Placeholder for the 1-based parameter `index`.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", index),
            Dialect::MySql | Dialect::Sqlite => "?".to_string(),
        }
    }

    /// Base tables of the current database or schema, one name per row.
    pub fn list_tables_sql(&self) -> &'static str {
        match self {
            Dialect::MySql => {
                "SELECT CAST(TABLE_NAME AS CHAR) FROM information_schema.TABLES \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE' \
                 ORDER BY TABLE_NAME"
            }
            Dialect::Postgres => {
                "SELECT table_name::text FROM information_schema.tables \
                 WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' \
                 ORDER BY table_name"
            }
            Dialect::Sqlite => {
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
                 ORDER BY name"
            }
        }
    }

    /// Columns of one table in ordinal order, bound to a single parameter.
    pub fn list_columns_sql(&self) -> &'static str {
        match self {
            Dialect::MySql => {
                "SELECT CAST(COLUMN_NAME AS CHAR), CAST(COLUMN_TYPE AS CHAR) \
                 FROM information_schema.COLUMNS \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
                 ORDER BY ORDINAL_POSITION"
            }
            Dialect::Postgres => {
                "SELECT column_name::text, data_type::text FROM information_schema.columns \
                 WHERE table_schema = current_schema() AND table_name = $1 \
                 ORDER BY ordinal_position"
            }
            Dialect::Sqlite => "SELECT name, type FROM pragma_table_info(?) ORDER BY cid",
        }
    }
}

/// A statement plus the parameters bound to its placeholders, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }
}

fn column_sql(column: &ColumnSpec, dialect: Dialect, inline_primary: bool) -> String {
    let mut col_def = format!(
        "{} {}",
        dialect.quote(&column.name),
        column.column_type.sql(dialect)
    );
    if column.primary && inline_primary {
        col_def.push_str(" PRIMARY KEY")
    }
    if !column.nullable && !(column.primary && inline_primary) {
        col_def.push_str(" NOT NULL")
    }
    if column.unique {
        col_def.push_str(" UNIQUE")
    }
    if let Some(default) = &column.default {
        col_def.push_str(&format!(" DEFAULT {}", default))
    }
    col_def
}

/// `CREATE TABLE` for the definition's own columns and foreign keys.
pub fn create_table(definition: &TableDefinition, dialect: Dialect) -> Statement {
    let primary: Vec<&ColumnSpec> = definition.columns.iter().filter(|c| c.primary).collect();
    let inline_primary = primary.len() == 1;

    let mut parts: Vec<String> = definition
        .columns
        .iter()
        .map(|c| column_sql(c, dialect, inline_primary))
        .collect();

    if primary.len() > 1 {
        let cols: Vec<String> = primary.iter().map(|c| dialect.quote(&c.name)).collect();
        parts.push(format!("PRIMARY KEY ({})", cols.join(", ")));
    }

    for fk in &definition.foreign_keys {
        parts.push(format!(
            "FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {}",
            dialect.quote(&fk.column),
            dialect.quote(&fk.references_table),
            dialect.quote(&fk.references_column),
            fk.on_delete.sql()
        ));
    }

    Statement::new(format!(
        "CREATE TABLE {} ({})",
        dialect.quote(&definition.name),
        parts.join(", ")
    ))
}

/// One `CREATE INDEX` per declared index.
pub fn create_indexes(definition: &TableDefinition, dialect: Dialect) -> Vec<Statement> {
    definition
        .indexes
        .iter()
        .map(|index| {
            let cols: Vec<String> = index.columns.iter().map(|c| dialect.quote(c)).collect();
            Statement::new(format!(
                "CREATE {}INDEX {} ON {} ({})",
                if index.unique { "UNIQUE " } else { "" },
                dialect.quote(&index.name),
                dialect.quote(&definition.name),
                cols.join(", ")
            ))
        })
        .collect()
}

/// Builds a parameterized `INSERT` one column at a time.
pub struct InsertBuilder<'a> {
    table: String,
    dialect: Dialect,
    definition: Option<&'a TableDefinition>,
    columns: Vec<String>,
    placeholders: Vec<String>,
    params: Vec<Value>,
}

impl<'a> InsertBuilder<'a> {
    pub fn new(table: &str, dialect: Dialect) -> Self {
        Self {
            table: table.to_string(),
            dialect,
            definition: None,
            columns: Vec::new(),
            placeholders: Vec::new(),
            params: Vec::new(),
        }
    }

    /// Lets placeholders pick up the casts the column types need.
    pub fn with_definition(mut self, definition: Option<&'a TableDefinition>) -> Self {
        self.definition = definition;
        self
    }

    pub fn value(mut self, column: &str, value: Value) -> Self {
        let placeholder = self.dialect.placeholder(self.params.len() + 1);
        let cast = self
            .definition
            .and_then(|d| d.find_column(column))
            .and_then(|c| c.column_type.parameter_cast(self.dialect));
        self.placeholders.push(match cast {
            Some(type_name) => format!("CAST({} AS {})", placeholder, type_name),
            None => placeholder,
        });
        self.columns.push(self.dialect.quote(column));
        self.params.push(value);
        self
    }

    fn build_sql(&self) -> String {
        let table = self.dialect.quote(&self.table);
        if self.columns.is_empty() {
            return match self.dialect {
                Dialect::MySql => format!("INSERT INTO {} () VALUES ()", table),
                Dialect::Postgres | Dialect::Sqlite => {
                    format!("INSERT INTO {} DEFAULT VALUES", table)
                }
            };
        }
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            self.columns.join(", "),
            self.placeholders.join(", ")
        )
    }

    pub fn build(self) -> Statement {
        Statement {
            sql: self.build_sql(),
            params: self.params,
        }
    }
}
