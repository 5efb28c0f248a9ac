use serde::{Deserialize, Serialize};

use crate::libs::query_builder::Dialect;

/// Portable column types, rendered per dialect when the table is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ColumnType {
    /// Auto-incrementing integer, normally the primary key.
    Serial,
    Integer,
    BigInteger,
    Decimal { precision: u8, scale: u8 },
    Double,
    Boolean,
    Varchar { length: u16 },
    Text,
    Date,
    Timestamp,
    Uuid,
}

impl ColumnType {
    pub fn sql(&self, dialect: Dialect) -> String {
        match (self, dialect) {
            (ColumnType::Serial, Dialect::Postgres) => "SERIAL".into(),
            (ColumnType::Serial, Dialect::MySql) => "INTEGER AUTO_INCREMENT".into(),
            (ColumnType::Serial, Dialect::Sqlite) => "INTEGER".into(),
            (ColumnType::Integer, _) => "INTEGER".into(),
            (ColumnType::BigInteger, _) => "BIGINT".into(),
            (ColumnType::Decimal { precision, scale }, _) => {
                format!("DECIMAL({}, {})", precision, scale)
            }
            (ColumnType::Double, Dialect::Postgres) => "DOUBLE PRECISION".into(),
            (ColumnType::Double, Dialect::MySql) => "DOUBLE".into(),
            (ColumnType::Double, Dialect::Sqlite) => "REAL".into(),
            (ColumnType::Boolean, _) => "BOOLEAN".into(),
            (ColumnType::Varchar { length }, _) => format!("VARCHAR({})", length),
            (ColumnType::Text, _) => "TEXT".into(),
            (ColumnType::Date, _) => "DATE".into(),
            (ColumnType::Timestamp, Dialect::MySql) => "DATETIME".into(),
            (ColumnType::Timestamp, _) => "TIMESTAMP".into(),
            (ColumnType::Uuid, Dialect::Postgres) => "UUID".into(),
            (ColumnType::Uuid, Dialect::MySql) => "CHAR(36)".into(),
            (ColumnType::Uuid, Dialect::Sqlite) => "TEXT".into(),
        }
    }

    /// Type name a bound text parameter has to be cast to before the
    /// dialect accepts it for this column.
    pub fn parameter_cast(&self, dialect: Dialect) -> Option<&'static str> {
        match (self, dialect) {
            (ColumnType::Date, Dialect::Postgres) => Some("DATE"),
            (ColumnType::Timestamp, Dialect::Postgres) => Some("TIMESTAMP"),
            (ColumnType::Uuid, Dialect::Postgres) => Some("UUID"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    /// Raw SQL default expression, e.g. `CURRENT_TIMESTAMP` or `'new'`.
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub unique: bool,
    /// Seed rows that leave this column out get a fresh v4 UUID.
    #[serde(default)]
    pub auto_uuid: bool,
}

fn default_nullable() -> bool {
    true
}

impl ColumnSpec {
    pub fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            nullable: true,
            default: None,
            primary: false,
            unique: false,
            auto_uuid: false,
        }
    }

    /// `SERIAL` primary key column.
    pub fn id(name: &str) -> Self {
        Self::new(name, ColumnType::Serial).primary_key()
    }

    pub fn primary_key(mut self) -> Self {
        self.primary = true;
        self.nullable = false;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default_sql(mut self, expression: &str) -> Self {
        self.default = Some(expression.to_string());
        self
    }

    pub fn auto_uuid(mut self) -> Self {
        self.auto_uuid = true;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDelete {
    #[default]
    NoAction,
    Restrict,
    Cascade,
    SetNull,
}

impl OnDelete {
    pub fn sql(&self) -> &'static str {
        match self {
            OnDelete::NoAction => "NO ACTION",
            OnDelete::Restrict => "RESTRICT",
            OnDelete::Cascade => "CASCADE",
            OnDelete::SetNull => "SET NULL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub column: String,
    pub references_table: String,
    pub references_column: String,
    #[serde(default)]
    pub on_delete: OnDelete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

/// Declarative shape of one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
}

impl TableDefinition {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    pub fn foreign_key(
        mut self,
        column: &str,
        references_table: &str,
        references_column: &str,
        on_delete: OnDelete,
    ) -> Self {
        self.foreign_keys.push(ForeignKey {
            column: column.to_string(),
            references_table: references_table.to_string(),
            references_column: references_column.to_string(),
            on_delete,
        });
        self
    }

    pub fn index(mut self, name: &str, columns: &[&str], unique: bool) -> Self {
        self.indexes.push(IndexSpec {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique,
        });
        self
    }

    pub fn find_column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Tables this one has to wait for, self references excluded.
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.foreign_keys
            .iter()
            .map(|fk| fk.references_table.as_str())
            .filter(move |target| *target != self.name)
    }
}
