use thiserror::Error;

/// SQLSTATE for "table already exists" on PostgreSQL.
const PG_DUPLICATE_TABLE: &str = "42P07";
/// SQLSTATE for "relation already exists" on PostgreSQL indexes.
const PG_DUPLICATE_OBJECT: &str = "42710";
/// SQLSTATE for "table already exists" on MySQL and MariaDB.
const MYSQL_TABLE_EXISTS: &str = "42S01";

/// A failure reported by the database collaborator, already sorted into the
/// kinds the reconciler and the seed loader act on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DbError {
    /// The connection is unusable. Aborts the whole run.
    #[error("connection error: {0}")]
    Connection(String),

    /// The object being created is already there.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A unique or primary key constraint rejected the row.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// Foreign key, not-null or check constraint rejected the statement.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Bad SQL, unknown table/column, type mismatch and everything else.
    #[error("syntax or schema error: {0}")]
    SyntaxOrSchema(String),
}

impl DbError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, DbError::Connection(_))
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind;

        match &err {
            sqlx::Error::Database(db) => {
                let message = db.message().to_string();
                match db.kind() {
                    ErrorKind::UniqueViolation => DbError::DuplicateKey(message),
                    ErrorKind::ForeignKeyViolation
                    | ErrorKind::NotNullViolation
                    | ErrorKind::CheckViolation => DbError::ConstraintViolation(message),
                    _ => classify_sqlstate(db.code().as_deref(), message),
                }
            }
            sqlx::Error::Configuration(_)
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => DbError::Connection(err.to_string()),
            _ => DbError::SyntaxOrSchema(err.to_string()),
        }
    }
}

fn classify_sqlstate(code: Option<&str>, message: String) -> DbError {
    match code {
        Some(PG_DUPLICATE_TABLE | PG_DUPLICATE_OBJECT | MYSQL_TABLE_EXISTS) => {
            DbError::AlreadyExists(message)
        }
        Some(code) if code.starts_with("08") => DbError::Connection(message),
        Some(code) if code.starts_with("23") => DbError::ConstraintViolation(message),
        _ => DbError::SyntaxOrSchema(message),
    }
}

/// Invalid connection settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid database url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported database url scheme `{0}`, expected mysql, postgres or sqlite")]
    UnsupportedScheme(String),

    #[error("cannot put credentials into database url `{0}`")]
    CredentialsRejected(String),
}

#[derive(Debug, Error)]
pub enum CrmSeedError {
    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("io error: `{0}`")]
    Io(#[from] std::io::Error),

    #[error("invalid json input: `{0}`")]
    Json(#[from] serde_json::Error),
}

impl From<sqlx::Error> for CrmSeedError {
    fn from(err: sqlx::Error) -> Self {
        CrmSeedError::Database(err.into())
    }
}

pub type Result<T = ()> = std::result::Result<T, CrmSeedError>;
