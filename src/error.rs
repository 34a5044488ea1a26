//! Error types for the LumaDB table engine

use thiserror::Error;

/// Result type for table engine operations
pub type Result<T> = std::result::Result<T, LumaError>;

/// Table engine error types
#[derive(Error, Debug)]
pub enum LumaError {
    // Schema errors
    #[error("database {0} already exists")]
    DatabaseExists(String),

    #[error("database {0} does not exist")]
    DatabaseNotFound(String),

    #[error("no database selected")]
    NoDatabaseSelected,

    #[error("table {0} already exists")]
    TableExists(String),

    #[error("table {0} does not exist")]
    TableNotFound(String),

    #[error("column {0} does not exist")]
    ColumnNotFound(String),

    #[error("column {0} is declared more than once")]
    DuplicateColumn(String),

    #[error("table declares more than one primary key: {0} and {1}")]
    MultiplePrimaryKeys(String, String),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    // Constraint violations
    #[error("column {column} cannot be null")]
    NotNull { column: String },

    #[error("duplicate value in unique column {column}")]
    UniqueViolation { column: String },

    #[error("primary key {column} cannot be null")]
    PrimaryKeyNull { column: String },

    #[error("duplicate primary key value in {column}")]
    PrimaryKeyViolation { column: String },

    // Type errors
    #[error("missing value for column: {column}")]
    MissingValue { column: String },

    #[error("invalid type for column {column}: expected {expected}, got {actual}")]
    TypeMismatch {
        column: String,
        expected: String,
        actual: String,
    },

    #[error("cannot convert {raw:?} to {ty}: {reason}")]
    Conversion {
        ty: String,
        raw: String,
        reason: String,
    },

    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    // Index errors
    #[error("index error: {0}")]
    IndexCorrupted(String),

    #[error("{kind} index already exists on column {column}")]
    IndexExists { column: String, kind: String },

    // Storage errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("snapshot corruption detected: {0}")]
    Corruption(String),

    // Configuration errors
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // Interpreter errors
    #[error("{0}")]
    Command(String),
}

impl From<bincode::Error> for LumaError {
    fn from(e: bincode::Error) -> Self {
        LumaError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for LumaError {
    fn from(e: serde_json::Error) -> Self {
        LumaError::InvalidConfig(e.to_string())
    }
}

impl From<toml::de::Error> for LumaError {
    fn from(e: toml::de::Error) -> Self {
        LumaError::InvalidConfig(e.to_string())
    }
}

impl LumaError {
    /// Check if the error is a rejected row constraint
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            LumaError::NotNull { .. }
                | LumaError::UniqueViolation { .. }
                | LumaError::PrimaryKeyNull { .. }
                | LumaError::PrimaryKeyViolation { .. }
        )
    }

    /// Check if the error concerns table or database naming and layout
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            LumaError::DatabaseExists(_)
                | LumaError::DatabaseNotFound(_)
                | LumaError::NoDatabaseSelected
                | LumaError::TableExists(_)
                | LumaError::TableNotFound(_)
                | LumaError::ColumnNotFound(_)
                | LumaError::DuplicateColumn(_)
                | LumaError::MultiplePrimaryKeys(..)
                | LumaError::InvalidSchema(_)
        )
    }

    /// Check if the error is a value/type problem
    pub fn is_type_error(&self) -> bool {
        matches!(
            self,
            LumaError::MissingValue { .. }
                | LumaError::TypeMismatch { .. }
                | LumaError::Conversion { .. }
                | LumaError::UnsupportedType(_)
        )
    }

    /// Stable numeric error code
    pub fn code(&self) -> i32 {
        match self {
            LumaError::DatabaseExists(_) => 1,
            LumaError::DatabaseNotFound(_) => 2,
            LumaError::NoDatabaseSelected => 3,
            LumaError::TableExists(_) => 4,
            LumaError::TableNotFound(_) => 5,
            LumaError::ColumnNotFound(_) => 6,
            LumaError::DuplicateColumn(_) => 7,
            LumaError::MultiplePrimaryKeys(..) => 8,
            LumaError::InvalidSchema(_) => 9,
            LumaError::NotNull { .. } => 20,
            LumaError::UniqueViolation { .. } => 21,
            LumaError::PrimaryKeyNull { .. } => 22,
            LumaError::PrimaryKeyViolation { .. } => 23,
            LumaError::MissingValue { .. } => 40,
            LumaError::TypeMismatch { .. } => 41,
            LumaError::Conversion { .. } => 42,
            LumaError::UnsupportedType(_) => 43,
            LumaError::IndexCorrupted(_) => 60,
            LumaError::IndexExists { .. } => 61,
            LumaError::Io(_) => 80,
            LumaError::Serialization(_) => 81,
            LumaError::Corruption(_) => 82,
            LumaError::InvalidConfig(_) => 83,
            LumaError::Command(_) => 99,
        }
    }
}
