//! Column definitions and schema validation

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::{LumaError, Result};
use crate::types::{ColumnType, Value};

/// A table column and its constraints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
    /// Maintain a hash index on this column
    pub indexed: bool,
    pub primary_key: bool,
    pub not_null: bool,
    pub unique: bool,
    /// Applied when an inserted row omits the column
    pub default: Option<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            indexed: false,
            primary_key: false,
            not_null: false,
            unique: false,
            default: None,
        }
    }

    /// Mark as primary key; implies not-null
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.not_null = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Parse `name:TYPE[,PK|NN|UNIQUE|INDEX|DEFAULT=<value>]...`
    pub fn parse(spec: &str) -> Result<Self> {
        let (name, rest) = spec
            .split_once(':')
            .ok_or_else(|| LumaError::InvalidSchema(format!("invalid column format: {}", spec)))?;
        if name.is_empty() {
            return Err(LumaError::InvalidSchema(format!("missing column name: {}", spec)));
        }
        if !is_valid_name(name) {
            return Err(LumaError::InvalidSchema(format!("invalid column name: {}", name)));
        }

        let mut parts = rest.split(',');
        let ty = parts.next().unwrap_or_default().parse::<ColumnType>()?;
        let mut column = Column::new(name, ty);

        for flag in parts {
            if let Some((key, raw)) = flag.split_once('=') {
                if !key.eq_ignore_ascii_case("DEFAULT") {
                    return Err(LumaError::InvalidSchema(format!("unknown column option: {}", key)));
                }
                column.default = Some(ty.parse_value(raw)?);
                continue;
            }
            column = match flag.to_ascii_uppercase().as_str() {
                "PK" => column.primary_key(),
                "NN" => column.not_null(),
                "UNIQUE" => column.unique(),
                "INDEX" => column.indexed(),
                other => {
                    return Err(LumaError::InvalidSchema(format!("unknown constraint: {}", other)))
                }
            };
        }

        Ok(column)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.ty)?;
        if self.primary_key {
            f.write_str(" PRIMARY KEY")?;
        } else if self.not_null {
            f.write_str(" NOT NULL")?;
        }
        if self.unique {
            f.write_str(" UNIQUE")?;
        }
        if self.indexed {
            f.write_str(" INDEXED")?;
        }
        if let Some(default) = &self.default {
            write!(f, " DEFAULT {}", default)?;
        }
        Ok(())
    }
}

/// Names of columns, tables and databases: non-empty `[A-Za-z0-9_-]`
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Check a column list before a table is created from it
pub fn validate_columns(columns: &[Column]) -> Result<()> {
    if columns.is_empty() {
        return Err(LumaError::InvalidSchema("a table needs at least one column".into()));
    }

    let mut seen = HashSet::new();
    let mut primary: Option<&str> = None;
    for column in columns {
        if !is_valid_name(&column.name) {
            return Err(LumaError::InvalidSchema(format!("invalid column name: {}", column.name)));
        }
        if !seen.insert(column.name.as_str()) {
            return Err(LumaError::DuplicateColumn(column.name.clone()));
        }
        if column.primary_key {
            if let Some(first) = primary {
                return Err(LumaError::MultiplePrimaryKeys(first.to_string(), column.name.clone()));
            }
            primary = Some(column.name.as_str());
        }
        if let Some(default) = &column.default {
            if !default.is_null() && !default.matches(column.ty) {
                return Err(LumaError::TypeMismatch {
                    column: column.name.clone(),
                    expected: column.ty.to_string(),
                    actual: default.type_name().to_string(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_column() {
        let column = Column::parse("id:INTEGER,PK").unwrap();
        assert_eq!(column.name, "id");
        assert_eq!(column.ty, ColumnType::Integer);
        assert!(column.primary_key && column.not_null);

        let column = Column::parse("email:string,nn,unique,index").unwrap();
        assert!(column.not_null && column.unique && column.indexed);
        assert!(!column.primary_key);

        let column = Column::parse("active:BOOLEAN,DEFAULT=true").unwrap();
        assert_eq!(column.default, Some(Value::Bool(true)));
    }

    #[test]
    fn test_parse_column_errors() {
        assert!(matches!(Column::parse("id"), Err(LumaError::InvalidSchema(_))));
        assert!(matches!(Column::parse(":INTEGER"), Err(LumaError::InvalidSchema(_))));
        assert!(matches!(Column::parse("id:UUID"), Err(LumaError::UnsupportedType(_))));
        assert!(matches!(Column::parse("id:INTEGER,AUTO"), Err(LumaError::InvalidSchema(_))));
        assert!(matches!(Column::parse("a;b=1:INTEGER"), Err(LumaError::InvalidSchema(_))));
        assert!(Column::parse("n:INTEGER,DEFAULT=abc").unwrap_err().is_type_error());
    }

    #[test]
    fn test_validate_columns() {
        let ok = vec![
            Column::new("id", ColumnType::Integer).primary_key(),
            Column::new("name", ColumnType::String).not_null(),
        ];
        assert!(validate_columns(&ok).is_ok());

        assert!(validate_columns(&[]).is_err());

        let duplicate = vec![
            Column::new("id", ColumnType::Integer),
            Column::new("id", ColumnType::String),
        ];
        assert!(matches!(validate_columns(&duplicate), Err(LumaError::DuplicateColumn(_))));

        let two_keys = vec![
            Column::new("a", ColumnType::Integer).primary_key(),
            Column::new("b", ColumnType::Integer).primary_key(),
        ];
        assert!(matches!(
            validate_columns(&two_keys),
            Err(LumaError::MultiplePrimaryKeys(..))
        ));

        // Separator characters would make cache keys ambiguous
        for name in ["x=Int(1);y", "a b", ""] {
            let columns = vec![Column::new(name, ColumnType::Integer)];
            assert!(matches!(validate_columns(&columns), Err(LumaError::InvalidSchema(_))));
        }
        assert!(is_valid_name("order_id-2"));

        let bad_default = vec![Column::new("n", ColumnType::Integer).default_value("x")];
        assert!(matches!(
            validate_columns(&bad_default),
            Err(LumaError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_display() {
        let column = Column::new("id", ColumnType::Integer).primary_key().indexed();
        assert_eq!(column.to_string(), "id INTEGER PRIMARY KEY INDEXED");
    }
}
