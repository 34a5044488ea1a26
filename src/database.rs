//! Database - named collection of tables

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{LumaError, Result};
use crate::schema::Column;
use crate::snapshot;
use crate::table::{Table, TableOptions};

/// A named set of tables, owned by value and handed out by reference
#[derive(Debug, Clone)]
pub struct Database {
    name: String,
    tables: BTreeMap<String, Table>,
    options: TableOptions,
}

impl Database {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_options(name, TableOptions::default())
    }

    /// Create a database whose tables are built with `options`
    pub fn with_options(name: impl Into<String>, options: TableOptions) -> Self {
        Self {
            name: name.into(),
            tables: BTreeMap::new(),
            options,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> TableOptions {
        self.options
    }

    /// Create a table; fails if the name is taken
    pub fn create_table(&mut self, name: &str, columns: Vec<Column>) -> Result<&mut Table> {
        if self.tables.contains_key(name) {
            return Err(LumaError::TableExists(name.to_string()));
        }
        let table = Table::with_options(name, columns, self.options)?;
        tracing::debug!(database = %self.name, table = name, "table created");
        Ok(self.tables.entry(name.to_string()).or_insert(table))
    }

    /// Add an already built table, e.g. one restored from a snapshot
    pub fn attach_table(&mut self, table: Table) -> Result<()> {
        if self.tables.contains_key(table.name()) {
            return Err(LumaError::TableExists(table.name().to_string()));
        }
        self.tables.insert(table.name().to_string(), table);
        Ok(())
    }

    pub fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| LumaError::TableNotFound(name.to_string()))
    }

    pub fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| LumaError::TableNotFound(name.to_string()))
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Table names in sorted order
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Write the whole database to `path`, replacing any previous snapshot
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        snapshot::write(self, path.as_ref())
    }

    /// Load a database written by [`Database::save_to`]
    pub fn load_from(path: impl AsRef<Path>, options: TableOptions) -> Result<Self> {
        snapshot::read(path.as_ref(), options)
    }
}
