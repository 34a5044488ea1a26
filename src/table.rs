//! Table - row store, constraint enforcement, indexes and query resolution

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::btree::DEFAULT_DEGREE;
use crate::cache::{CacheStats, LruCache};
use crate::error::{LumaError, Result};
use crate::index::{populate, HashIndex, IndexKind, OrderedIndex, RowIndex};
use crate::schema::{validate_columns, Column};
use crate::types::{Row, RowPosition, Value};

/// Equality-only query condition: column name -> required value
///
/// An empty predicate matches every row.
pub type Predicate = BTreeMap<String, Value>;

/// Shared, immutable query result
pub type QueryResult = Arc<Vec<Row>>;

/// Default number of cached query results per table
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Per-table tuning
#[derive(Debug, Clone, Copy)]
pub struct TableOptions {
    pub cache_capacity: usize,
    pub btree_degree: usize,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            btree_degree: DEFAULT_DEGREE,
        }
    }
}

/// How a select is resolved when the cache misses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPlan {
    OrderedIndex(String),
    HashIndex(String),
    FullScan,
}

impl fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryPlan::OrderedIndex(column) => write!(f, "btree index on {}", column),
            QueryPlan::HashIndex(column) => write!(f, "hash index on {}", column),
            QueryPlan::FullScan => f.write_str("full scan"),
        }
    }
}

/// An append-only table
#[derive(Clone)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    rows: Vec<Row>,
    hash_indexes: HashMap<String, HashIndex>,
    ordered_indexes: HashMap<String, OrderedIndex>,
    cache: LruCache<String, QueryResult>,
    options: TableOptions,
}

impl Table {
    /// Create a table with default options
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Result<Self> {
        Self::with_options(name, columns, TableOptions::default())
    }

    /// Create a table; columns flagged `indexed` get a hash index and the
    /// primary key gets a B-tree index.
    pub fn with_options(
        name: impl Into<String>,
        columns: Vec<Column>,
        options: TableOptions,
    ) -> Result<Self> {
        validate_columns(&columns)?;

        let mut table = Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
            hash_indexes: HashMap::new(),
            ordered_indexes: HashMap::new(),
            cache: LruCache::new(options.cache_capacity),
            options,
        };

        let automatic: Vec<(String, IndexKind)> = table
            .columns
            .iter()
            .flat_map(|c| {
                let hash = c.indexed.then(|| (c.name.clone(), IndexKind::Hash));
                let ordered = c.primary_key.then(|| (c.name.clone(), IndexKind::Ordered));
                hash.into_iter().chain(ordered)
            })
            .collect();
        for (column, kind) in automatic {
            table.create_index(&column, kind)?;
        }

        Ok(table)
    }

    /// Rebuild a table from stored rows, re-creating every listed index.
    ///
    /// Rows are taken as-is; they were validated when first inserted.
    pub fn restore(
        name: impl Into<String>,
        columns: Vec<Column>,
        rows: Vec<Row>,
        indexes: &[(String, IndexKind)],
        options: TableOptions,
    ) -> Result<Self> {
        let mut table = Self::with_options(name, columns, options)?;
        table.rows = rows;
        table.rebuild_indexes();
        for (column, kind) in indexes {
            if !table.has_index(column, *kind) {
                table.create_index(column, *kind)?;
            }
        }
        Ok(table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_key(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.primary_key)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, position: RowPosition) -> Option<&Row> {
        self.rows.get(position)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn options(&self) -> TableOptions {
        self.options
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Every index on the table, sorted by column then kind
    pub fn indexes(&self) -> Vec<(String, IndexKind)> {
        let mut indexes: Vec<(String, IndexKind)> = self
            .hash_indexes
            .keys()
            .map(|c| (c.clone(), IndexKind::Hash))
            .chain(self.ordered_indexes.keys().map(|c| (c.clone(), IndexKind::Ordered)))
            .collect();
        indexes.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| (a.1 as u8).cmp(&(b.1 as u8))));
        indexes
    }

    pub fn has_index(&self, column: &str, kind: IndexKind) -> bool {
        match kind {
            IndexKind::Hash => self.hash_indexes.contains_key(column),
            IndexKind::Ordered => self.ordered_indexes.contains_key(column),
        }
    }

    /// Build an index over the current rows; later inserts keep it current.
    pub fn create_index(&mut self, column: &str, kind: IndexKind) -> Result<()> {
        if self.column(column).is_none() {
            return Err(LumaError::ColumnNotFound(column.to_string()));
        }
        if self.has_index(column, kind) {
            return Err(LumaError::IndexExists {
                column: column.to_string(),
                kind: kind.to_string(),
            });
        }

        match kind {
            IndexKind::Hash => {
                let mut index = HashIndex::new();
                populate(&mut index, column, &self.rows);
                self.hash_indexes.insert(column.to_string(), index);
            }
            IndexKind::Ordered => {
                let mut index = OrderedIndex::with_degree(self.options.btree_degree);
                populate(&mut index, column, &self.rows);
                self.ordered_indexes.insert(column.to_string(), index);
            }
        }

        tracing::debug!(table = %self.name, column, %kind, rows = self.rows.len(), "index built");
        Ok(())
    }

    /// Validate and append a row, returning its position.
    ///
    /// Defaults are applied first, then not-null, unique and primary-key
    /// constraints are checked column by column, then types. A rejected
    /// row leaves the table untouched.
    pub fn insert(&mut self, mut values: Row) -> Result<RowPosition> {
        if let Some(unknown) = values.columns().find(|c| self.column(c).is_none()) {
            return Err(LumaError::ColumnNotFound(unknown.clone()));
        }

        for column in &self.columns {
            if !values.contains(&column.name) {
                if let Some(default) = &column.default {
                    values.insert(column.name.clone(), default.clone());
                }
            }
        }

        self.check_constraints(&values)?;
        self.check_types(&values)?;

        let position = self.rows.len();
        for (column, index) in self.hash_indexes.iter_mut() {
            if let Some(value) = values.get(column) {
                index.insert(value, position);
            }
        }
        for (column, index) in self.ordered_indexes.iter_mut() {
            if let Some(value) = values.get(column) {
                index.insert(value, position);
            }
        }
        self.rows.push(values);

        tracing::trace!(table = %self.name, position, "row inserted");
        Ok(position)
    }

    /// Resolve an equality predicate, in row order.
    ///
    /// Order of resolution: result cache, B-tree index, hash index, full
    /// scan. Results are cached under a key that includes the row count,
    /// so appends never leave a stale entry reachable.
    pub fn select(&self, predicate: &Predicate) -> Result<QueryResult> {
        if let Some(unknown) = predicate.keys().find(|c| self.column(c).is_none()) {
            return Err(LumaError::ColumnNotFound(unknown.clone()));
        }

        let key = self.cache_key(predicate);
        if let Some(rows) = self.cache.get(&key) {
            tracing::trace!(table = %self.name, key = %key, "result cache hit");
            return Ok(rows);
        }

        let plan = self.plan(predicate);
        tracing::debug!(table = %self.name, %plan, "resolving select");

        let candidates = match &plan {
            QueryPlan::OrderedIndex(column) => Some(self.ordered_indexes[column].lookup(&predicate[column])),
            QueryPlan::HashIndex(column) => Some(self.hash_indexes[column].lookup(&predicate[column])),
            QueryPlan::FullScan => None,
        };

        let rows: Vec<Row> = match candidates {
            Some(positions) => {
                let mut rows = Vec::with_capacity(positions.len());
                for &position in positions {
                    let row = self.rows.get(position).ok_or_else(|| {
                        LumaError::IndexCorrupted(format!(
                            "{} index points at row {} of {}",
                            plan,
                            position,
                            self.rows.len()
                        ))
                    })?;
                    if matches_all(row, predicate) {
                        rows.push(row.clone());
                    }
                }
                rows
            }
            None => self
                .rows
                .iter()
                .filter(|row| matches_all(row, predicate))
                .cloned()
                .collect(),
        };

        let rows = Arc::new(rows);
        self.cache.set(key, Arc::clone(&rows));
        Ok(rows)
    }

    /// Choose how `predicate` would be resolved on a cache miss
    pub fn plan(&self, predicate: &Predicate) -> QueryPlan {
        if let Some(column) = predicate.keys().find(|c| self.ordered_indexes.contains_key(*c)) {
            return QueryPlan::OrderedIndex(column.clone());
        }
        if let Some(column) = predicate.keys().find(|c| self.hash_indexes.contains_key(*c)) {
            return QueryPlan::HashIndex(column.clone());
        }
        QueryPlan::FullScan
    }

    /// Deterministic cache key: row count, then `column=value;` pairs in
    /// column order.
    ///
    /// Column names cannot contain separators and string values are Debug
    /// quoted, so distinct predicates never share a key. Floats are keyed by
    /// bit pattern, which keeps `NaN` and `-NaN` apart.
    pub fn cache_key(&self, predicate: &Predicate) -> String {
        let mut key = format!("{}|", self.rows.len());
        for (column, value) in predicate {
            let encoded = match value {
                Value::Float(f) => format!("Float({:#018x})", f.to_bits()),
                other => format!("{:?}", other),
            };
            key.push_str(&format!("{}={};", column, encoded));
        }
        key
    }

    fn check_constraints(&self, values: &Row) -> Result<()> {
        for column in &self.columns {
            let present = values.get(&column.name).filter(|v| !v.is_null());

            if column.not_null && present.is_none() {
                return Err(LumaError::NotNull {
                    column: column.name.clone(),
                });
            }

            if column.unique {
                if let Some(value) = present {
                    if self.holds_value(&column.name, value) {
                        return Err(LumaError::UniqueViolation {
                            column: column.name.clone(),
                        });
                    }
                }
            }

            if column.primary_key {
                match present {
                    None => {
                        return Err(LumaError::PrimaryKeyNull {
                            column: column.name.clone(),
                        })
                    }
                    Some(value) if self.holds_value(&column.name, value) => {
                        return Err(LumaError::PrimaryKeyViolation {
                            column: column.name.clone(),
                        })
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }

    fn check_types(&self, values: &Row) -> Result<()> {
        for column in &self.columns {
            match values.get(&column.name) {
                None => {
                    return Err(LumaError::MissingValue {
                        column: column.name.clone(),
                    })
                }
                // Nullability was settled by the constraint pass
                Some(Value::Null) => {}
                Some(value) if !value.matches(column.ty) => {
                    return Err(LumaError::TypeMismatch {
                        column: column.name.clone(),
                        expected: column.ty.to_string(),
                        actual: value.type_name().to_string(),
                    })
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Whether any stored row holds `value` in `column`
    fn holds_value(&self, column: &str, value: &Value) -> bool {
        if let Some(index) = self.ordered_indexes.get(column) {
            return !index.lookup(value).is_empty();
        }
        if let Some(index) = self.hash_indexes.get(column) {
            return !index.lookup(value).is_empty();
        }
        self.rows.iter().any(|row| row.get(column) == Some(value))
    }

    fn rebuild_indexes(&mut self) {
        for (column, index) in self.hash_indexes.iter_mut() {
            *index = HashIndex::new();
            populate(index, column, &self.rows);
        }
        for (column, index) in self.ordered_indexes.iter_mut() {
            *index = OrderedIndex::with_degree(self.options.btree_degree);
            populate(index, column, &self.rows);
        }
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("columns", &self.columns)
            .field("rows", &self.rows.len())
            .field("indexes", &self.indexes())
            .finish()
    }
}

fn matches_all(row: &Row, predicate: &Predicate) -> bool {
    predicate
        .iter()
        .all(|(column, value)| row.get(column) == Some(value))
}
