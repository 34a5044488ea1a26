//! LumaDB Table Engine
//!
//! A small embedded, in-memory table store with typed columns, row
//! constraints, secondary indexes and a per-table query result cache.
//!
//! # Key Features
//!
//! - **Constraints**: NOT NULL, UNIQUE and PRIMARY KEY checked before a row
//!   becomes visible; a rejected insert changes nothing
//! - **Indexes**: hash indexes and B-tree (degree 4) ordered indexes, kept in
//!   step with every insert
//! - **Result Cache**: thread-safe LRU keyed by the query, never stale
//! - **Snapshots**: whole-database save/load with index rebuild
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  Shell (command interpreter)        bin/lumatable    │
//! ├──────────────────────────────────────────────────────┤
//! │  Database ──► Table ──► rows: Vec<Row>               │
//! │                  │                                   │
//! │                  ├──► HashIndex     (value → rows)   │
//! │                  ├──► OrderedIndex  (BTree)          │
//! │                  └──► LruCache      (query → rows)   │
//! ├──────────────────────────────────────────────────────┤
//! │  Snapshot (magic + bincode, atomic rename)           │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use luma_table::{Column, ColumnType, Database, Predicate, Row, Value};
//!
//! let mut db = Database::new("shop");
//! let users = db
//!     .create_table(
//!         "users",
//!         vec![
//!             Column::new("id", ColumnType::Integer).primary_key(),
//!             Column::new("name", ColumnType::String).not_null(),
//!         ],
//!     )
//!     .unwrap();
//!
//! users.insert(Row::new().with("id", 1).with("name", "alice")).unwrap();
//!
//! let mut predicate = Predicate::new();
//! predicate.insert("id".to_string(), Value::Int(1));
//! assert_eq!(users.select(&predicate).unwrap().len(), 1);
//! ```

pub mod btree;
pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod index;
pub mod schema;
pub mod shell;
pub mod snapshot;
pub mod table;
pub mod types;

// Re-exports
pub use btree::BTree;
pub use cache::{CacheStats, LruCache};
pub use config::Config;
pub use database::Database;
pub use error::{LumaError, Result};
pub use index::{HashIndex, IndexKind, OrderedIndex, RowIndex};
pub use schema::Column;
pub use shell::{Outcome, Shell};
pub use table::{Predicate, QueryPlan, QueryResult, Table, TableOptions};
pub use types::{ColumnType, Row, RowPosition, Value};
