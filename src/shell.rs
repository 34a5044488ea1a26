//! Shell - line-oriented command interpreter
//!
//! Each command is parsed into table/database operations and rendered to a
//! string; the binary does the printing. Mutations run against a staged copy
//! of the open database, which replaces it only once the snapshot is on
//! disk, so a rejected or unpersisted command never changes the open
//! database.

use std::fs;

use crate::config::Config;
use crate::database::Database;
use crate::error::{LumaError, Result};
use crate::index::IndexKind;
use crate::schema::{is_valid_name, Column};
use crate::table::{Predicate, Table};
use crate::types::Row;

pub const HELP: &str = "\
Available commands:
  create database <name>
  use <database>
  create table <name> <col:TYPE[,PK|NN|UNIQUE|INDEX|DEFAULT=<v>]> ...
  create index <table> <column> [hash|btree]
  insert <table> <col1>=<val1> <col2>=<val2> ...
  select <table> [<col>=<val> ...]
  tables - list all tables
  show <table> - show table details
  help - show this help
  exit/quit - exit the program
Types: STRING, INTEGER, FLOAT, BOOLEAN, BLOB";

/// Result of one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Keep reading; the text is the command's output (possibly empty)
    Continue(String),
    Exit,
}

pub struct Shell {
    config: Config,
    current: Option<Database>,
}

impl Shell {
    pub fn new(config: Config) -> Self {
        Self { config, current: None }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn current_database(&self) -> Option<&Database> {
        self.current.as_ref()
    }

    pub fn prompt(&self) -> String {
        match &self.current {
            Some(db) => format!("luma({})> ", db.name()),
            None => "luma> ".to_string(),
        }
    }

    /// Run one input line
    pub fn execute(&mut self, line: &str) -> Result<Outcome> {
        let result = self.dispatch(line);
        if let Err(e) = &result {
            tracing::warn!(command = line.trim(), error = %e, "command rejected");
        }
        result
    }

    fn dispatch(&mut self, line: &str) -> Result<Outcome> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = tokens.split_first() else {
            return Ok(Outcome::Continue(String::new()));
        };

        let output = match command.to_ascii_lowercase().as_str() {
            "help" => HELP.to_string(),
            "exit" | "quit" => return Ok(Outcome::Exit),
            "create" => match args {
                ["database", name] => self.create_database(name)?,
                ["table", name, specs @ ..] => self.create_table(name, specs)?,
                ["index", table, column] => self.create_index(table, column, IndexKind::Hash)?,
                ["index", table, column, kind] => self.create_index(table, column, kind.parse()?)?,
                _ => return Err(usage("create database <name> | create table <name> <col:TYPE>... | create index <table> <column> [hash|btree]")),
            },
            "use" => match args {
                [name] => self.use_database(name)?,
                _ => return Err(usage("use <database>")),
            },
            "insert" => match args {
                [table, pairs @ ..] if !pairs.is_empty() => self.insert(table, pairs)?,
                _ => return Err(usage("insert <table> <col>=<val> ...")),
            },
            "select" => match args {
                [table, conditions @ ..] => self.select(table, conditions)?,
                _ => return Err(usage("select <table> [<col>=<val> ...]")),
            },
            "tables" => self.list_tables()?,
            "show" => match args {
                [table] => self.show_table(table)?,
                _ => return Err(usage("show <table>")),
            },
            other => {
                return Err(LumaError::Command(format!(
                    "unknown command: {}. Type 'help' for available commands.",
                    other
                )))
            }
        };

        Ok(Outcome::Continue(output))
    }

    fn create_database(&mut self, name: &str) -> Result<String> {
        check_name("database", name)?;
        let path = self.config.snapshot_path(name);
        if path.exists() {
            return Err(LumaError::DatabaseExists(name.to_string()));
        }

        fs::create_dir_all(&self.config.data_dir)?;
        let db = Database::with_options(name, self.config.table_options());
        db.save_to(&path)?;
        self.current = Some(db);

        tracing::info!(database = name, path = %path.display(), "database created");
        Ok(format!("Created database: {}", name))
    }

    fn use_database(&mut self, name: &str) -> Result<String> {
        check_name("database", name)?;
        let path = self.config.snapshot_path(name);
        if !path.exists() {
            return Err(LumaError::DatabaseNotFound(name.to_string()));
        }

        let db = Database::load_from(&path, self.config.table_options())?;
        self.current = Some(db);

        tracing::info!(database = name, "database opened");
        Ok(format!("Using database: {}", name))
    }

    fn create_table(&mut self, name: &str, specs: &[&str]) -> Result<String> {
        check_name("table", name)?;
        let columns = specs
            .iter()
            .map(|spec| Column::parse(spec))
            .collect::<Result<Vec<_>>>()?;

        self.commit(|db| db.create_table(name, columns).map(|_| ()))?;
        Ok(format!("Created table: {}", name))
    }

    fn create_index(&mut self, table: &str, column: &str, kind: IndexKind) -> Result<String> {
        self.commit(|db| db.table_mut(table)?.create_index(column, kind))?;
        Ok(format!("Created {} index on {}.{}", kind, table, column))
    }

    fn insert(&mut self, table_name: &str, pairs: &[&str]) -> Result<String> {
        let position = self.commit(|db| {
            let table = db.table_mut(table_name)?;
            let row = parse_assignments(table, pairs)?;
            table.insert(row)
        })?;
        Ok(format!("Data inserted successfully (row {})", position))
    }

    fn select(&self, table_name: &str, conditions: &[&str]) -> Result<String> {
        let table = self.database()?.table(table_name)?;
        let predicate: Predicate = parse_assignments(table, conditions)?.into_inner();
        let rows = table.select(&predicate)?;

        let mut out: String = rows.iter().map(|row| format!("{}\n", row)).collect();
        let noun = if rows.len() == 1 { "row" } else { "rows" };
        out.push_str(&format!("({} {})", rows.len(), noun));
        Ok(out)
    }

    fn list_tables(&self) -> Result<String> {
        let db = self.database()?;
        if db.is_empty() {
            return Ok("No tables".to_string());
        }
        let mut out = String::from("Tables:");
        for name in db.table_names() {
            out.push_str("\n- ");
            out.push_str(name);
        }
        Ok(out)
    }

    fn show_table(&self, name: &str) -> Result<String> {
        let table = self.database()?.table(name)?;
        let stats = table.cache_stats();

        let mut out = format!("Table: {}\nColumns:", table.name());
        for column in table.columns() {
            out.push_str(&format!("\n  - {}", column));
        }
        out.push_str("\nIndexes:");
        for (column, kind) in table.indexes() {
            out.push_str(&format!("\n  - {} ({})", column, kind));
        }
        out.push_str(&format!(
            "\nRow count: {}\nCache: {} hits, {} misses, {} evictions",
            table.row_count(),
            stats.hits,
            stats.misses,
            stats.evictions
        ));
        if let Some(row) = table.row(0) {
            out.push_str(&format!("\nSample row:\n{}", row));
        }
        Ok(out)
    }

    fn database(&self) -> Result<&Database> {
        self.current.as_ref().ok_or(LumaError::NoDatabaseSelected)
    }

    /// Apply `change` to a copy of the open database, write its snapshot,
    /// then swap the copy in. Any failure leaves the open database as it was.
    fn commit<T>(&mut self, change: impl FnOnce(&mut Database) -> Result<T>) -> Result<T> {
        let mut staged = self.database()?.clone();
        let outcome = change(&mut staged)?;
        staged.save_to(self.config.snapshot_path(staged.name()))?;
        self.current = Some(staged);
        Ok(outcome)
    }
}

/// Parse `col=value` tokens, converting each value with its column's type
fn parse_assignments(table: &Table, tokens: &[&str]) -> Result<Row> {
    let mut row = Row::new();
    for token in tokens {
        let (column, raw) = token
            .split_once('=')
            .filter(|(column, _)| !column.is_empty())
            .ok_or_else(|| LumaError::Command(format!("invalid format for {}, expected <col>=<val>", token)))?;
        let ty = table
            .column(column)
            .ok_or_else(|| LumaError::ColumnNotFound(column.to_string()))?
            .ty;
        row.insert(column, ty.parse_value(raw)?);
    }
    Ok(row)
}

/// Names end up in file paths; keep them to a safe alphabet
fn check_name(kind: &str, name: &str) -> Result<()> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(LumaError::Command(format!("invalid {} name: {}", kind, name)))
    }
}

fn usage(text: &str) -> LumaError {
    LumaError::Command(format!("usage: {}", text))
}
