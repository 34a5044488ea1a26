//! Snapshot - whole-database save and load
//!
//! File layout:
//!
//! ```text
//! +----------------+-------------------------------------------+
//! | magic (8 B)    | bincode(SnapshotFile)                     |
//! | "LUMATBL1"     | version, name, saved_at, tables[...]      |
//! +----------------+-------------------------------------------+
//! ```
//!
//! Indexes are recorded by column and kind only and rebuilt from rows on
//! load; result caches are never stored. A snapshot is written to a
//! temporary sibling and renamed into place, so readers see either the old
//! file or the new one.

use bincode::Options;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::database::Database;
use crate::error::{LumaError, Result};
use crate::index::IndexKind;
use crate::schema::Column;
use crate::table::{Table, TableOptions};
use crate::types::Row;

pub const MAGIC: &[u8; 8] = b"LUMATBL1";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    name: String,
    saved_at: DateTime<Utc>,
    tables: Vec<TableImage>,
}

#[derive(Serialize, Deserialize)]
struct TableImage {
    name: String,
    columns: Vec<Column>,
    rows: Vec<Row>,
    indexes: Vec<(String, IndexKind)>,
}

/// Serialize `db` to `path`
pub fn write(db: &Database, path: &Path) -> Result<()> {
    let image = SnapshotFile {
        version: FORMAT_VERSION,
        name: db.name().to_string(),
        saved_at: Utc::now(),
        tables: db
            .tables()
            .map(|table| TableImage {
                name: table.name().to_string(),
                columns: table.columns().to_vec(),
                rows: table.rows().to_vec(),
                indexes: table.indexes(),
            })
            .collect(),
    };

    let staging = staging_path(path);
    {
        let mut writer = BufWriter::new(File::create(&staging)?);
        writer.write_all(MAGIC)?;
        codec().serialize_into(&mut writer, &image)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }
    fs::rename(&staging, path)?;

    tracing::info!(
        database = %image.name,
        tables = image.tables.len(),
        path = %path.display(),
        "snapshot written"
    );
    Ok(())
}

/// Deserialize a database from `path`, rebuilding indexes and caches
pub fn read(path: &Path, options: TableOptions) -> Result<Database> {
    let file = File::open(path)?;
    let payload_len = file.metadata()?.len().saturating_sub(MAGIC.len() as u64);
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 8];
    reader
        .read_exact(&mut magic)
        .map_err(|_| LumaError::Corruption("snapshot too short".into()))?;
    if &magic != MAGIC {
        return Err(LumaError::Corruption("invalid snapshot header".into()));
    }

    // Length prefixes can never claim more than the file holds
    let image: SnapshotFile = codec()
        .with_limit(payload_len)
        .deserialize_from(&mut reader)
        .map_err(|e| LumaError::Corruption(format!("undecodable snapshot: {}", e)))?;
    if image.version != FORMAT_VERSION {
        return Err(LumaError::Corruption(format!(
            "unsupported snapshot version {}",
            image.version
        )));
    }

    let mut db = Database::with_options(image.name, options);
    for table in image.tables {
        let table = Table::restore(table.name, table.columns, table.rows, &table.indexes, options)?;
        db.attach_table(table)?;
    }

    tracing::info!(
        database = %db.name(),
        tables = db.len(),
        saved_at = %image.saved_at,
        "snapshot loaded"
    );
    Ok(db)
}

/// Bincode settings shared by writer and reader
fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staging_path() {
        assert_eq!(
            staging_path(Path::new("/data/shop.ltb")),
            PathBuf::from("/data/shop.ltb.tmp")
        );
    }

    #[test]
    fn test_rejects_foreign_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.ltb");
        fs::write(&path, b"NOT A SNAPSHOT AT ALL").unwrap();

        let err = read(&path, TableOptions::default()).unwrap_err();
        assert!(matches!(err, LumaError::Corruption(_)));
    }

    #[test]
    fn test_rejects_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.ltb");
        fs::write(&path, b"LUMA").unwrap();

        assert!(matches!(
            read(&path, TableOptions::default()),
            Err(LumaError::Corruption(_))
        ));
    }

    #[test]
    fn test_rejects_oversized_length_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.ltb");

        // Valid header and version, then a name claiming ~2^63 bytes
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&(u64::MAX / 2).to_le_bytes());
        fs::write(&path, &bytes).unwrap();

        let err = read(&path, TableOptions::default()).unwrap_err();
        assert!(matches!(err, LumaError::Corruption(_)));
    }

    #[test]
    fn test_round_trip_with_bounded_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shop.ltb");

        let mut db = Database::new("shop");
        db.create_table("t", vec![Column::new("id", crate::types::ColumnType::Integer)])
            .unwrap()
            .insert(Row::new().with("id", 7))
            .unwrap();
        write(&db, &path).unwrap();

        let restored = read(&path, TableOptions::default()).unwrap();
        assert_eq!(restored.table("t").unwrap().rows(), db.table("t").unwrap().rows());
    }
}
