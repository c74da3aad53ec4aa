//! # Tables
//!
//! A table is a directory. The control block `table.meta` describes the
//! whole table: its keyword set, its data managers, and one control block
//! per column. Each persistent manager keeps its cells in its own data
//! file next to it:
//!
//! ```text
//! <table dir>/
//!   table.meta    64-byte header + typed-stream control body
//!   dm0.dat       StandardManager data file (one per manager seqnr)
//! ```
//!
//! ## Lifecycle
//!
//! `create` builds the directory and writes the initial (empty) state;
//! `open` reconstructs everything from the control block. Nothing is
//! persisted implicitly: changes reach disk on `flush` (or `close`, which
//! flushes), and reopening an unflushed table sees the last flushed state.
//! `resync` discards in-memory state and reloads the table from disk, for
//! when another process replaced the files underneath this instance.

pub mod column_set;
pub mod header;

use crate::column::{PlainColumn, TableDesc};
use crate::keywords::KeywordSet;
use crate::stream::{Encoding, TypedReader, TypedWriter};
use column_set::ColumnSet;
use eyre::{ensure, Result, WrapErr};
use header::{MetaFileHeader, FILE_HEADER_SIZE};
use std::fs;
use std::path::{Path, PathBuf};
use zerocopy::IntoBytes;

/// Control block file name inside every table directory.
pub const META_FILE: &str = "table.meta";

/// A persistent, self-describing table of typed columns.
#[derive(Debug)]
pub struct Table {
    dir: PathBuf,
    writable: bool,
    encoding: Encoding,
    columns: ColumnSet,
}

impl Table {
    /// Creates a new table with every column on one standard manager and
    /// the canonical (portable) encoding.
    pub fn create(dir: impl AsRef<Path>, desc: &TableDesc) -> Result<Table> {
        Table::create_with_bindings(dir, desc, &[], Encoding::Canonical)
    }

    /// Creates a new table, directing the named columns to a non-persistent
    /// memory manager instead of the standard manager.
    pub fn create_with_bindings(
        dir: impl AsRef<Path>,
        desc: &TableDesc,
        memory_columns: &[&str],
        encoding: Encoding,
    ) -> Result<Table> {
        let dir = dir.as_ref();
        ensure!(
            !dir.exists(),
            "table directory {} already exists",
            dir.display()
        );
        let mut columns = ColumnSet::from_desc(desc, memory_columns, encoding)?;

        fs::create_dir_all(dir)
            .wrap_err_with(|| format!("failed to create table directory {}", dir.display()))?;
        columns.create_files(dir)?;

        let mut table = Table {
            dir: dir.to_path_buf(),
            writable: true,
            encoding,
            columns,
        };
        table.flush()?;
        Ok(table)
    }

    /// Opens an existing table from its directory.
    pub fn open(dir: impl AsRef<Path>, writable: bool) -> Result<Table> {
        let dir = dir.as_ref();
        ensure!(
            dir.is_dir(),
            "table directory {} does not exist",
            dir.display()
        );
        let (columns, encoding) = Table::load(dir, writable)?;
        Ok(Table {
            dir: dir.to_path_buf(),
            writable,
            encoding,
            columns,
        })
    }

    fn load(dir: &Path, writable: bool) -> Result<(ColumnSet, Encoding)> {
        let meta_path = dir.join(META_FILE);
        let bytes = fs::read(&meta_path)
            .wrap_err_with(|| format!("failed to read {}", meta_path.display()))?;
        let header = MetaFileHeader::from_bytes(&bytes)?;
        let encoding = header.encoding()?;

        let mut reader = TypedReader::new(&bytes[FILE_HEADER_SIZE..], encoding);
        let columns = ColumnSet::get_file(
            &mut reader,
            dir,
            writable,
            encoding,
            header.row_count(),
            header.manager_count(),
            header.column_count(),
        )?;
        Ok((columns, encoding))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn nrows(&self) -> u64 {
        self.columns.nrows()
    }

    pub fn ncolumns(&self) -> usize {
        self.columns.ncolumns()
    }

    pub fn keyword_set(&self) -> &KeywordSet {
        self.columns.keywords()
    }

    /// Table-level keywords. Mutations on a read-only table are accepted
    /// in memory but never reach disk, since flush skips read-only tables.
    pub fn keyword_set_mut(&mut self) -> &mut KeywordSet {
        self.columns.keywords_mut()
    }

    pub fn column(&self, name: &str) -> Result<&PlainColumn> {
        self.columns.column(name)
    }

    pub fn column_mut(&mut self, name: &str) -> Result<&mut PlainColumn> {
        self.columns.column_mut(name)
    }

    pub fn column_at(&self, pos: usize) -> Result<&PlainColumn> {
        self.columns.column_at(pos)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.column_names()
    }

    pub fn rename_column(&mut self, new_name: &str, old_name: &str) -> Result<()> {
        ensure!(self.writable, "table {} is not writable", self.dir.display());
        self.columns.rename_column(new_name, old_name)
    }

    pub fn add_rows(&mut self, n: u64) -> Result<()> {
        ensure!(self.writable, "table {} is not writable", self.dir.display());
        self.columns.add_rows(n)
    }

    /// Persists the table: managers first, then the control block. A no-op
    /// on a read-only table; idempotent otherwise.
    pub fn flush(&mut self) -> Result<()> {
        if !self.writable {
            return Ok(());
        }
        self.columns.flush_managers()?;

        let header = MetaFileHeader::new(
            self.encoding,
            self.columns.nrows(),
            self.columns.nmanagers() as u32,
            self.columns.ncolumns() as u32,
        );
        let mut writer = TypedWriter::new(self.encoding);
        self.columns.put_file(&mut writer)?;

        let mut bytes = Vec::with_capacity(FILE_HEADER_SIZE + writer.len());
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(writer.bytes());
        let meta_path = self.dir.join(META_FILE);
        fs::write(&meta_path, &bytes)
            .wrap_err_with(|| format!("failed to write {}", meta_path.display()))
    }

    /// Flushes and consumes the table.
    pub fn close(mut self) -> Result<()> {
        self.flush()
    }

    /// Discards all in-memory state and reloads the table from disk.
    pub fn resync(&mut self) -> Result<()> {
        let (columns, encoding) = Table::load(&self.dir, self.writable)?;
        self.columns = columns;
        self.encoding = encoding;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnDesc;
    use crate::types::{DataType, Value};

    fn scalar_desc() -> TableDesc {
        TableDesc::new()
            .add_column(ColumnDesc::scalar("TIME", DataType::Float64).unwrap())
            .unwrap()
    }

    #[test]
    fn create_rejects_an_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t");
        Table::create(&path, &scalar_desc()).unwrap().close().unwrap();
        let err = Table::create(&path, &scalar_desc()).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn open_rejects_a_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = Table::open(dir.path().join("absent"), false).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn unflushed_changes_do_not_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t");

        let mut table = Table::create(&path, &scalar_desc()).unwrap();
        table.add_rows(1).unwrap();
        table
            .column_mut("TIME")
            .unwrap()
            .put_scalar(0, &Value::Float64(1.0))
            .unwrap();
        // drop without flush
        drop(table);

        let table = Table::open(&path, false).unwrap();
        assert_eq!(table.nrows(), 0);
    }

    #[test]
    fn read_only_tables_reject_structural_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t");
        Table::create(&path, &scalar_desc()).unwrap().close().unwrap();

        let mut table = Table::open(&path, false).unwrap();
        assert!(table.add_rows(1).is_err());
        assert!(table.rename_column("T2", "TIME").is_err());
    }

    #[test]
    fn resync_sees_another_writers_flush() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t");

        let mut writer = Table::create(&path, &scalar_desc()).unwrap();
        let mut reader = Table::open(&path, false).unwrap();
        assert_eq!(reader.nrows(), 0);

        writer.add_rows(1).unwrap();
        writer
            .column_mut("TIME")
            .unwrap()
            .put_scalar(0, &Value::Float64(2.5))
            .unwrap();
        writer.flush().unwrap();

        reader.resync().unwrap();
        assert_eq!(reader.nrows(), 1);
        assert_eq!(
            reader.column("TIME").unwrap().get_scalar(0).unwrap(),
            Value::Float64(2.5)
        );
    }
}
