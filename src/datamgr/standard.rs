//! # Standard Data Manager
//!
//! The default persistent backend. All columns bound to one instance are
//! serialized into a single data file, `dm<seqnr>.dat`, inside the table
//! directory: a fixed 64-byte header followed by a typed binary stream
//! holding every column's cells in binding order.
//!
//! The whole file is rewritten on flush. That keeps the format trivially
//! crash-consistent at the file level (a flush either replaces the file or
//! leaves the old one) and is the right trade-off for the column sizes
//! this manager targets; bulk payloads belong in tiled managers.

use crate::column::ColumnDesc;
use crate::datamgr::cells::{CellStore, StoreColumn};
use crate::datamgr::{DataManager, DataManagerColumn};
use crate::stream::{Encoding, TypedReader, TypedWriter};
use crate::table::header::{DataFileHeader, FILE_HEADER_SIZE};
use eyre::{ensure, Result, WrapErr};
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zerocopy::IntoBytes;

pub const KIND: &str = "StandardMan";

/// Builds the data file name for a manager sequence number.
pub fn data_file_name(seqnr: u32) -> String {
    format!("dm{}.dat", seqnr)
}

/// File-backed storage manager: one data file per instance.
#[derive(Debug)]
pub struct StandardManager {
    columns: Vec<Arc<RwLock<CellStore>>>,
    nrows: u64,
    writable: bool,
    encoding: Encoding,
    file: Option<PathBuf>,
}

impl StandardManager {
    pub fn new(encoding: Encoding) -> Self {
        StandardManager {
            columns: Vec::new(),
            nrows: 0,
            writable: true,
            encoding,
            file: None,
        }
    }

    /// Rebuilds all cell stores from the data file. Column names are
    /// restored later, when descriptors reattach.
    fn load(&mut self) -> Result<()> {
        // INVARIANT: callers set self.file before loading
        let path = self.file.clone().unwrap();
        let bytes = fs::read(&path)
            .wrap_err_with(|| format!("failed to read data file {}", path.display()))?;
        let header = DataFileHeader::from_bytes(&bytes)?;
        let encoding = header.encoding()?;
        let rows = header.row_count();

        let mut reader = TypedReader::new(&bytes[FILE_HEADER_SIZE..], encoding);
        let mut columns = Vec::with_capacity(header.column_count() as usize);
        for _ in 0..header.column_count() {
            let store = CellStore::read_cells(&mut reader, rows)?;
            columns.push(Arc::new(RwLock::new(store)));
        }

        self.columns = columns;
        self.encoding = encoding;
        self.nrows = rows;
        Ok(())
    }
}

impl DataManager for StandardManager {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn is_writable(&self) -> bool {
        self.writable
    }

    fn set_writable(&mut self, writable: bool) {
        self.writable = writable;
    }

    fn is_stored(&self) -> bool {
        true
    }

    fn nrows(&self) -> u64 {
        self.nrows
    }

    fn ncolumns(&self) -> usize {
        self.columns.len()
    }

    fn add_column(&mut self, desc: &ColumnDesc) -> Result<(u32, Box<dyn DataManagerColumn>)> {
        let mut store = CellStore::new(
            desc.name(),
            desc.value_type(),
            desc.fixed_shape().cloned(),
        )?;
        store.add_rows(self.nrows);
        let store = Arc::new(RwLock::new(store));
        let index = self.columns.len() as u32;
        self.columns.push(store.clone());
        Ok((index, Box::new(StoreColumn::new(store, self.writable))))
    }

    fn attach_column(
        &mut self,
        index: u32,
        desc: &ColumnDesc,
    ) -> Result<Box<dyn DataManagerColumn>> {
        ensure!(
            (index as usize) < self.columns.len(),
            "column index {} out of range in standard manager ({} columns)",
            index,
            self.columns.len()
        );
        let store = self.columns[index as usize].clone();
        ensure!(
            store.read().value_type() == desc.value_type(),
            "column '{}' declares {:?} but the data file holds {:?}",
            desc.name(),
            desc.value_type(),
            store.read().value_type()
        );
        store.write().set_column_name(desc.name());
        Ok(Box::new(StoreColumn::new(store, self.writable)))
    }

    fn add_rows(&mut self, n: u64) -> Result<()> {
        for column in &self.columns {
            column.write().add_rows(n);
        }
        self.nrows += n;
        Ok(())
    }

    fn create_files(&mut self, dir: &Path, seqnr: u32) -> Result<()> {
        self.file = Some(dir.join(data_file_name(seqnr)));
        // write an initial snapshot so the file exists before first flush
        self.flush()
    }

    fn open(&mut self, dir: &Path, seqnr: u32, writable: bool, rows: u64) -> Result<()> {
        self.file = Some(dir.join(data_file_name(seqnr)));
        self.writable = writable;
        self.load()?;
        ensure!(
            self.nrows == rows,
            "data file {} holds {} rows, the table declares {}",
            data_file_name(seqnr),
            self.nrows,
            rows
        );
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let Some(path) = &self.file else {
            return Ok(());
        };
        if !self.writable {
            return Ok(());
        }
        let header = DataFileHeader::new(self.encoding, self.nrows, self.columns.len() as u32);
        let mut writer = TypedWriter::new(self.encoding);
        for column in &self.columns {
            column.read().write_cells(&mut writer)?;
        }
        let mut bytes = Vec::with_capacity(FILE_HEADER_SIZE + writer.len());
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(writer.bytes());
        fs::write(path, &bytes)
            .wrap_err_with(|| format!("failed to write data file {}", path.display()))
    }

    fn resync(&mut self) -> Result<()> {
        if self.file.is_none() {
            return Ok(());
        }
        self.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Shape;
    use crate::types::{ArrayData, ArrayValue, DataType, Value};

    fn int_column(name: &str) -> ColumnDesc {
        ColumnDesc::scalar(name, DataType::Int32).unwrap()
    }

    #[test]
    fn data_survives_flush_and_open() {
        let dir = tempfile::tempdir().unwrap();

        let mut mgr = StandardManager::new(Encoding::Canonical);
        let (index, mut col) = mgr.add_column(&int_column("ANT1")).unwrap();
        mgr.create_files(dir.path(), 0).unwrap();
        mgr.add_rows(2).unwrap();
        col.put_scalar(0, &Value::Int32(11)).unwrap();
        col.put_scalar(1, &Value::Int32(-7)).unwrap();
        mgr.flush().unwrap();

        let mut reopened = StandardManager::new(Encoding::Canonical);
        reopened.open(dir.path(), 0, true, 2).unwrap();
        assert_eq!(reopened.ncolumns(), 1);
        let col = reopened.attach_column(index, &int_column("ANT1")).unwrap();
        assert_eq!(col.get_scalar(0).unwrap(), Value::Int32(11));
        assert_eq!(col.get_scalar(1).unwrap(), Value::Int32(-7));
    }

    #[test]
    fn arrays_and_undefined_cells_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let desc = ColumnDesc::array("SPECTRUM", DataType::Float64).unwrap();

        let mut mgr = StandardManager::new(Encoding::Native);
        let (_, mut col) = mgr.add_column(&desc).unwrap();
        mgr.create_files(dir.path(), 3).unwrap();
        mgr.add_rows(2).unwrap();
        let a = ArrayValue::new(Shape::from([2]), ArrayData::Float64(vec![1.5, 2.5])).unwrap();
        col.put_array(0, &a).unwrap();
        mgr.flush().unwrap();

        let mut reopened = StandardManager::new(Encoding::Native);
        reopened.open(dir.path(), 3, false, 2).unwrap();
        let col = reopened.attach_column(0, &desc).unwrap();
        assert_eq!(col.get_array(0).unwrap(), a);
        // row 1 was never written and has no shape
        assert!(col.get_array(1).is_err());
    }

    #[test]
    fn open_rejects_row_count_disagreement() {
        let dir = tempfile::tempdir().unwrap();

        let mut mgr = StandardManager::new(Encoding::Canonical);
        mgr.add_column(&int_column("A")).unwrap();
        mgr.create_files(dir.path(), 0).unwrap();
        mgr.add_rows(4).unwrap();
        mgr.flush().unwrap();

        let mut reopened = StandardManager::new(Encoding::Canonical);
        let err = reopened.open(dir.path(), 0, true, 3).unwrap_err();
        assert!(err.to_string().contains("the table declares 3"));
    }

    #[test]
    fn tampered_row_count_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();

        let mut mgr = StandardManager::new(Encoding::Canonical);
        mgr.add_column(&int_column("A")).unwrap();
        mgr.create_files(dir.path(), 0).unwrap();
        mgr.add_rows(1).unwrap();
        mgr.flush().unwrap();

        // row count lives at header bytes 24..32, little-endian
        let path = dir.path().join(data_file_name(0));
        let mut bytes = fs::read(&path).unwrap();
        bytes[24..32].copy_from_slice(&u64::MAX.to_le_bytes());
        fs::write(&path, &bytes).unwrap();

        let mut reopened = StandardManager::new(Encoding::Canonical);
        let err = reopened.open(dir.path(), 0, false, 1).unwrap_err();
        assert!(err.to_string().contains("unexpected end of stream"));
    }

    #[test]
    fn attach_validates_the_declared_type() {
        let dir = tempfile::tempdir().unwrap();

        let mut mgr = StandardManager::new(Encoding::Canonical);
        mgr.add_column(&int_column("A")).unwrap();
        mgr.create_files(dir.path(), 0).unwrap();
        mgr.flush().unwrap();

        let mut reopened = StandardManager::new(Encoding::Canonical);
        reopened.open(dir.path(), 0, true, 0).unwrap();
        let wrong = ColumnDesc::scalar("A", DataType::Float32).unwrap();
        assert!(reopened.attach_column(0, &wrong).is_err());
        assert!(reopened.attach_column(5, &int_column("A")).is_err());
    }

    #[test]
    fn read_only_open_refuses_to_rewrite_the_file() {
        let dir = tempfile::tempdir().unwrap();

        let mut mgr = StandardManager::new(Encoding::Canonical);
        mgr.add_column(&int_column("A")).unwrap();
        mgr.create_files(dir.path(), 0).unwrap();
        mgr.flush().unwrap();
        let before = fs::read(dir.path().join(data_file_name(0))).unwrap();

        let mut reopened = StandardManager::new(Encoding::Canonical);
        reopened.open(dir.path(), 0, false, 0).unwrap();
        assert!(!reopened.is_writable());
        reopened.flush().unwrap();
        let after = fs::read(dir.path().join(data_file_name(0))).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn resync_picks_up_an_external_rewrite() {
        let dir = tempfile::tempdir().unwrap();

        let mut writer = StandardManager::new(Encoding::Canonical);
        let (_, mut col) = writer.add_column(&int_column("A")).unwrap();
        writer.create_files(dir.path(), 0).unwrap();
        writer.add_rows(1).unwrap();
        col.put_scalar(0, &Value::Int32(1)).unwrap();
        writer.flush().unwrap();

        let mut reader = StandardManager::new(Encoding::Canonical);
        reader.open(dir.path(), 0, false, 1).unwrap();

        col.put_scalar(0, &Value::Int32(99)).unwrap();
        writer.flush().unwrap();

        reader.resync().unwrap();
        let col = reader.attach_column(0, &int_column("A")).unwrap();
        assert_eq!(col.get_scalar(0).unwrap(), Value::Int32(99));
    }
}
