//! # Memory Data Manager
//!
//! A stored but non-persistent backend: cells live in memory for the life
//! of the open table and are discarded on close. Reopening a table whose
//! columns were bound here yields default-initialized cells again.
//!
//! Useful for scratch columns and for tests; also the simplest possible
//! reference implementation of the manager contract.

use crate::column::ColumnDesc;
use crate::datamgr::cells::{CellStore, StoreColumn};
use crate::datamgr::{DataManager, DataManagerColumn};
use eyre::{ensure, Result};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;

pub const KIND: &str = "MemoryMan";

/// Non-persistent in-memory storage manager.
#[derive(Debug, Default)]
pub struct MemoryManager {
    columns: Vec<Arc<RwLock<CellStore>>>,
    nrows: u64,
}

impl MemoryManager {
    pub fn new() -> Self {
        MemoryManager::default()
    }

    fn make_store(&self, desc: &ColumnDesc) -> Result<Arc<RwLock<CellStore>>> {
        let mut store = CellStore::new(
            desc.name(),
            desc.value_type(),
            desc.fixed_shape().cloned(),
        )?;
        store.add_rows(self.nrows);
        Ok(Arc::new(RwLock::new(store)))
    }
}

impl DataManager for MemoryManager {
    fn kind(&self) -> &'static str {
        KIND
    }

    // Memory columns are always writable, even in a read-only table:
    // nothing persistent can be damaged through them.
    fn is_writable(&self) -> bool {
        true
    }

    fn set_writable(&mut self, _writable: bool) {}

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
        let store = self.make_store(desc)?;
        let index = self.columns.len() as u32;
        self.columns.push(store.clone());
        Ok((index, Box::new(StoreColumn::new(store, true))))
    }

    fn attach_column(
        &mut self,
        index: u32,
        desc: &ColumnDesc,
    ) -> Result<Box<dyn DataManagerColumn>> {
        // On reopen nothing was persisted; recreate the store fresh. Ensure
        // the index sequence is contiguous so handles and stores line up.
        ensure!(
            (index as usize) <= self.columns.len(),
            "column index {} out of range in memory manager ({} columns)",
            index,
            self.columns.len()
        );
        if (index as usize) == self.columns.len() {
            let store = self.make_store(desc)?;
            self.columns.push(store);
        }
        let store = self.columns[index as usize].clone();
        ensure!(
            store.read().value_type() == desc.value_type(),
            "column '{}' declares {:?} but the manager holds {:?}",
            desc.name(),
            desc.value_type(),
            store.read().value_type()
        );
        Ok(Box::new(StoreColumn::new(store, true)))
    }

    fn add_rows(&mut self, n: u64) -> Result<()> {
        for column in &self.columns {
            column.write().add_rows(n);
        }
        self.nrows += n;
        Ok(())
    }

    fn create_files(&mut self, _dir: &Path, _seqnr: u32) -> Result<()> {
        Ok(())
    }

    fn open(&mut self, _dir: &Path, _seqnr: u32, _writable: bool, rows: u64) -> Result<()> {
        self.nrows = rows;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn resync(&mut self) -> Result<()> {
        Ok(())
    }
}
