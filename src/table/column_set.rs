//! # Column Set
//!
//! The table core's working set: every column in descriptor order, the
//! data-manager arena, the row count, and the table-level keyword set.
//! Columns refer to their manager by arena index (the manager's sequence
//! number), never by reference, so the set can hand out exclusive column
//! access while still reaching every manager at flush time.

use crate::column::{PlainColumn, TableDesc};
use crate::datamgr::{make_data_manager, memory, standard, DataManager};
use crate::keywords::KeywordSet;
use crate::stream::{Encoding, TypedReader, TypedWriter};
use eyre::{bail, ensure, Result};
use hashbrown::HashMap;
use std::path::Path;

/// All columns of a table plus the managers that store them.
#[derive(Debug)]
pub struct ColumnSet {
    columns: Vec<PlainColumn>,
    index: HashMap<String, usize>,
    managers: Vec<Box<dyn DataManager>>,
    rows: u64,
    keywords: KeywordSet,
}

impl ColumnSet {
    /// Builds the set for a new table. Columns named in `memory_columns`
    /// go to a shared [`MemoryManager`](crate::datamgr::MemoryManager);
    /// everything else lands on one
    /// [`StandardManager`](crate::datamgr::StandardManager).
    pub(crate) fn from_desc(
        desc: &TableDesc,
        memory_columns: &[&str],
        encoding: Encoding,
    ) -> Result<ColumnSet> {
        for name in memory_columns {
            ensure!(
                desc.column(name).is_ok(),
                "column '{}' named in the manager bindings does not exist",
                name
            );
        }

        let mut managers: Vec<Box<dyn DataManager>> = Vec::new();
        let mut seqnr_of_kind: HashMap<&str, usize> = HashMap::new();
        let mut columns = Vec::with_capacity(desc.ncolumns());
        let mut index = HashMap::with_capacity(desc.ncolumns());

        for column_desc in desc.iter() {
            let kind = if memory_columns.contains(&column_desc.name()) {
                memory::KIND
            } else {
                standard::KIND
            };
            let seqnr = match seqnr_of_kind.get(kind) {
                Some(&seqnr) => seqnr,
                None => {
                    let seqnr = managers.len();
                    managers.push(make_data_manager(kind, encoding)?);
                    seqnr_of_kind.insert(kind, seqnr);
                    seqnr
                }
            };

            let (column_index, handle) = managers[seqnr].add_column(column_desc)?;
            let mut column = PlainColumn::new(column_desc.clone());
            column.bind(seqnr, column_index, handle)?;
            index.insert(column.name().to_string(), columns.len());
            columns.push(column);
        }

        Ok(ColumnSet {
            columns,
            index,
            managers,
            rows: 0,
            keywords: KeywordSet::new(),
        })
    }

    pub fn nrows(&self) -> u64 {
        self.rows
    }

    pub fn ncolumns(&self) -> usize {
        self.columns.len()
    }

    pub(crate) fn nmanagers(&self) -> usize {
        self.managers.len()
    }

    pub fn keywords(&self) -> &KeywordSet {
        &self.keywords
    }

    pub fn keywords_mut(&mut self) -> &mut KeywordSet {
        &mut self.keywords
    }

    pub fn column(&self, name: &str) -> Result<&PlainColumn> {
        match self.index.get(name) {
            Some(&pos) => Ok(&self.columns[pos]),
            None => bail!("column '{}' not found", name),
        }
    }

    pub fn column_mut(&mut self, name: &str) -> Result<&mut PlainColumn> {
        match self.index.get(name) {
            Some(&pos) => Ok(&mut self.columns[pos]),
            None => bail!("column '{}' not found", name),
        }
    }

    pub fn column_at(&self, pos: usize) -> Result<&PlainColumn> {
        ensure!(
            pos < self.columns.len(),
            "column index {} out of range ({} columns)",
            pos,
            self.columns.len()
        );
        Ok(&self.columns[pos])
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    pub fn rename_column(&mut self, new_name: &str, old_name: &str) -> Result<()> {
        let pos = match self.index.get(old_name) {
            Some(&pos) => pos,
            None => bail!("column '{}' not found", old_name),
        };
        ensure!(
            !self.index.contains_key(new_name),
            "a column named '{}' already exists",
            new_name
        );
        self.index.remove(old_name);
        self.index.insert(new_name.to_string(), pos);
        self.columns[pos].rename(new_name);
        Ok(())
    }

    pub fn add_rows(&mut self, n: u64) -> Result<()> {
        for manager in &mut self.managers {
            manager.add_rows(n)?;
        }
        self.rows += n;
        Ok(())
    }

    pub(crate) fn create_files(&mut self, dir: &Path) -> Result<()> {
        for (seqnr, manager) in self.managers.iter_mut().enumerate() {
            manager.create_files(dir, seqnr as u32)?;
        }
        Ok(())
    }

    pub(crate) fn flush_managers(&mut self) -> Result<()> {
        for manager in &mut self.managers {
            manager.flush()?;
        }
        Ok(())
    }

    /// Writes the control-block body: table keywords, manager kinds in
    /// arena order, then one column block per column in descriptor order.
    pub(crate) fn put_file(&self, w: &mut TypedWriter) -> Result<()> {
        w.write_record(&self.keywords)?;
        for manager in &self.managers {
            w.write_str(manager.kind());
        }
        for column in &self.columns {
            column.put_file(w)?;
        }
        Ok(())
    }

    /// Reads the control-block body written by `put_file`, reconstructs the
    /// managers through the factory, opens their files, and reattaches
    /// every column handle.
    pub(crate) fn get_file(
        r: &mut TypedReader<'_>,
        dir: &Path,
        writable: bool,
        encoding: Encoding,
        rows: u64,
        manager_count: u32,
        column_count: u32,
    ) -> Result<ColumnSet> {
        let keywords = r.read_record()?;

        let mut managers: Vec<Box<dyn DataManager>> =
            Vec::with_capacity(manager_count as usize);
        for seqnr in 0..manager_count {
            let kind = r.read_str()?;
            let mut manager = make_data_manager(&kind, encoding)?;
            manager.open(dir, seqnr, writable, rows)?;
            managers.push(manager);
        }

        let mut columns = Vec::with_capacity(column_count as usize);
        let mut index = HashMap::with_capacity(column_count as usize);
        for _ in 0..column_count {
            let mut column = PlainColumn::get_file(r)?;
            // INVARIANT: get_file always restores the binding identity
            let seqnr = column.manager().unwrap();
            let column_index = column.manager_column().unwrap();
            ensure!(
                seqnr < managers.len(),
                "column '{}' is bound to unknown data manager {}",
                column.name(),
                seqnr
            );
            let handle = managers[seqnr].attach_column(column_index, column.desc())?;
            column.attach(handle)?;
            ensure!(
                !index.contains_key(column.name()),
                "duplicate column '{}' in table control block",
                column.name()
            );
            index.insert(column.name().to_string(), columns.len());
            columns.push(column);
        }

        Ok(ColumnSet {
            columns,
            index,
            managers,
            rows,
            keywords,
        })
    }
}
