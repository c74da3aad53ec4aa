//! # Storage Managers
//!
//! The pluggable backend layer that maps logical columns onto physical
//! storage. A table binds every stored column to exactly one
//! [`DataManager`]; the manager hands back one [`DataManagerColumn`] handle
//! per column, and all typed get/put traffic flows through that handle.
//!
//! ## Contract
//!
//! A manager owns the physical representation of its columns and their
//! control-block persistence. The table core depends only on the trait
//! surface here, never on a concrete backend, so new engines (tiled,
//! compressed, computed) can be added without touching the column/table
//! code. Virtual (computed) engines report `is_stored() == false` and
//! reject puts; the backends shipped here are both stored.
//!
//! ## Backends
//!
//! - [`MemoryManager`]: keeps cells in memory only. Opening a table whose
//!   columns were bound to it yields freshly default-initialized cells;
//!   the data does not survive a close.
//! - [`StandardManager`]: persists every column's cells in one data file
//!   per manager (`dm<seqnr>.dat`) through the typed binary stream.
//!
//! ## Sharing Model
//!
//! The table's column set owns the managers (an arena indexed by sequence
//! number); columns hold the sequence number, not the manager. Cell
//! payloads are shared between a manager and its column handles via
//! `Arc<RwLock<CellStore>>` so the manager can serialize everything at
//! flush time while each handle retains exclusive logical ownership of its
//! column's traffic.
//!
//! ## Cell Semantics
//!
//! - scalar cells read back as the type's default until first put
//! - fixed-shape array cells read back zero-filled until first put
//! - dynamic-shape array cells have no shape until `set_shape` or a put
//!   defines one; reading before that is an error

use crate::column::ColumnDesc;
use crate::shape::{Shape, Slicer};
use crate::stream::Encoding;
use crate::types::{ArrayValue, DataType, Value};
use eyre::{bail, Result};
use std::fmt;
use std::path::Path;

pub mod cells;
pub mod memory;
pub mod standard;

pub use cells::StoreColumn;
pub use memory::MemoryManager;
pub use standard::StandardManager;

/// Per-column handle inside a data manager. Exclusively owned by the one
/// `PlainColumn` bound to it.
pub trait DataManagerColumn: fmt::Debug {
    /// Declared value type of the column (array tag for array columns).
    fn data_type(&self) -> DataType;

    fn is_writable(&self) -> bool;

    fn get_scalar(&self, row: u64) -> Result<Value>;

    fn put_scalar(&mut self, row: u64, value: &Value) -> Result<()>;

    fn get_array(&self, row: u64) -> Result<ArrayValue>;

    fn put_array(&mut self, row: u64, value: &ArrayValue) -> Result<()>;

    /// Reads the sub-array a slicer selects from one cell. The result is
    /// an owned array of the slicer's shape.
    fn get_slice(&self, row: u64, slicer: &Slicer) -> Result<ArrayValue>;

    /// Overwrites the elements a slicer selects in one cell; the rest of
    /// the cell is untouched. The values must conform to the slicer's
    /// shape and the cell must already have a shape.
    fn put_slice(&mut self, row: u64, slicer: &Slicer, values: &ArrayValue) -> Result<()>;

    /// Shape of the cell in the given row.
    fn shape(&self, row: u64) -> Result<Shape>;

    /// Defines the shape of one cell (dynamic-shape columns only).
    fn set_shape(&mut self, row: u64, shape: &Shape) -> Result<()>;

    /// Pins the shape of every cell; only valid while the column is empty.
    fn set_column_shape(&mut self, shape: &Shape) -> Result<()>;
}

/// A physical storage engine instance, possibly shared by several columns.
pub trait DataManager: fmt::Debug {
    /// Registry name used in control blocks to rebind on open.
    fn kind(&self) -> &'static str;

    fn is_writable(&self) -> bool;

    /// Changes writability after construction. Ignored by managers that
    /// are unconditionally writable.
    fn set_writable(&mut self, writable: bool);

    /// Stored engines hold data physically; virtual engines compute it.
    fn is_stored(&self) -> bool;

    fn nrows(&self) -> u64;

    fn ncolumns(&self) -> usize;

    /// Creates a new column in this manager (table-creation path).
    /// Returns the column's index within the manager and its handle.
    fn add_column(&mut self, desc: &ColumnDesc) -> Result<(u32, Box<dyn DataManagerColumn>)>;

    /// Reattaches an existing column by index (table-open path), validating
    /// the stored type against the descriptor.
    fn attach_column(&mut self, index: u32, desc: &ColumnDesc)
        -> Result<Box<dyn DataManagerColumn>>;

    fn add_rows(&mut self, n: u64) -> Result<()>;

    /// Creates the manager's files inside the table directory.
    fn create_files(&mut self, dir: &Path, seqnr: u32) -> Result<()>;

    /// Reads the manager's persisted state back from the table directory.
    /// `rows` is the row count the table control block declares; a stored
    /// manager must agree with it.
    fn open(&mut self, dir: &Path, seqnr: u32, writable: bool, rows: u64) -> Result<()>;

    /// Persists all column data. A no-op for non-persistent managers.
    fn flush(&mut self) -> Result<()>;

    /// Re-reads persisted state, discarding in-memory changes. Used when
    /// the files were replaced behind this instance's back.
    ///
    /// Column handles obtained before the resync are detached from the
    /// reloaded state; callers must re-attach them through
    /// [`attach_column`](Self::attach_column) to observe the new data.
    fn resync(&mut self) -> Result<()>;
}

/// Constructs a data manager from its registry name, as recorded in a
/// table control block.
pub fn make_data_manager(kind: &str, encoding: Encoding) -> Result<Box<dyn DataManager>> {
    match kind {
        memory::KIND => Ok(Box::new(MemoryManager::new())),
        standard::KIND => Ok(Box::new(StandardManager::new(encoding))),
        other => bail!("unknown data manager kind '{}'", other),
    }
}
