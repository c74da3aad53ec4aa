//! # astrotab - Self-Describing Scientific Table Storage
//!
//! astrotab is the storage core for persistent tables of typed scientific
//! data: each table lives in its own directory, describes itself through
//! an embedded control block, and stores its columns through pluggable
//! data managers. The design prioritizes:
//!
//! - **Self-description**: a table directory carries everything needed to
//!   read it back, down to per-column keywords and manager bindings
//! - **Portability**: the canonical encoding reads identically on any
//!   platform, today or years from now
//! - **Pluggable storage**: columns bind to storage managers through a
//!   narrow trait, so new backends never touch the table core
//!
//! ## Quick Start
//!
//! ```ignore
//! use astrotab::{ColumnDesc, DataType, Shape, Table, TableDesc, Value};
//!
//! let desc = TableDesc::new()
//!     .add_column(ColumnDesc::scalar("TIME", DataType::Float64)?)?
//!     .add_column(
//!         ColumnDesc::array("DATA", DataType::Complex32)?
//!             .with_fixed_shape(Shape::from([3, 4])),
//!     )?;
//!
//! let mut table = Table::create("./obs.tab", &desc)?;
//! table.add_rows(2)?;
//! table.column_mut("TIME")?.put_scalar(0, &Value::Float64(4.83e9))?;
//! table.close()?;
//!
//! let table = Table::open("./obs.tab", false)?;
//! let time = table.column("TIME")?.get_scalar(0)?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │        Public API (Table)            │
//! ├─────────────────────────────────────┤
//! │  ColumnSet │ KeywordSet │ Regions    │
//! ├─────────────────────────────────────┤
//! │       PlainColumn (mediation)        │
//! ├─────────────────────────────────────┤
//! │  DataManager trait │ Memory/Standard │
//! ├─────────────────────────────────────┤
//! │   Typed Binary Stream (read/write)   │
//! ├─────────────────────────────────────┤
//! │  Encodings (canonical/native) + I/O  │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## File Layout
//!
//! One directory per table:
//!
//! ```text
//! table_dir/
//! ├── table.meta    # control block: header + keywords + columns
//! └── dm0.dat       # one data file per standard manager
//! ```
//!
//! ## Module Overview
//!
//! - [`types`]: the closed value universe (scalars, arrays, records)
//! - [`stream`]: the typed binary stream both file formats are built on
//! - [`keywords`]: ordered name-to-value metadata sets
//! - [`column`]: descriptors and the plain column mediation layer
//! - [`datamgr`]: the storage manager contract and shipped backends
//! - [`table`]: table lifecycle, control block, column set
//! - [`region`]: named sub-selections kept alongside a dataset

pub mod column;
pub mod datamgr;
pub mod keywords;
pub mod region;
pub mod shape;
pub mod stream;
pub mod table;
pub mod types;

pub use column::{ColumnDesc, PlainColumn, TableDesc};
pub use datamgr::{DataManager, DataManagerColumn};
pub use keywords::KeywordSet;
pub use region::{GroupType, Region, RegionHandler, Volume};
pub use shape::{Shape, Slice, Slicer};
pub use stream::Encoding;
pub use table::Table;
pub use types::{ArrayData, ArrayValue, Complex32, Complex64, DataType, Value};
