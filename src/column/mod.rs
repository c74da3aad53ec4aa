//! # Columns
//!
//! The logical column layer: descriptors declare what a column holds,
//! `PlainColumn` mediates every typed access between the table core and
//! the storage manager handle the column is bound to.

pub mod descriptor;
pub mod plain;

pub use descriptor::{ColumnDesc, TableDesc};
pub use plain::PlainColumn;
