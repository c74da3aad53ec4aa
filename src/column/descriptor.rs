//! # Column and Table Descriptors
//!
//! Descriptors are the design-time templates for a table: a `ColumnDesc`
//! names a column, fixes its value type (scalar or array of a scalar
//! element type), and optionally pins the array shape or a maximum string
//! length. A `TableDesc` is an ordered, duplicate-free collection of
//! column descriptors.
//!
//! Descriptors are immutable once a table is created from them; the only
//! sanctioned later change is defining the fixed shape of an array column
//! before any row exists (see `PlainColumn::set_shape_column`).

use crate::shape::Shape;
use crate::types::DataType;
use eyre::{bail, ensure, Result};
use hashbrown::HashMap;

/// Template describing one column: name, declared type, shape policy.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDesc {
    name: String,
    value_type: DataType,
    fixed_shape: Option<Shape>,
    max_length: Option<u32>,
    comment: String,
}

impl ColumnDesc {
    /// A scalar column of the given element type.
    pub fn scalar(name: impl Into<String>, dt: DataType) -> Result<Self> {
        ensure!(dt.is_scalar(), "{:?} is not a scalar column type", dt);
        Ok(ColumnDesc {
            name: name.into(),
            value_type: dt,
            fixed_shape: None,
            max_length: None,
            comment: String::new(),
        })
    }

    /// An array column whose cells hold arrays of the given element type.
    /// The shape is dynamic per row unless pinned with `with_fixed_shape`.
    pub fn array(name: impl Into<String>, elem: DataType) -> Result<Self> {
        let value_type = match elem.array_of() {
            Some(t) => t,
            None => bail!("{:?} is not a valid array element type", elem),
        };
        Ok(ColumnDesc {
            name: name.into(),
            value_type,
            fixed_shape: None,
            max_length: None,
            comment: String::new(),
        })
    }

    /// Pins the shape of every cell in an array column.
    pub fn with_fixed_shape(mut self, shape: Shape) -> Self {
        self.fixed_shape = Some(shape);
        self
    }

    /// Declares a maximum length for string values; over-long values are
    /// rejected on put.
    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared value type tag (an array tag for array columns).
    pub fn value_type(&self) -> DataType {
        self.value_type
    }

    /// Scalar element type (for scalar columns, the value type itself).
    pub fn element_type(&self) -> DataType {
        // INVARIANT: constructors only admit scalar or array tags
        self.value_type.element_type().unwrap()
    }

    pub fn is_array(&self) -> bool {
        self.value_type.is_array()
    }

    pub fn fixed_shape(&self) -> Option<&Shape> {
        self.fixed_shape.as_ref()
    }

    pub fn max_length(&self) -> Option<u32> {
        self.max_length
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub(crate) fn set_fixed_shape(&mut self, shape: Shape) {
        self.fixed_shape = Some(shape);
    }
}

/// Ordered collection of column descriptors with unique names.
#[derive(Debug, Clone, Default)]
pub struct TableDesc {
    columns: Vec<ColumnDesc>,
    index: HashMap<String, usize>,
}

impl TableDesc {
    pub fn new() -> Self {
        TableDesc::default()
    }

    /// Appends a column descriptor. Duplicate names, fixed shapes on
    /// scalar columns, and max lengths on non-string columns are rejected.
    pub fn add_column(mut self, desc: ColumnDesc) -> Result<Self> {
        ensure!(
            !self.index.contains_key(desc.name()),
            "column '{}' already exists in the table description",
            desc.name()
        );
        if desc.fixed_shape().is_some() {
            ensure!(
                desc.is_array(),
                "scalar column '{}' cannot have a fixed shape",
                desc.name()
            );
        }
        if desc.max_length().is_some() {
            ensure!(
                desc.element_type() == DataType::String,
                "column '{}' of type {:?} cannot have a maximum length",
                desc.name(),
                desc.value_type()
            );
        }
        self.index.insert(desc.name().to_string(), self.columns.len());
        self.columns.push(desc);
        Ok(self)
    }

    pub fn ncolumns(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, name: &str) -> Result<&ColumnDesc> {
        match self.index.get(name) {
            Some(&i) => Ok(&self.columns[i]),
            None => bail!("column '{}' not found in the table description", name),
        }
    }

    pub fn column_at(&self, pos: usize) -> Result<&ColumnDesc> {
        ensure!(
            pos < self.columns.len(),
            "column index {} out of range ({} columns)",
            pos,
            self.columns.len()
        );
        Ok(&self.columns[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnDesc> {
        self.columns.iter()
    }
}
