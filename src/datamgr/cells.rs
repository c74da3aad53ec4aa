//! # Cell Stores
//!
//! `CellStore` holds one column's cells for the in-memory and standard
//! managers: the declared value type, the optional fixed shape, and one
//! optional value per row (`None` until first put). `StoreColumn` is the
//! [`DataManagerColumn`](super::DataManagerColumn) handle both managers
//! hand to their columns; it shares the store with the owning manager
//! through `Arc<RwLock<..>>` so the manager can serialize everything at
//! flush time.

use crate::datamgr::DataManagerColumn;
use crate::shape::{Shape, Slicer};
use crate::stream::{TypedReader, TypedWriter};
use crate::types::{ArrayValue, DataType, Value};
use eyre::{bail, ensure, Result};
use parking_lot::RwLock;
use std::sync::Arc;

/// One column's cells plus the type/shape rules every access obeys.
#[derive(Debug)]
pub struct CellStore {
    column_name: String,
    value_type: DataType,
    fixed_shape: Option<Shape>,
    cells: Vec<Option<Value>>,
}

impl CellStore {
    pub fn new(name: &str, value_type: DataType, fixed_shape: Option<Shape>) -> Result<Self> {
        ensure!(
            value_type.is_scalar() || value_type.is_array(),
            "{:?} is not a storable column type",
            value_type
        );
        ensure!(
            fixed_shape.is_none() || value_type.is_array(),
            "scalar column '{}' cannot have a fixed shape",
            name
        );
        Ok(CellStore {
            column_name: name.to_string(),
            value_type,
            fixed_shape,
            cells: Vec::new(),
        })
    }

    pub fn value_type(&self) -> DataType {
        self.value_type
    }

    pub fn nrows(&self) -> u64 {
        self.cells.len() as u64
    }

    pub fn set_column_name(&mut self, name: &str) {
        self.column_name = name.to_string();
    }

    fn check_row(&self, row: u64) -> Result<usize> {
        ensure!(
            row < self.cells.len() as u64,
            "row {} out of range in column '{}' ({} rows)",
            row,
            self.column_name,
            self.cells.len()
        );
        Ok(row as usize)
    }

    pub fn add_rows(&mut self, n: u64) {
        self.cells
            .resize_with(self.cells.len() + n as usize, || None);
    }

    pub fn get_scalar(&self, row: u64) -> Result<Value> {
        let i = self.check_row(row)?;
        ensure!(
            self.value_type.is_scalar(),
            "column '{}' holds arrays, not scalars",
            self.column_name
        );
        match &self.cells[i] {
            Some(v) => Ok(v.clone()),
            None => Value::default_for(self.value_type),
        }
    }

    pub fn put_scalar(&mut self, row: u64, value: &Value) -> Result<()> {
        let i = self.check_row(row)?;
        ensure!(
            self.value_type.is_scalar(),
            "column '{}' holds arrays, not scalars",
            self.column_name
        );
        ensure!(
            value.data_type() == self.value_type,
            "value of type {:?} does not match column '{}' of type {:?}",
            value.data_type(),
            self.column_name,
            self.value_type
        );
        self.cells[i] = Some(value.clone());
        Ok(())
    }

    pub fn get_array(&self, row: u64) -> Result<ArrayValue> {
        let i = self.check_row(row)?;
        ensure!(
            self.value_type.is_array(),
            "column '{}' holds scalars, not arrays",
            self.column_name
        );
        match &self.cells[i] {
            Some(Value::Array(a)) => Ok(a.clone()),
            // INVARIANT: put_array only stores Value::Array in array columns
            Some(_) => unreachable!(),
            None => match &self.fixed_shape {
                Some(shape) => ArrayValue::filled_default(self.element_type(), shape),
                None => bail!(
                    "row {} of column '{}' has no array shape defined",
                    row,
                    self.column_name
                ),
            },
        }
    }

    pub fn put_array(&mut self, row: u64, value: &ArrayValue) -> Result<()> {
        let i = self.check_row(row)?;
        ensure!(
            self.value_type.is_array(),
            "column '{}' holds scalars, not arrays",
            self.column_name
        );
        ensure!(
            value.element_type() == self.element_type(),
            "array of {:?} does not match column '{}' of {:?} elements",
            value.element_type(),
            self.column_name,
            self.element_type()
        );
        if let Some(fixed) = &self.fixed_shape {
            ensure!(
                value.shape().conforms(fixed),
                "array shape {} does not conform to fixed shape {} of column '{}'",
                value.shape(),
                fixed,
                self.column_name
            );
        }
        self.cells[i] = Some(Value::Array(value.clone()));
        Ok(())
    }

    pub fn get_slice(&self, row: u64, slicer: &Slicer) -> Result<ArrayValue> {
        self.get_array(row)?.slice(slicer)
    }

    /// Read-modify-write of one cell: the selected elements are replaced,
    /// everything else keeps its value. The cell must already have a shape
    /// (fixed, set explicitly, or from a previous full put).
    pub fn put_slice(&mut self, row: u64, slicer: &Slicer, values: &ArrayValue) -> Result<()> {
        let mut cell = self.get_array(row)?;
        cell.write_slice(slicer, values)?;
        self.put_array(row, &cell)
    }

    pub fn shape(&self, row: u64) -> Result<Shape> {
        let i = self.check_row(row)?;
        if let Some(fixed) = &self.fixed_shape {
            return Ok(fixed.clone());
        }
        match &self.cells[i] {
            Some(Value::Array(a)) => Ok(a.shape().clone()),
            _ => bail!(
                "row {} of column '{}' has no array shape defined",
                row,
                self.column_name
            ),
        }
    }

    pub fn set_shape(&mut self, row: u64, shape: &Shape) -> Result<()> {
        let i = self.check_row(row)?;
        ensure!(
            self.value_type.is_array(),
            "column '{}' holds scalars, not arrays",
            self.column_name
        );
        ensure!(
            self.fixed_shape.is_none(),
            "cannot change the shape of fixed-shape column '{}'",
            self.column_name
        );
        let cell = ArrayValue::filled_default(self.element_type(), shape)?;
        self.cells[i] = Some(Value::Array(cell));
        Ok(())
    }

    pub fn set_column_shape(&mut self, shape: &Shape) -> Result<()> {
        ensure!(
            self.value_type.is_array(),
            "column '{}' holds scalars, not arrays",
            self.column_name
        );
        ensure!(
            self.cells.is_empty(),
            "cannot define a column-wide shape for column '{}' after rows exist",
            self.column_name
        );
        self.fixed_shape = Some(shape.clone());
        Ok(())
    }

    fn element_type(&self) -> DataType {
        // INVARIANT: value_type is scalar or array by construction
        self.value_type.element_type().unwrap()
    }

    /// Serializes the column: value type, shape policy, then one
    /// defined-flag + value per row.
    pub fn write_cells(&self, w: &mut TypedWriter) -> Result<()> {
        w.write_u8(self.value_type as u8);
        match &self.fixed_shape {
            Some(shape) => {
                w.write_bool(true);
                w.write_shape(shape)?;
            }
            None => w.write_bool(false),
        }
        for cell in &self.cells {
            match cell {
                Some(v) => {
                    w.write_bool(true);
                    w.write_value(v)?;
                }
                None => w.write_bool(false),
            }
        }
        Ok(())
    }

    /// Reads a column written by `write_cells`. The column name is not
    /// persisted at this level; it is restored when a descriptor attaches.
    pub fn read_cells(r: &mut TypedReader<'_>, rows: u64) -> Result<Self> {
        let value_type = DataType::try_from(r.read_u8()?)?;
        let fixed_shape = if r.read_bool()? {
            Some(r.read_shape()?)
        } else {
            None
        };
        let mut store = CellStore::new("", value_type, fixed_shape)?;
        // the row count is read from the file header; every cell costs at
        // least one flag byte, so a corrupt count cannot reserve more than
        // the stream could possibly back
        store.cells.reserve(rows.min(r.remaining() as u64) as usize);
        for row in 0..rows {
            if r.read_bool()? {
                let value = r.read_value()?;
                let matches = match &value {
                    Value::Array(a) => a.data_type() == value_type,
                    other => other.data_type() == value_type,
                };
                ensure!(
                    matches,
                    "cell in row {} has type {:?}, column declares {:?}",
                    row,
                    value.data_type(),
                    value_type
                );
                store.cells.push(Some(value));
            } else {
                store.cells.push(None);
            }
        }
        Ok(store)
    }
}

/// The column handle both shipped managers return: a shared cell store
/// plus the writability the manager granted at attach time.
#[derive(Debug)]
pub struct StoreColumn {
    store: Arc<RwLock<CellStore>>,
    writable: bool,
}

impl StoreColumn {
    pub(crate) fn new(store: Arc<RwLock<CellStore>>, writable: bool) -> Self {
        StoreColumn { store, writable }
    }

    fn check_writable(&self) -> Result<()> {
        ensure!(
            self.writable,
            "column '{}' is bound to a read-only data manager",
            self.store.read().column_name
        );
        Ok(())
    }
}

impl DataManagerColumn for StoreColumn {
    fn data_type(&self) -> DataType {
        self.store.read().value_type()
    }

    fn is_writable(&self) -> bool {
        self.writable
    }

    fn get_scalar(&self, row: u64) -> Result<Value> {
        self.store.read().get_scalar(row)
    }

    fn put_scalar(&mut self, row: u64, value: &Value) -> Result<()> {
        self.check_writable()?;
        self.store.write().put_scalar(row, value)
    }

    fn get_array(&self, row: u64) -> Result<ArrayValue> {
        self.store.read().get_array(row)
    }

    fn put_array(&mut self, row: u64, value: &ArrayValue) -> Result<()> {
        self.check_writable()?;
        self.store.write().put_array(row, value)
    }

    fn get_slice(&self, row: u64, slicer: &Slicer) -> Result<ArrayValue> {
        self.store.read().get_slice(row, slicer)
    }

    fn put_slice(&mut self, row: u64, slicer: &Slicer, values: &ArrayValue) -> Result<()> {
        self.check_writable()?;
        self.store.write().put_slice(row, slicer, values)
    }

    fn shape(&self, row: u64) -> Result<Shape> {
        self.store.read().shape(row)
    }

    fn set_shape(&mut self, row: u64, shape: &Shape) -> Result<()> {
        self.check_writable()?;
        self.store.write().set_shape(row, shape)
    }

    fn set_column_shape(&mut self, shape: &Shape) -> Result<()> {
        self.check_writable()?;
        self.store.write().set_column_shape(shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Encoding;
    use crate::types::ArrayData;

    #[test]
    fn scalar_cells_default_until_first_put() {
        let mut store = CellStore::new("ANT1", DataType::Int32, None).unwrap();
        store.add_rows(2);
        assert_eq!(store.get_scalar(0).unwrap(), Value::Int32(0));
        store.put_scalar(0, &Value::Int32(7)).unwrap();
        assert_eq!(store.get_scalar(0).unwrap(), Value::Int32(7));
        assert_eq!(store.get_scalar(1).unwrap(), Value::Int32(0));
    }

    #[test]
    fn scalar_type_mismatch_is_rejected() {
        let mut store = CellStore::new("ANT1", DataType::Int32, None).unwrap();
        store.add_rows(1);
        assert!(store.put_scalar(0, &Value::Int64(7)).is_err());
        assert!(store.put_scalar(0, &Value::Str("x".into())).is_err());
    }

    #[test]
    fn row_out_of_range_is_rejected() {
        let store = CellStore::new("T", DataType::Float64, None).unwrap();
        let err = store.get_scalar(0).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn fixed_shape_arrays_read_back_zero_filled() {
        let mut store = CellStore::new(
            "DATA",
            DataType::ArrayFloat32,
            Some(Shape::from([3, 4])),
        )
        .unwrap();
        store.add_rows(1);
        let a = store.get_array(0).unwrap();
        assert_eq!(a.shape(), &Shape::from([3, 4]));
        assert_eq!(a.data(), &ArrayData::Float32(vec![0.0; 12]));
    }

    #[test]
    fn fixed_shape_rejects_nonconforming_puts_and_shape_changes() {
        let mut store = CellStore::new(
            "DATA",
            DataType::ArrayFloat32,
            Some(Shape::from([3, 4])),
        )
        .unwrap();
        store.add_rows(1);
        let wrong =
            ArrayValue::filled_default(DataType::Float32, &Shape::from([4, 3])).unwrap();
        assert!(store.put_array(0, &wrong).is_err());
        assert!(store.set_shape(0, &Shape::from([2, 2])).is_err());
    }

    #[test]
    fn dynamic_arrays_need_a_shape_before_reading() {
        let mut store = CellStore::new("SPECTRUM", DataType::ArrayFloat64, None).unwrap();
        store.add_rows(2);
        assert!(store.get_array(0).is_err());
        assert!(store.shape(0).is_err());

        store.set_shape(0, &Shape::from([5])).unwrap();
        assert_eq!(store.shape(0).unwrap(), Shape::from([5]));
        assert_eq!(store.get_array(0).unwrap().data().len(), 5);
        // row 1 still undefined
        assert!(store.get_array(1).is_err());
    }

    #[test]
    fn column_wide_shape_only_before_rows_exist() {
        let mut store = CellStore::new("DATA", DataType::ArrayInt32, None).unwrap();
        store.set_column_shape(&Shape::from([2, 2])).unwrap();
        store.add_rows(1);
        assert_eq!(store.shape(0).unwrap(), Shape::from([2, 2]));
        assert!(store.set_column_shape(&Shape::from([3, 3])).is_err());
    }

    #[test]
    fn slices_update_cells_in_place() {
        use crate::shape::{Slice, Slicer};
        let mut store =
            CellStore::new("DATA", DataType::ArrayInt32, Some(Shape::from([2, 3]))).unwrap();
        store.add_rows(2);

        // the fixed shape gives unwritten cells a zero-filled default, so
        // a partial write lands on that default
        let column = Slicer::new(&[Slice::new(0, 2), Slice::new(1, 1)]);
        let values =
            ArrayValue::new(Shape::from([2, 1]), ArrayData::Int32(vec![7, 8])).unwrap();
        store.put_slice(0, &column, &values).unwrap();
        assert_eq!(
            store.get_array(0).unwrap().data(),
            &ArrayData::Int32(vec![0, 7, 0, 0, 8, 0])
        );
        assert_eq!(store.get_slice(0, &column).unwrap(), values);
        // the neighbouring row is untouched
        assert_eq!(
            store.get_array(1).unwrap().data(),
            &ArrayData::Int32(vec![0; 6])
        );

        // a dynamic-shape column has nothing to slice before a shape exists
        let mut dynamic = CellStore::new("VAR", DataType::ArrayInt32, None).unwrap();
        dynamic.add_rows(1);
        assert!(dynamic.put_slice(0, &column, &values).is_err());
    }

    #[test]
    fn cells_roundtrip_through_the_stream() {
        let mut store = CellStore::new("DATA", DataType::ArrayInt16, None).unwrap();
        store.add_rows(3);
        let a = ArrayValue::new(Shape::from([2]), ArrayData::Int16(vec![5, -5])).unwrap();
        store.put_array(1, &a).unwrap();

        let mut w = TypedWriter::new(Encoding::Canonical);
        store.write_cells(&mut w).unwrap();
        let bytes = w.into_bytes();
        let mut r = TypedReader::new(&bytes, Encoding::Canonical);
        let back = CellStore::read_cells(&mut r, 3).unwrap();

        assert_eq!(back.value_type(), DataType::ArrayInt16);
        assert!(back.get_array(0).is_err());
        assert_eq!(back.get_array(1).unwrap(), a);
        assert!(back.get_array(2).is_err());
    }

    #[test]
    fn corrupt_row_count_fails_instead_of_allocating() {
        let mut store = CellStore::new("A", DataType::Int32, None).unwrap();
        store.add_rows(1);
        let mut w = TypedWriter::new(Encoding::Canonical);
        store.write_cells(&mut w).unwrap();
        let bytes = w.into_bytes();
        let mut r = TypedReader::new(&bytes, Encoding::Canonical);
        let err = CellStore::read_cells(&mut r, u64::MAX).unwrap_err();
        assert!(err.to_string().contains("unexpected end of stream"));
    }

    #[test]
    fn read_only_handle_rejects_puts() {
        let store = Arc::new(RwLock::new(
            CellStore::new("W", DataType::Bool, None).unwrap(),
        ));
        store.write().add_rows(1);
        let mut handle = StoreColumn::new(store, false);
        assert!(!handle.is_writable());
        assert!(handle.get_scalar(0).is_ok());
        let err = handle.put_scalar(0, &Value::Bool(true)).unwrap_err();
        assert!(err.to_string().contains("read-only"));
    }
}
