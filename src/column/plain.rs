//! # Plain Columns
//!
//! `PlainColumn` is the column object the table core works with: the
//! descriptor, the column's own keyword set, and a binding to exactly one
//! data manager. All typed get/put traffic goes through here so length
//! limits, binding state, and writability are checked in one place before
//! the storage manager sees anything.
//!
//! ## Binding Lifecycle
//!
//! A column starts unbound. At table creation the column set binds it once
//! (manager arena index, column index within that manager, and the handle
//! the manager returned). On reopen the binding identity comes back from
//! the control block and the handle is attached after the managers have
//! loaded their files. There is no transition back to unbound, and a
//! second bind is an error.

use crate::column::ColumnDesc;
use crate::datamgr::DataManagerColumn;
use crate::keywords::KeywordSet;
use crate::shape::{Shape, Slicer};
use crate::stream::{TypedReader, TypedWriter};
use crate::types::{convert_scalar, ArrayData, ArrayValue, DataType, Value};
use eyre::{bail, ensure, Result};

/// Version tag at the front of every column control block.
pub(crate) const COLUMN_BLOCK_VERSION: u8 = 1;

/// The per-kind half of a column control block. Scalar and array columns
/// persist different derived state, and the set is closed, so the split
/// lives in an enum rather than a trait object.
pub(crate) enum ColumnVariant {
    Scalar {
        element: DataType,
        max_length: Option<u32>,
    },
    Array {
        element: DataType,
        fixed_shape: Option<Shape>,
    },
}

impl ColumnVariant {
    fn of(desc: &ColumnDesc) -> ColumnVariant {
        if desc.is_array() {
            ColumnVariant::Array {
                element: desc.element_type(),
                fixed_shape: desc.fixed_shape().cloned(),
            }
        } else {
            ColumnVariant::Scalar {
                element: desc.element_type(),
                max_length: desc.max_length(),
            }
        }
    }

    fn tag(&self) -> u8 {
        match self {
            ColumnVariant::Scalar { .. } => 0,
            ColumnVariant::Array { .. } => 1,
        }
    }

    fn put_derived(&self, w: &mut TypedWriter) -> Result<()> {
        match self {
            ColumnVariant::Scalar { element, max_length } => {
                w.write_u8(*element as u8);
                match max_length {
                    Some(n) => {
                        w.write_bool(true);
                        w.write_varint(u64::from(*n));
                    }
                    None => w.write_bool(false),
                }
            }
            ColumnVariant::Array { element, fixed_shape } => {
                w.write_u8(*element as u8);
                match fixed_shape {
                    Some(shape) => {
                        w.write_bool(true);
                        w.write_shape(shape)?;
                    }
                    None => w.write_bool(false),
                }
            }
        }
        Ok(())
    }

    fn get_derived(tag: u8, r: &mut TypedReader<'_>) -> Result<ColumnVariant> {
        match tag {
            0 => {
                let element = DataType::try_from(r.read_u8()?)?;
                let max_length = if r.read_bool()? {
                    let n = r.read_varint()?;
                    ensure!(n <= u64::from(u32::MAX), "maximum length {} too large", n);
                    Some(n as u32)
                } else {
                    None
                };
                Ok(ColumnVariant::Scalar { element, max_length })
            }
            1 => {
                let element = DataType::try_from(r.read_u8()?)?;
                let fixed_shape = if r.read_bool()? {
                    Some(r.read_shape()?)
                } else {
                    None
                };
                Ok(ColumnVariant::Array { element, fixed_shape })
            }
            other => bail!("unknown column variant tag: {}", other),
        }
    }

    fn into_desc(self, name: &str, comment: &str) -> Result<ColumnDesc> {
        let desc = match self {
            ColumnVariant::Scalar { element, max_length } => {
                let mut desc = ColumnDesc::scalar(name, element)?;
                if let Some(n) = max_length {
                    desc = desc.with_max_length(n);
                }
                desc
            }
            ColumnVariant::Array { element, fixed_shape } => {
                let mut desc = ColumnDesc::array(name, element)?;
                if let Some(shape) = fixed_shape {
                    desc = desc.with_fixed_shape(shape);
                }
                desc
            }
        };
        Ok(desc.with_comment(comment))
    }
}

/// A stored column bound to a data manager.
#[derive(Debug)]
pub struct PlainColumn {
    desc: ColumnDesc,
    keywords: KeywordSet,
    original_name: String,
    manager: Option<usize>,
    manager_column: Option<u32>,
    data: Option<Box<dyn DataManagerColumn>>,
}

impl PlainColumn {
    pub fn new(desc: ColumnDesc) -> Self {
        let original_name = desc.name().to_string();
        PlainColumn {
            desc,
            keywords: KeywordSet::new(),
            original_name,
            manager: None,
            manager_column: None,
            data: None,
        }
    }

    pub fn desc(&self) -> &ColumnDesc {
        &self.desc
    }

    pub fn name(&self) -> &str {
        self.desc.name()
    }

    /// Name the column carried when the table was created.
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn keywords(&self) -> &KeywordSet {
        &self.keywords
    }

    pub fn keywords_mut(&mut self) -> &mut KeywordSet {
        &mut self.keywords
    }

    pub(crate) fn rename(&mut self, new_name: &str) {
        self.desc.set_name(new_name);
    }

    pub fn is_bound(&self) -> bool {
        self.data.is_some()
    }

    pub fn is_writable(&self) -> bool {
        self.data.as_ref().is_some_and(|d| d.is_writable())
    }

    /// Arena index of the manager this column is bound to.
    pub(crate) fn manager(&self) -> Option<usize> {
        self.manager
    }

    /// Column index within the bound manager.
    pub(crate) fn manager_column(&self) -> Option<u32> {
        self.manager_column
    }

    /// Binds the column at table creation: records the binding identity and
    /// attaches the manager's handle in one step.
    pub(crate) fn bind(
        &mut self,
        manager: usize,
        column: u32,
        handle: Box<dyn DataManagerColumn>,
    ) -> Result<()> {
        ensure!(
            self.data.is_none(),
            "column '{}' is already bound to a data manager",
            self.name()
        );
        self.manager = Some(manager);
        self.manager_column = Some(column);
        self.data = Some(handle);
        Ok(())
    }

    /// Attaches a handle on reopen; the binding identity was restored from
    /// the control block beforehand.
    pub(crate) fn attach(&mut self, handle: Box<dyn DataManagerColumn>) -> Result<()> {
        ensure!(
            self.data.is_none(),
            "column '{}' is already bound to a data manager",
            self.name()
        );
        ensure!(
            self.manager.is_some() && self.manager_column.is_some(),
            "column '{}' has no binding identity to attach to",
            self.name()
        );
        self.data = Some(handle);
        Ok(())
    }

    fn handle(&self) -> Result<&dyn DataManagerColumn> {
        match &self.data {
            Some(d) => Ok(d.as_ref()),
            None => bail!("column '{}' is not bound to a data manager", self.name()),
        }
    }

    fn handle_mut(&mut self) -> Result<&mut Box<dyn DataManagerColumn>> {
        match &mut self.data {
            Some(d) => Ok(d),
            None => bail!("column '{}' is not bound to a data manager", self.desc.name()),
        }
    }

    /// Rejects string values longer than the column's declared maximum.
    /// A no-op for every other type and for unlimited string columns.
    fn check_value_length(&self, value_str: &str) -> Result<()> {
        if let Some(max) = self.desc.max_length() {
            ensure!(
                value_str.len() as u64 <= u64::from(max),
                "string of {} bytes exceeds the maximum length {} of column '{}'",
                value_str.len(),
                max,
                self.name()
            );
        }
        Ok(())
    }

    pub fn get_scalar(&self, row: u64) -> Result<Value> {
        self.handle()?.get_scalar(row)
    }

    /// Reads a scalar and coerces it through the numeric conversion ladder.
    pub fn get_scalar_as(&self, row: u64, target: DataType) -> Result<Value> {
        let value = self.get_scalar(row)?;
        convert_scalar(&value, target)
    }

    pub fn put_scalar(&mut self, row: u64, value: &Value) -> Result<()> {
        if let Value::Str(s) = value {
            self.check_value_length(s)?;
        }
        self.handle_mut()?.put_scalar(row, value)
    }

    pub fn get_array(&self, row: u64) -> Result<ArrayValue> {
        self.handle()?.get_array(row)
    }

    pub fn put_array(&mut self, row: u64, value: &ArrayValue) -> Result<()> {
        if let ArrayData::Str(strings) = value.data() {
            for s in strings {
                self.check_value_length(s)?;
            }
        }
        self.handle_mut()?.put_array(row, value)
    }

    pub fn get_slice(&self, row: u64, slicer: &Slicer) -> Result<ArrayValue> {
        self.handle()?.get_slice(row, slicer)
    }

    pub fn put_slice(&mut self, row: u64, slicer: &Slicer, values: &ArrayValue) -> Result<()> {
        if let ArrayData::Str(strings) = values.data() {
            for s in strings {
                self.check_value_length(s)?;
            }
        }
        self.handle_mut()?.put_slice(row, slicer, values)
    }

    pub fn shape(&self, row: u64) -> Result<Shape> {
        self.handle()?.shape(row)
    }

    pub fn set_shape(&mut self, row: u64, shape: &Shape) -> Result<()> {
        self.handle_mut()?.set_shape(row, shape)
    }

    /// Pins the shape of every cell in the column. Only valid on an array
    /// column before any row exists.
    pub fn set_shape_column(&mut self, shape: &Shape) -> Result<()> {
        ensure!(
            self.desc.is_array(),
            "column '{}' is a scalar column and has no shape",
            self.name()
        );
        self.handle_mut()?.set_column_shape(shape)?;
        self.desc.set_fixed_shape(shape.clone());
        Ok(())
    }

    /// Writes the column control block.
    pub(crate) fn put_file(&self, w: &mut TypedWriter) -> Result<()> {
        let (manager, column) = match (self.manager, self.manager_column) {
            (Some(m), Some(c)) => (m, c),
            _ => bail!("column '{}' is not bound to a data manager", self.name()),
        };
        w.write_u8(COLUMN_BLOCK_VERSION);
        w.write_str(self.name());
        w.write_str(&self.original_name);
        let variant = ColumnVariant::of(&self.desc);
        w.write_u8(variant.tag());
        variant.put_derived(w)?;
        w.write_str(self.desc.comment());
        w.write_record(&self.keywords)?;
        ensure!(
            manager <= u32::MAX as usize,
            "data manager index {} too large",
            manager
        );
        w.write_u32(manager as u32);
        w.write_u32(column);
        Ok(())
    }

    /// Reads a column control block. The result carries its binding
    /// identity but no handle until [`attach`](Self::attach).
    pub(crate) fn get_file(r: &mut TypedReader<'_>) -> Result<Self> {
        let version = r.read_u8()?;
        ensure!(
            version == COLUMN_BLOCK_VERSION,
            "unsupported column block version: {}",
            version
        );
        let name = r.read_str()?;
        let original_name = r.read_str()?;
        let tag = r.read_u8()?;
        let variant = ColumnVariant::get_derived(tag, r)?;
        let comment = r.read_str()?;
        let keywords = r.read_record()?;
        let manager = r.read_u32()? as usize;
        let column = r.read_u32()?;

        let desc = variant.into_desc(&name, &comment)?;
        Ok(PlainColumn {
            desc,
            keywords,
            original_name,
            manager: Some(manager),
            manager_column: Some(column),
            data: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamgr::{DataManager, MemoryManager};
    use crate::stream::Encoding;

    fn bound_column(desc: ColumnDesc, rows: u64) -> (PlainColumn, MemoryManager) {
        let mut mgr = MemoryManager::new();
        let (index, handle) = mgr.add_column(&desc).unwrap();
        mgr.add_rows(rows).unwrap();
        let mut col = PlainColumn::new(desc);
        col.bind(0, index, handle).unwrap();
        (col, mgr)
    }

    #[test]
    fn unbound_columns_reject_access() {
        let desc = ColumnDesc::scalar("TIME", DataType::Float64).unwrap();
        let col = PlainColumn::new(desc);
        assert!(!col.is_bound());
        assert!(!col.is_writable());
        let err = col.get_scalar(0).unwrap_err();
        assert!(err.to_string().contains("not bound"));
    }

    #[test]
    fn bind_is_exactly_once() {
        let desc = ColumnDesc::scalar("TIME", DataType::Float64).unwrap();
        let (mut col, mut mgr) = bound_column(desc.clone(), 1);
        let (_, handle) = mgr.add_column(&desc).unwrap();
        let err = col.bind(0, 1, handle).unwrap_err();
        assert!(err.to_string().contains("already bound"));
    }

    #[test]
    fn scalar_coercion_reads_through_the_ladder() {
        let desc = ColumnDesc::scalar("ANT1", DataType::Int32).unwrap();
        let (mut col, _mgr) = bound_column(desc, 1);
        col.put_scalar(0, &Value::Int32(7)).unwrap();
        assert_eq!(
            col.get_scalar_as(0, DataType::Float64).unwrap(),
            Value::Float64(7.0)
        );
    }

    #[test]
    fn over_long_strings_are_rejected_not_truncated() {
        let desc = ColumnDesc::scalar("NAME", DataType::String)
            .unwrap()
            .with_max_length(4);
        let (mut col, _mgr) = bound_column(desc, 1);
        col.put_scalar(0, &Value::Str("DV01".into())).unwrap();
        let err = col.put_scalar(0, &Value::Str("DV01-X".into())).unwrap_err();
        assert!(err.to_string().contains("maximum length"));
        // the earlier value survives the rejected put
        assert_eq!(col.get_scalar(0).unwrap(), Value::Str("DV01".into()));
    }

    #[test]
    fn shape_column_only_before_rows() {
        let desc = ColumnDesc::array("DATA", DataType::Float32).unwrap();
        let (mut col, _mgr) = bound_column(desc, 1);
        assert!(col.set_shape_column(&Shape::from([3, 4])).is_err());

        let desc = ColumnDesc::array("DATA", DataType::Float32).unwrap();
        let (mut col, _mgr) = bound_column(desc, 0);
        col.set_shape_column(&Shape::from([3, 4])).unwrap();
        assert_eq!(col.desc().fixed_shape(), Some(&Shape::from([3, 4])));
    }

    #[test]
    fn control_block_roundtrips_without_the_handle() {
        let desc = ColumnDesc::array("DATA", DataType::Complex32)
            .unwrap()
            .with_fixed_shape(Shape::from([3, 4]))
            .with_comment("visibilities");
        let (mut col, _mgr) = bound_column(desc, 0);
        col.rename("DATA2");
        col.keywords_mut().define("UNIT", Value::Str("Jy".into()));

        let mut w = TypedWriter::new(Encoding::Canonical);
        col.put_file(&mut w).unwrap();
        let bytes = w.into_bytes();
        let mut r = TypedReader::new(&bytes, Encoding::Canonical);
        let back = PlainColumn::get_file(&mut r).unwrap();

        assert_eq!(back.name(), "DATA2");
        assert_eq!(back.original_name(), "DATA");
        assert_eq!(back.desc().value_type(), DataType::ArrayComplex32);
        assert_eq!(back.desc().fixed_shape(), Some(&Shape::from([3, 4])));
        assert_eq!(back.desc().comment(), "visibilities");
        assert_eq!(
            back.keywords().get("UNIT").unwrap(),
            &Value::Str("Jy".into())
        );
        assert_eq!(back.manager(), Some(0));
        assert_eq!(back.manager_column(), Some(0));
        assert!(!back.is_bound());
    }

    #[test]
    fn unknown_block_version_and_variant_are_rejected() {
        let desc = ColumnDesc::scalar("A", DataType::Int32).unwrap();
        let (col, _mgr) = bound_column(desc, 0);
        let mut w = TypedWriter::new(Encoding::Canonical);
        col.put_file(&mut w).unwrap();
        let mut bytes = w.into_bytes();

        let mut bad_version = bytes.clone();
        bad_version[0] = 0xFF;
        let mut r = TypedReader::new(&bad_version, Encoding::Canonical);
        assert!(PlainColumn::get_file(&mut r).is_err());

        // name "A" occupies bytes 1..3 (varint length + byte), the variant
        // tag follows original name "A" at offset 5
        bytes[5] = 9;
        let mut r = TypedReader::new(&bytes, Encoding::Canonical);
        let err = PlainColumn::get_file(&mut r).unwrap_err();
        assert!(err.to_string().contains("variant tag"));
    }
}
