//! # Regions
//!
//! Named sub-selections of a data volume, kept alongside a dataset so
//! downstream tools can refer to "the part that matters" by name. A
//! region is a plain value: independently owned, cloneable, and
//! convertible to and from a keyword-set record so it can persist inside
//! table keywords like any other value.
//!
//! Two kinds exist. A box selects the cells between a bottom-left and a
//! top-right corner (both inclusive). A mask is a placeholder naming a
//! per-cell boolean volume with a given shape and tiling; the mask data
//! itself lives elsewhere.

pub mod handler;

pub use handler::RegionHandler;

use crate::keywords::KeywordSet;
use crate::shape::Shape;
use crate::types::{ArrayData, ArrayValue, Value};
use eyre::{bail, ensure, Result};

/// Which namespace a region operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupType {
    Regions,
    Masks,
    /// Search both namespaces (lookup only; never valid for definition).
    Any,
}

/// An independently owned region description.
#[derive(Debug, Clone, PartialEq)]
pub enum Region {
    /// Cells between two corners, both inclusive.
    Box { blc: Vec<u64>, trc: Vec<u64> },
    /// Placeholder for a named boolean mask volume.
    Mask {
        shape: Shape,
        tile_shape: Shape,
        name: String,
    },
}

const REGION_KIND_BOX: &str = "box";
const REGION_KIND_MASK: &str = "mask";

fn coords_value(coords: &[u64]) -> Result<Value> {
    let data: Vec<i64> = coords.iter().map(|&c| c as i64).collect();
    let array = ArrayValue::new(Shape::from([coords.len() as u64]), ArrayData::Int64(data))?;
    Ok(Value::Array(array))
}

fn coords_from(record: &KeywordSet, field: &str) -> Result<Vec<u64>> {
    let value = record.get(field)?;
    let Value::Array(array) = value else {
        bail!("region field '{}' is not an array", field);
    };
    let ArrayData::Int64(data) = array.data() else {
        bail!("region field '{}' is not an integer array", field);
    };
    data.iter()
        .map(|&c| {
            ensure!(c >= 0, "region field '{}' holds negative value {}", field, c);
            Ok(c as u64)
        })
        .collect()
}

impl Region {
    /// Converts the region into a keyword-set record.
    pub fn to_record(&self) -> Result<KeywordSet> {
        let mut record = KeywordSet::new();
        match self {
            Region::Box { blc, trc } => {
                ensure!(
                    blc.len() == trc.len(),
                    "box corners differ in rank: {} vs {}",
                    blc.len(),
                    trc.len()
                );
                record.define("type", Value::Str(REGION_KIND_BOX.into()));
                record.define("blc", coords_value(blc)?);
                record.define("trc", coords_value(trc)?);
            }
            Region::Mask {
                shape,
                tile_shape,
                name,
            } => {
                record.define("type", Value::Str(REGION_KIND_MASK.into()));
                record.define("shape", coords_value(shape.dims())?);
                record.define("tileShape", coords_value(tile_shape.dims())?);
                record.define("name", Value::Str(name.clone()));
            }
        }
        Ok(record)
    }

    /// Rebuilds a region from a record written by [`to_record`](Self::to_record).
    pub fn from_record(record: &KeywordSet) -> Result<Region> {
        let Value::Str(kind) = record.get("type")? else {
            bail!("region record has a non-string 'type' field");
        };
        match kind.as_str() {
            REGION_KIND_BOX => {
                let blc = coords_from(record, "blc")?;
                let trc = coords_from(record, "trc")?;
                ensure!(
                    blc.len() == trc.len(),
                    "box corners differ in rank: {} vs {}",
                    blc.len(),
                    trc.len()
                );
                Ok(Region::Box { blc, trc })
            }
            REGION_KIND_MASK => {
                let Value::Str(name) = record.get("name")? else {
                    bail!("mask record has a non-string 'name' field");
                };
                Ok(Region::Mask {
                    shape: Shape::from(coords_from(record, "shape")?.as_slice()),
                    tile_shape: Shape::from(coords_from(record, "tileShape")?.as_slice()),
                    name: name.clone(),
                })
            }
            other => bail!("unknown region kind '{}'", other),
        }
    }
}

/// Shape and tiling of a data volume; what mask placeholders are sized
/// against.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    shape: Shape,
    tile_shape: Shape,
}

impl Volume {
    pub fn new(shape: Shape, tile_shape: Shape) -> Result<Volume> {
        ensure!(
            shape.ndim() == tile_shape.ndim(),
            "tile shape {} does not match volume rank {}",
            tile_shape,
            shape.ndim()
        );
        Ok(Volume { shape, tile_shape })
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn tile_shape(&self) -> &Shape {
        &self.tile_shape
    }
}
