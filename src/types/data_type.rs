//! # Table Data Types
//!
//! The canonical `DataType` enum for astrotab, used across column
//! descriptors, keyword sets, and the typed binary stream. This is a closed
//! set: the on-disk format depends on these discriminants never changing,
//! so new types may only be appended with new tag values.
//!
//! ## Type Categories
//!
//! | Category   | Types                                      | Element Size |
//! |------------|--------------------------------------------|--------------|
//! | Boolean    | Bool                                       | 1 byte       |
//! | Integer    | UInt8, Int16, Int32, Int64                 | 1-8 bytes    |
//! | Float      | Float32, Float64                           | 4, 8 bytes   |
//! | Complex    | Complex32, Complex64                       | 8, 16 bytes  |
//! | Text       | String                                     | variable     |
//! | Arrays     | ArrayBool .. ArrayString                   | variable     |
//! | Composite  | Record, Table, Other                       | variable     |
//!
//! ## Discriminant Values
//!
//! Discriminants are grouped so the scalar/array relationship is a fixed
//! offset of 20:
//! - 0-9: scalar types
//! - 20-29: array counterparts, same order
//! - 40-42: composite tags (Record, Table, Other)
//!
//! The `#[repr(u8)]` discriminant is the wire type tag used by the typed
//! binary stream and by keyword-set serialization. `TryFrom<u8>` rejects
//! unknown tags so a corrupt or future-format file fails loudly instead of
//! being misinterpreted.

use eyre::bail;

/// Offset between a scalar type tag and its array counterpart.
const ARRAY_OFFSET: u8 = 20;

/// Canonical type tag for every value the table system can hold.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Bool = 0,
    UInt8 = 1,
    Int16 = 2,
    Int32 = 3,
    Int64 = 4,
    Float32 = 5,
    Float64 = 6,
    Complex32 = 7,
    Complex64 = 8,
    String = 9,

    ArrayBool = 20,
    ArrayUInt8 = 21,
    ArrayInt16 = 22,
    ArrayInt32 = 23,
    ArrayInt64 = 24,
    ArrayFloat32 = 25,
    ArrayFloat64 = 26,
    ArrayComplex32 = 27,
    ArrayComplex64 = 28,
    ArrayString = 29,

    Record = 40,
    Table = 41,
    Other = 42,
}

impl DataType {
    /// Returns true for the plain scalar tags (Bool through String).
    pub fn is_scalar(&self) -> bool {
        (*self as u8) <= DataType::String as u8
    }

    /// Returns true for the array counterparts.
    pub fn is_array(&self) -> bool {
        let v = *self as u8;
        (DataType::ArrayBool as u8..=DataType::ArrayString as u8).contains(&v)
    }

    /// The scalar element type of an array tag; scalars return themselves.
    ///
    /// Composite tags (Record, Table, Other) have no element type.
    pub fn element_type(&self) -> Option<DataType> {
        if self.is_scalar() {
            Some(*self)
        } else if self.is_array() {
            // INVARIANT: array discriminants are scalar discriminants + ARRAY_OFFSET
            Some(DataType::try_from(*self as u8 - ARRAY_OFFSET).unwrap())
        } else {
            None
        }
    }

    /// The array counterpart of a scalar tag.
    pub fn array_of(&self) -> Option<DataType> {
        if self.is_scalar() {
            // INVARIANT: every scalar tag has an array counterpart at +ARRAY_OFFSET
            Some(DataType::try_from(*self as u8 + ARRAY_OFFSET).unwrap())
        } else {
            None
        }
    }

    /// Bytes one element occupies in the canonical encoding, or None for
    /// variable-length and composite types.
    pub fn fixed_size(&self) -> Option<usize> {
        match self.element_type().unwrap_or(*self) {
            DataType::Bool | DataType::UInt8 => Some(1),
            DataType::Int16 => Some(2),
            DataType::Int32 | DataType::Float32 => Some(4),
            DataType::Int64 | DataType::Float64 | DataType::Complex32 => Some(8),
            DataType::Complex64 => Some(16),
            _ => None,
        }
    }

    /// Returns true for numeric scalar kinds that take part in the
    /// promotion ladder (integers, floats, complex).
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::UInt8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::Float32
                | DataType::Float64
                | DataType::Complex32
                | DataType::Complex64
        )
    }
}

impl TryFrom<u8> for DataType {
    type Error = eyre::Report;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DataType::Bool),
            1 => Ok(DataType::UInt8),
            2 => Ok(DataType::Int16),
            3 => Ok(DataType::Int32),
            4 => Ok(DataType::Int64),
            5 => Ok(DataType::Float32),
            6 => Ok(DataType::Float64),
            7 => Ok(DataType::Complex32),
            8 => Ok(DataType::Complex64),
            9 => Ok(DataType::String),
            20 => Ok(DataType::ArrayBool),
            21 => Ok(DataType::ArrayUInt8),
            22 => Ok(DataType::ArrayInt16),
            23 => Ok(DataType::ArrayInt32),
            24 => Ok(DataType::ArrayInt64),
            25 => Ok(DataType::ArrayFloat32),
            26 => Ok(DataType::ArrayFloat64),
            27 => Ok(DataType::ArrayComplex32),
            28 => Ok(DataType::ArrayComplex64),
            29 => Ok(DataType::ArrayString),
            40 => Ok(DataType::Record),
            41 => Ok(DataType::Table),
            42 => Ok(DataType::Other),
            _ => bail!("unknown data type tag: {}", value),
        }
    }
}
