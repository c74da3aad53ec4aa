//! # Type System
//!
//! This module provides the closed type system shared by every layer of the
//! table core:
//!
//! - **Type tags**: the `DataType` enum with stable on-disk discriminants
//! - **Runtime values**: `Value`, typed arrays (`ArrayValue`), complex numbers
//! - **Conversion**: one promotion-rank ladder for numeric coercion

pub mod convert;
pub mod data_type;
pub mod value;

pub use convert::{convert_array, convert_scalar, promotion_rank};
pub use data_type::DataType;
pub use value::{ArrayData, ArrayValue, Complex32, Complex64, Value};
