//! # Typed Binary Stream
//!
//! The generic scalar/array serialization protocol underlying all table
//! persistence: column control blocks, keyword sets, and storage-manager
//! data files all travel through this module.
//!
//! ## Design
//!
//! The protocol is format-agnostic at two levels:
//!
//! 1. **Logical**: `write_<type>` / `read_<type>` pairs for every primitive
//!    scalar, plus shaped array containers, strings, and nested records.
//! 2. **Physical**: a pluggable [`Encoding`] decides how multi-byte values
//!    map to bytes (canonical big-endian portable form vs. native
//!    little-endian).
//!
//! Reads and writes must agree on element type and count; the readers
//! validate both and fail with a stream error instead of misinterpreting
//! bytes. Array containers are versioned ([`ARRAY_VERSION`]) so future
//! format evolutions stay distinguishable.
//!
//! ## Module Organization
//!
//! - `encoding`: physical byte layouts (canonical / native)
//! - `varint`: marker-byte length encoding shared by both layouts
//! - `writer`: [`TypedWriter`], the append-only write half
//! - `reader`: [`TypedReader`], cursor-based bounds-checked read half

pub mod encoding;
pub mod reader;
pub mod varint;
pub mod writer;

pub use encoding::Encoding;
pub use reader::TypedReader;
pub use writer::TypedWriter;

/// Version tag leading every array container. Readers reject anything else.
pub const ARRAY_VERSION: u8 = 1;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::KeywordSet;
    use crate::shape::Shape;
    use crate::types::{ArrayData, ArrayValue, Complex32, Complex64, Value};

    fn roundtrip_value(value: Value, encoding: Encoding) -> Value {
        let mut w = TypedWriter::new(encoding);
        w.write_value(&value).unwrap();
        let bytes = w.into_bytes();
        let mut r = TypedReader::new(&bytes, encoding);
        let back = r.read_value().unwrap();
        assert_eq!(r.remaining(), 0, "trailing bytes after {:?}", value);
        back
    }

    #[test]
    fn scalar_values_roundtrip_in_both_encodings() {
        let values = [
            Value::Bool(true),
            Value::UInt8(200),
            Value::Int16(-12345),
            Value::Int32(7_000_000),
            Value::Int64(-(1i64 << 60)),
            Value::Float32(3.25),
            Value::Float64(-2.5e300),
            Value::Complex32(Complex32::new(1.0, -2.0)),
            Value::Complex64(Complex64::new(0.5, 0.25)),
            Value::Str("visibility data".into()),
            Value::Str(String::new()),
        ];
        for encoding in [Encoding::Canonical, Encoding::Native] {
            for v in &values {
                assert_eq!(roundtrip_value(v.clone(), encoding), *v);
            }
        }
    }

    #[test]
    fn canonical_and_native_differ_in_byte_order_only() {
        let mut canonical = TypedWriter::new(Encoding::Canonical);
        canonical.write_i32(0x0102_0304);
        let mut native = TypedWriter::new(Encoding::Native);
        native.write_i32(0x0102_0304);
        let mut reversed = native.into_bytes();
        reversed.reverse();
        assert_eq!(canonical.into_bytes(), reversed);
    }

    #[test]
    fn arrays_roundtrip_bit_for_bit() {
        let arrays = [
            ArrayValue::new(
                Shape::from([3, 4]),
                ArrayData::Float32((0..12).map(|i| i as f32 * 0.5).collect()),
            )
            .unwrap(),
            ArrayValue::new(Shape::from([2]), ArrayData::Bool(vec![true, false])).unwrap(),
            ArrayValue::new(
                Shape::from([2, 2]),
                ArrayData::Complex64(vec![
                    Complex64::new(1.0, 2.0),
                    Complex64::new(-1.0, 0.0),
                    Complex64::new(0.0, -7.5),
                    Complex64::new(1e10, 1e-10),
                ]),
            )
            .unwrap(),
            ArrayValue::new(
                Shape::from([3]),
                ArrayData::Str(vec!["a".into(), String::new(), "long antenna name".into()]),
            )
            .unwrap(),
            ArrayValue::filled_default(crate::types::DataType::Int64, &Shape::from([0])).unwrap(),
        ];
        for encoding in [Encoding::Canonical, Encoding::Native] {
            for a in &arrays {
                let back = roundtrip_value(Value::Array(a.clone()), encoding);
                assert_eq!(back, Value::Array(a.clone()));
            }
        }
    }

    #[test]
    fn slice_writes_equal_sequential_single_writes() {
        let values = [1i32, -2, 3_000_000, i32::MIN];
        let mut singles = TypedWriter::new(Encoding::Canonical);
        for &v in &values {
            singles.write_i32(v);
        }
        let array = ArrayValue::new(Shape::from([4]), ArrayData::Int32(values.to_vec())).unwrap();
        let mut container = TypedWriter::new(Encoding::Canonical);
        container.write_array(&array).unwrap();
        // container = version, tag, shape, then exactly the sequential bytes
        let bytes = container.into_bytes();
        assert!(bytes.ends_with(singles.bytes()));
    }

    #[test]
    fn sliced_subarrays_serialize_like_their_elements() {
        use crate::shape::{Slice, Slicer};
        let source =
            ArrayValue::new(Shape::from([2, 4]), ArrayData::Int16((0i16..8).collect())).unwrap();
        // every other column: a non-contiguous selection of the source
        let slicer = Slicer::new(&[Slice::new(0, 2), Slice::strided(1, 2, 2).unwrap()]);
        let sub = source.slice(&slicer).unwrap();
        assert_eq!(sub.shape(), &Shape::from([2, 2]));

        let mut singles = TypedWriter::new(Encoding::Canonical);
        for v in [1i16, 3, 5, 7] {
            singles.write_i16(v);
        }
        let mut container = TypedWriter::new(Encoding::Canonical);
        container.write_array(&sub).unwrap();
        assert!(container.into_bytes().ends_with(singles.bytes()));
    }

    #[test]
    fn nested_records_roundtrip() {
        let mut inner = KeywordSet::new();
        inner.define("UNIT", Value::Str("Jy".into()));
        inner.define("SCALE", Value::Float64(1.5));
        let mut outer = KeywordSet::new();
        outer.define("QUANTITY", Value::Record(Box::new(inner.clone())));
        outer.define("NROW", Value::Int64(42));

        let mut w = TypedWriter::new(Encoding::Canonical);
        w.write_record(&outer).unwrap();
        let bytes = w.into_bytes();
        let mut r = TypedReader::new(&bytes, Encoding::Canonical);
        let back = r.read_record().unwrap();
        assert_eq!(back, outer);
        assert_eq!(
            back.get("QUANTITY").unwrap(),
            &Value::Record(Box::new(inner))
        );
    }

    #[test]
    fn short_stream_fails_instead_of_misreading() {
        let mut w = TypedWriter::new(Encoding::Canonical);
        w.write_value(&Value::Int64(99)).unwrap();
        let bytes = w.into_bytes();
        let mut r = TypedReader::new(&bytes[..bytes.len() - 1], Encoding::Canonical);
        assert!(r.read_value().is_err());
    }

    #[test]
    fn huge_string_length_fails_instead_of_wrapping() {
        // nine-byte varint declaring a u64::MAX-byte string payload
        let mut bytes = vec![255u8];
        bytes.extend([0xFF; 8]);
        let mut r = TypedReader::new(&bytes, Encoding::Canonical);
        let err = r.read_str().unwrap_err();
        assert!(err.to_string().contains("unexpected end of stream"));
    }

    #[test]
    fn unknown_array_version_is_rejected() {
        let array =
            ArrayValue::new(Shape::from([2]), ArrayData::UInt8(vec![1, 2])).unwrap();
        let mut w = TypedWriter::new(Encoding::Canonical);
        w.write_array(&array).unwrap();
        let mut bytes = w.into_bytes();
        bytes[0] = ARRAY_VERSION + 1;
        let mut r = TypedReader::new(&bytes, Encoding::Canonical);
        let err = r.read_array().unwrap_err();
        assert!(err.to_string().contains("array container version"));
    }

    #[test]
    fn corrupt_element_count_fails_before_allocation() {
        let array =
            ArrayValue::new(Shape::from([2]), ArrayData::Int64(vec![1, 2])).unwrap();
        let mut w = TypedWriter::new(Encoding::Canonical);
        w.write_array(&array).unwrap();
        let mut bytes = w.into_bytes();
        // shape rank byte sits after version + element tag; bump the extent
        // varint (value 2, single byte) to a huge marker-encoded value
        assert_eq!(bytes[2], 1); // rank
        bytes[3] = 240; // extent 2 -> 240, count no longer matches payload
        let mut r = TypedReader::new(&bytes, Encoding::Canonical);
        assert!(r.read_array().is_err());
    }

    #[test]
    fn invalid_bool_byte_is_rejected() {
        let mut r = TypedReader::new(&[2u8], Encoding::Native);
        assert!(r.read_bool().is_err());
    }
}
