//! # Physical Byte Encodings
//!
//! How multi-byte primitives map to bytes on disk. Two encodings exist:
//!
//! - **Canonical**: big-endian, the portable archive form. A canonical file
//!   reads identically on any platform, today or years from now.
//! - **Native**: little-endian, matching every supported host. Skips byte
//!   swapping for files that stay on one machine class.
//!
//! The encoding of a file is recorded in its header; readers always decode
//! with the encoding the header declares, never the host's guess.
//!
//! Single-byte values (bool, u8) and varint lengths are identical in both
//! encodings.

use eyre::bail;

/// Physical byte layout for multi-byte primitives.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Big-endian portable form.
    Canonical = 0,
    /// Little-endian host form.
    Native = 1,
}

macro_rules! encode_fns {
    ($($put:ident / $get:ident: $ty:ty),+ $(,)?) => {
        $(
            #[inline]
            pub(crate) fn $put(self, buf: &mut Vec<u8>, v: $ty) {
                match self {
                    Encoding::Canonical => buf.extend(v.to_be_bytes()),
                    Encoding::Native => buf.extend(v.to_le_bytes()),
                }
            }

            #[inline]
            pub(crate) fn $get(self, bytes: [u8; std::mem::size_of::<$ty>()]) -> $ty {
                match self {
                    Encoding::Canonical => <$ty>::from_be_bytes(bytes),
                    Encoding::Native => <$ty>::from_le_bytes(bytes),
                }
            }
        )+
    };
}

impl Encoding {
    encode_fns! {
        put_i16 / get_i16: i16,
        put_i32 / get_i32: i32,
        put_i64 / get_i64: i64,
        put_u32 / get_u32: u32,
        put_u64 / get_u64: u64,
        put_f32 / get_f32: f32,
        put_f64 / get_f64: f64,
    }
}

impl TryFrom<u8> for Encoding {
    type Error = eyre::Report;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Encoding::Canonical),
            1 => Ok(Encoding::Native),
            _ => bail!("unknown encoding tag: {}", value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_is_big_endian() {
        let mut buf = Vec::new();
        Encoding::Canonical.put_u32(&mut buf, 0x0102_0304);
        assert_eq!(buf, [0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn native_is_little_endian() {
        let mut buf = Vec::new();
        Encoding::Native.put_u32(&mut buf, 0x0102_0304);
        assert_eq!(buf, [0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn floats_roundtrip_in_both_encodings() {
        for enc in [Encoding::Canonical, Encoding::Native] {
            let mut buf = Vec::new();
            enc.put_f64(&mut buf, -1234.5678);
            // INVARIANT: put_f64 always appends 8 bytes
            let v = enc.get_f64(buf[..8].try_into().unwrap());
            assert_eq!(v, -1234.5678);
        }
    }

    #[test]
    fn encoding_tag_roundtrip() {
        assert_eq!(Encoding::try_from(0).unwrap(), Encoding::Canonical);
        assert_eq!(Encoding::try_from(1).unwrap(), Encoding::Native);
        assert!(Encoding::try_from(2).is_err());
    }
}
