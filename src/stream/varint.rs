//! # Variable-Length Integer Encoding
//!
//! Length prefixes in the typed binary stream (string lengths, element
//! counts, keyword counts) use a marker-byte varint optimized for small
//! values. The encoding is endian-independent, so it is shared by both
//! physical encodings.
//!
//! ## Format
//!
//! | Marker   | Bytes | Value                                        |
//! |----------|-------|----------------------------------------------|
//! | 0-240    | 1     | the marker itself                            |
//! | 241-248  | 2     | `240 + ((marker-241) << 8) + next`           |
//! | 249      | 3     | `2288 + (b1 << 8) + b2`                      |
//! | 250      | 4     | 3-byte big-endian                            |
//! | 251      | 5     | 4-byte big-endian                            |
//! | 252-254  | -     | reserved, rejected on decode                 |
//! | 255      | 9     | 8-byte big-endian                            |

use eyre::{bail, ensure, Result};

pub fn varint_len(value: u64) -> usize {
    if value <= 240 {
        1
    } else if value <= 2287 {
        2
    } else if value <= 67823 {
        3
    } else if value <= 0xFF_FFFF {
        4
    } else if value <= 0xFFFF_FFFF {
        5
    } else {
        9
    }
}

pub fn encode_varint(value: u64, buf: &mut Vec<u8>) {
    if value <= 240 {
        buf.push(value as u8);
    } else if value <= 2287 {
        let v = value - 240;
        buf.push(((v >> 8) + 241) as u8);
        buf.push((v & 0xFF) as u8);
    } else if value <= 67823 {
        let v = value - 2288;
        buf.push(249);
        buf.push((v >> 8) as u8);
        buf.push((v & 0xFF) as u8);
    } else if value <= 0xFF_FFFF {
        buf.push(250);
        buf.push((value >> 16) as u8);
        buf.push((value >> 8) as u8);
        buf.push(value as u8);
    } else if value <= 0xFFFF_FFFF {
        buf.push(251);
        buf.push((value >> 24) as u8);
        buf.push((value >> 16) as u8);
        buf.push((value >> 8) as u8);
        buf.push(value as u8);
    } else {
        buf.push(255);
        buf.extend(value.to_be_bytes());
    }
}

pub fn decode_varint(buf: &[u8]) -> Result<(u64, usize)> {
    ensure!(!buf.is_empty(), "unexpected end of stream reading varint");

    let first = buf[0];

    if first <= 240 {
        Ok((first as u64, 1))
    } else if first <= 248 {
        ensure!(buf.len() >= 2, "truncated 2-byte varint");
        Ok((240 + ((first as u64 - 241) << 8) + buf[1] as u64, 2))
    } else if first == 249 {
        ensure!(buf.len() >= 3, "truncated 3-byte varint");
        Ok((2288 + ((buf[1] as u64) << 8) + buf[2] as u64, 3))
    } else if first == 250 {
        ensure!(buf.len() >= 4, "truncated 4-byte varint");
        Ok((
            ((buf[1] as u64) << 16) + ((buf[2] as u64) << 8) + buf[3] as u64,
            4,
        ))
    } else if first == 251 {
        ensure!(buf.len() >= 5, "truncated 5-byte varint");
        Ok((
            ((buf[1] as u64) << 24)
                + ((buf[2] as u64) << 16)
                + ((buf[3] as u64) << 8)
                + buf[4] as u64,
            5,
        ))
    } else if first == 255 {
        ensure!(buf.len() >= 9, "truncated 9-byte varint");
        // INVARIANT: length validated by ensure above
        Ok((u64::from_be_bytes(buf[1..9].try_into().unwrap()), 9))
    } else {
        bail!("invalid varint marker: {}", first)
    }
}
