//! Byte stuffing between the frame delimiter and the frame content.
//!
//! Inside a frame, [`FLAG`] is written as `7d 02` and [`ESCAPE`] as `7d 01`.
//! Every other byte is carried as-is.

use bytes::{
    BufMut,
    BytesMut,
};

/// Frame delimiter.
pub const FLAG: u8 = 0x7e;

/// Escape marker.
pub const ESCAPE: u8 = 0x7d;

const ESCAPED_FLAG: u8 = 0x02;
const ESCAPED_ESCAPE: u8 = 0x01;

#[inline]
pub fn escape_into(src: &[u8], dst: &mut BytesMut) {
    dst.reserve(src.len());

    for &b in src {
        match b {
            FLAG => dst.put_slice(&[ESCAPE, ESCAPED_FLAG]),
            ESCAPE => dst.put_slice(&[ESCAPE, ESCAPED_ESCAPE]),
            b => dst.put_u8(b),
        }
    }
}

pub fn escape(src: &[u8]) -> BytesMut {
    let mut out = BytesMut::with_capacity(src.len());
    escape_into(src, &mut out);

    out
}

/// Reverse [`escape`].
///
/// An escape marker that is not followed by `01` or `02` (including one at the very end of the
/// input) is kept verbatim. Terminals in the field emit such sequences and the rest of the frame
/// is still worth checksumming.
pub fn unescape(src: &[u8]) -> BytesMut {
    let mut out = BytesMut::with_capacity(src.len());
    let mut iter = src.iter().copied().peekable();

    while let Some(b) = iter.next() {
        if b != ESCAPE {
            out.put_u8(b);
            continue;
        }

        match iter.peek() {
            Some(&ESCAPED_FLAG) => {
                iter.next();
                out.put_u8(FLAG);
            },
            Some(&ESCAPED_ESCAPE) => {
                iter.next();
                out.put_u8(ESCAPE);
            },
            _ => out.put_u8(ESCAPE),
        }
    }

    out
}
