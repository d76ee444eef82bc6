//! Packed binary-coded decimal, two digits per byte, most significant nibble first.
//!
//! Decoding renders each nibble as a hex digit, so a nibble above 9 comes out as `A`-`F` instead
//! of failing. Encoding goes the other way: each character's hex value is packed, with anything
//! that is not a hex digit packed as 0.

use chrono::{
    DateTime,
    NaiveDate,
    TimeZone,
    Utc,
};

const DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Bytes in a BCD `YYMMDDhhmmss` timestamp.
pub const TIME_LEN: usize = 6;

pub fn decode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);

    for &b in bytes {
        out.push(DIGITS[(b >> 4) as usize] as char);
        out.push(DIGITS[(b & 0x0f) as usize] as char);
    }

    out
}

/// Pack `digits` into exactly `len` bytes.
///
/// The digit string is right-aligned in the output: extra leading digits are dropped, missing
/// ones are zero-filled.
pub fn encode(digits: &str, len: usize) -> Vec<u8> {
    let width = len * 2;
    let digits = digits.as_bytes();

    let mut padded = vec![b'0'; width.saturating_sub(digits.len())];
    padded.extend_from_slice(&digits[digits.len().saturating_sub(width)..]);

    padded
        .chunks(2)
        .map(|pair| (nibble(pair[0]) << 4) | nibble(pair[1]))
        .collect()
}

#[inline]
fn nibble(c: u8) -> u8 {
    (c as char).to_digit(16).unwrap_or(0) as u8
}

#[inline]
fn byte_value(b: u8) -> Option<u32> {
    let (hi, lo) = (b >> 4, b & 0x0f);

    if hi > 9 || lo > 9 {
        return None;
    }

    Some((hi * 10 + lo) as u32)
}

/// Decode a `YYMMDDhhmmss` timestamp (years from 2000).
///
/// Returns `None` for the all-zero placeholder terminals send before their first fix, and for
/// anything that is not a real calendar time.
pub fn decode_time(bytes: &[u8]) -> Option<DateTime<Utc>> {
    if bytes.len() != TIME_LEN || bytes.iter().all(|&b| b == 0) {
        return None;
    }

    let mut fields = [0u32; TIME_LEN];
    for (field, &b) in fields.iter_mut().zip(bytes) {
        *field = byte_value(b)?;
    }

    let [year, month, day, hour, minute, second] = fields;

    let naive = NaiveDate::from_ymd_opt(2000 + year as i32, month, day)?
        .and_hms_opt(hour, minute, second)?;

    Some(Utc.from_utc_datetime(&naive))
}

pub fn encode_time(time: &DateTime<Utc>) -> [u8; TIME_LEN] {
    let digits = time.format("%y%m%d%H%M%S").to_string();

    let mut out = [0u8; TIME_LEN];
    out.copy_from_slice(&encode(&digits, TIME_LEN));

    out
}
