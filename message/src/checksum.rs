use crate::Error;

/// XOR of every byte in `data`.
#[inline]
pub fn xor(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, &b| acc ^ b)
}

/// Split off and check the trailing checksum byte of an unescaped frame, returning the bytes it
/// covers.
pub fn verify(src: &[u8]) -> Result<&[u8], Error> {
    let (&expected, content) = src.split_last().ok_or(Error::TooShort {
        len: 0,
    })?;

    let computed = xor(content);

    if computed != expected {
        tracing::debug!(
            expected = %format_args!("{:#04x}", expected),
            computed = %format_args!("{:#04x}", computed),
            "checksum mismatch"
        );

        return Err(Error::ChecksumMismatch {
            expected,
            computed,
        });
    }

    Ok(content)
}
