use bytes::Bytes;
use packed_struct::PackingError;

/// A message body that does not hold what its message ID promises.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("{field}: needed {needed} bytes, {available} available")]
    Truncated {
        field:     &'static str,
        needed:    usize,
        available: usize,
    },

    #[error("unpacking fixed fields: {0}")]
    Layout(#[from] PackingError),
}

/// Big-endian cursor over a message body.
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos:  usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
        }
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn bytes(&mut self, field: &'static str, n: usize) -> Result<&'a [u8], DecodeError> {
        let out = self.data.get(self.pos..self.pos + n).ok_or(DecodeError::Truncated {
            field,
            needed: n,
            available: self.remaining(),
        })?;

        self.pos += n;
        Ok(out)
    }

    pub fn array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(field, N)?);

        Ok(out)
    }

    #[inline]
    pub fn u8(&mut self, field: &'static str) -> Result<u8, DecodeError> {
        Ok(self.bytes(field, 1)?[0])
    }

    #[inline]
    pub fn u16(&mut self, field: &'static str) -> Result<u16, DecodeError> {
        Ok(u16::from_be_bytes(self.array(field)?))
    }

    #[inline]
    pub fn u32(&mut self, field: &'static str) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.array(field)?))
    }

    pub fn rest(&mut self) -> &'a [u8] {
        let out = &self.data[self.pos..];
        self.pos = self.data.len();

        out
    }

    #[inline]
    pub fn rest_bytes(&mut self) -> Bytes {
        Bytes::copy_from_slice(self.rest())
    }
}

/// Terminal text fields. Undecodable sequences come out as U+FFFD.
#[inline]
pub(crate) fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Fixed-width ASCII, with the NUL and space padding terminals use stripped off the end.
pub(crate) fn ascii(bytes: &[u8]) -> String {
    text(bytes).trim_end_matches(&['\0', ' '][..]).to_string()
}
