use std::fmt::{
    Display,
    Formatter,
};

use bytes::{
    BufMut,
    Bytes,
    BytesMut,
};
use packed_struct::prelude::*;

use crate::{
    checksum,
    header::HEADER_LEN,
    Header,
};

/// Reasons a frame is rejected before its body is looked at.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("frame too short: {len} bytes")]
    TooShort { len: usize },

    #[error("checksum mismatch: frame carries {expected:#04x}, computed {computed:#04x}")]
    ChecksumMismatch { expected: u8, computed: u8 },

    #[error("header declares a {declared}-byte body, frame carries {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("unsupported body properties (encryption {encryption:#x}, sub-packaged: {subpackaged})")]
    Unsupported { encryption: u8, subpackaged: bool },

    #[error("body of {len} bytes does not fit the length field")]
    BodyTooLong { len: usize },

    #[error("packing header: {0}")]
    Header(#[from] PackingError),
}

/// A checksum-verified frame split into header and body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    pub header: Header,
    pub body:   Bytes,
}

impl Packet {
    /// Validate the unescaped content of a frame (delimiters already stripped).
    #[tracing::instrument(level = "trace", skip_all, fields(len = src.len()))]
    pub fn unpack(src: &[u8]) -> Result<Self, Error> {
        let content = checksum::verify(src)?;
        let header = Header::unpack_prefix(content)?;

        let props = header.body_properties();
        if props.encryption() != 0 || props.is_subpackaged() {
            return Err(Error::Unsupported {
                encryption:  props.encryption(),
                subpackaged: props.is_subpackaged(),
            });
        }

        let body = &content[HEADER_LEN..];
        if props.body_len() != body.len() {
            return Err(Error::LengthMismatch {
                declared: props.body_len(),
                actual:   body.len(),
            });
        }

        Ok(Self {
            header,
            body: Bytes::copy_from_slice(body),
        })
    }

    /// Header, body and trailing checksum, ready to be escaped and delimited.
    pub fn pack(&self) -> Result<BytesMut, Error> {
        let mut out = BytesMut::with_capacity(HEADER_LEN + self.body.len() + 1);

        out.put_slice(&self.header.pack()?);
        out.put_slice(&self.body);
        out.put_u8(checksum::xor(&out));

        Ok(out)
    }
}

impl Display for Packet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / body: 0x{}", self.header.display(), hex::encode(&self.body))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn packed(id: u16, body: &[u8]) -> BytesMut {
        Packet {
            header: Header::new(id, body.len(), "000000012345", 1).unwrap(),
            body:   Bytes::copy_from_slice(body),
        }
        .pack()
        .unwrap()
    }

    #[test]
    fn test_unpack_heartbeat() -> eyre::Result<()> {
        let raw = [0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x23, 0x45, 0x00, 0x01, 0x64];
        let packet = Packet::unpack(&raw)?;

        assert_eq!(packet.header.id, 0x0002);
        assert_eq!(packet.header.serial, 1);
        assert_eq!(packet.header.terminal_id(), "000000012345");
        assert!(packet.body.is_empty());

        Ok(())
    }

    #[test]
    fn test_pack_unpack() -> eyre::Result<()> {
        let raw = packed(0x0102, b"AUTH_CODE");
        let packet = Packet::unpack(&raw)?;

        assert_eq!(&packet.body[..], b"AUTH_CODE");
        assert_eq!(*raw.last().unwrap(), checksum::xor(&raw[..raw.len() - 1]));

        Ok(())
    }

    #[test]
    fn test_corrupt_checksum() {
        let mut raw = packed(0x0002, &[]);
        *raw.last_mut().unwrap() ^= 0xff;

        assert!(matches!(Packet::unpack(&raw), Err(Error::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_short_frame() {
        let raw = [0x01, 0x02, 0x03, 0x00];
        assert_eq!(Packet::unpack(&raw), Err(Error::TooShort {
            len: 3
        }));
    }

    #[test]
    fn test_length_mismatch() {
        let mut raw = packed(0x0102, b"abc").to_vec();

        // drop one body byte, then fix the checksum up so only the length is wrong
        raw.truncate(raw.len() - 2);
        raw.push(checksum::xor(&raw));

        assert_eq!(Packet::unpack(&raw), Err(Error::LengthMismatch {
            declared: 3,
            actual:   2,
        }));
    }

    #[test]
    fn test_encrypted_rejected() {
        let mut raw = packed(0x0200, &[]).to_vec();

        raw[2] |= 0x04;
        let last = raw.len() - 1;
        raw[last] = checksum::xor(&raw[..last]);

        assert_eq!(Packet::unpack(&raw), Err(Error::Unsupported {
            encryption:  1,
            subpackaged: false,
        }));
    }

    #[test]
    fn test_subpackaged_rejected() {
        let mut raw = packed(0x0200, &[]).to_vec();

        raw[2] |= 0x20;
        let last = raw.len() - 1;
        raw[last] = checksum::xor(&raw[..last]);

        assert_eq!(Packet::unpack(&raw), Err(Error::Unsupported {
            encryption:  0,
            subpackaged: true,
        }));
    }
}
