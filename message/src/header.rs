use packed_struct::{
    prelude::*,
    PackedStructSlice,
};

use crate::{
    bcd,
    Error,
};

/// Bytes in the fixed message header.
pub const HEADER_LEN: usize = 12;

/// Bytes of BCD in the terminal identifier.
pub const TERMINAL_ID_LEN: usize = 6;

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PackedStruct, serde::Serialize, serde::Deserialize,
)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "12")]
pub struct Header {
    #[packed_field(endian = "msb")]
    pub id:         u16,
    #[packed_field(endian = "msb")]
    pub properties: u16,
    pub terminal:   [u8; 6],
    #[packed_field(endian = "msb")]
    pub serial:     u16,
}

impl Header {
    pub fn new(id: u16, body_len: usize, terminal_id: &str, serial: u16) -> Result<Self, Error> {
        let properties = BodyProperties::for_body(body_len)?;

        let mut terminal = [0u8; TERMINAL_ID_LEN];
        terminal.copy_from_slice(&bcd::encode(terminal_id, TERMINAL_ID_LEN));

        Ok(Self {
            id,
            properties: properties.into(),
            terminal,
            serial,
        })
    }

    #[inline]
    pub fn kind(&self) -> Option<MessageId> {
        MessageId::from_primitive(self.id)
    }

    #[inline]
    pub fn body_properties(&self) -> BodyProperties {
        BodyProperties(self.properties)
    }

    /// The terminal identifier as its full 12 digits, leading zeros kept.
    #[inline]
    pub fn terminal_id(&self) -> String {
        bcd::decode(&self.terminal)
    }

    pub fn unpack_prefix(src: &[u8]) -> Result<Self, Error> {
        if src.len() < HEADER_LEN {
            return Err(Error::TooShort {
                len: src.len(),
            });
        }

        Ok(Self::unpack_from_slice(&src[..HEADER_LEN])?)
    }

    #[inline]
    pub fn display(&self) -> String {
        let kind = match self.kind() {
            Some(kind) => format!("{:?}", kind),
            None => "Unknown".to_string(),
        };

        format!(
            "{} [{:#06x}] from {} [serial {}]",
            kind,
            self.id,
            self.terminal_id(),
            self.serial
        )
    }
}

/// Message identifiers this server decodes or emits.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PrimitiveEnum_u16, serde::Serialize, serde::Deserialize,
)]
#[repr(u16)]
pub enum MessageId {
    TerminalResponse     = 0x0001,
    Heartbeat            = 0x0002,
    Registration         = 0x0100,
    Authentication       = 0x0102,
    LocationReport       = 0x0200,
    TextMessage          = 0x0300,
    ControlResponse      = 0x0500,
    PassThrough          = 0x0900,
    TimeSyncRequest      = 0x0f01,
    PlatformResponse     = 0x8001,
    RegistrationResponse = 0x8100,
    TimeSyncResponse     = 0x8f01,
}

/// The header's body-properties word.
///
/// ```text
///  15 14 | 13          | 12 11 10   | 9 .. 0
///  rsvd  | sub-package | encryption | body length
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BodyProperties(pub u16);

impl BodyProperties {
    pub const MAX_BODY: usize = 0x03ff;

    const ENCRYPTION_MASK: u16 = 0x1c00;
    const ENCRYPTION_SHIFT: u16 = 10;
    const LENGTH_MASK: u16 = 0x03ff;
    const SUBPACKAGE_BIT: u16 = 0x2000;

    pub fn for_body(len: usize) -> Result<Self, Error> {
        if len > Self::MAX_BODY {
            return Err(Error::BodyTooLong {
                len,
            });
        }

        Ok(Self(len as u16))
    }

    #[inline]
    pub fn body_len(self) -> usize {
        (self.0 & Self::LENGTH_MASK) as usize
    }

    #[inline]
    pub fn encryption(self) -> u8 {
        ((self.0 & Self::ENCRYPTION_MASK) >> Self::ENCRYPTION_SHIFT) as u8
    }

    #[inline]
    pub fn is_subpackaged(self) -> bool {
        self.0 & Self::SUBPACKAGE_BIT != 0
    }
}

impl From<BodyProperties> for u16 {
    #[inline]
    fn from(props: BodyProperties) -> Self {
        props.0
    }
}
