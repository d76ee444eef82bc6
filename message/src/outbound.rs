use bytes::{
    BufMut,
    Bytes,
    BytesMut,
};
use chrono::{
    DateTime,
    Utc,
};

use crate::{
    bcd,
    Error,
    Header,
    MessageId,
    Packet,
};

/// Result codes carried by the platform's universal response.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResponseResult {
    Success        = 0,
    Failure        = 1,
    MessageError   = 2,
    Unsupported    = 3,
    AlarmConfirmed = 4,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RegistrationResult {
    Success = 0,
    Denied  = 1,
}

/// A message for a terminal, before it gets a serial number, a checksum and escaping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundMessage {
    pub message_id:  u16,
    pub terminal_id: String,
    pub body:        Bytes,
}

impl OutboundMessage {
    /// Platform universal response (0x8001).
    pub fn universal_response(
        terminal_id: &str,
        reply_serial: u16,
        reply_id: u16,
        result: ResponseResult,
    ) -> Self {
        let mut body = BytesMut::with_capacity(5);

        body.put_u16(reply_serial);
        body.put_u16(reply_id);
        body.put_u8(result as u8);

        Self {
            message_id:  MessageId::PlatformResponse as u16,
            terminal_id: terminal_id.to_string(),
            body:        body.freeze(),
        }
    }

    /// Registration response (0x8100).
    pub fn registration_response(
        terminal_id: &str,
        reply_serial: u16,
        result: RegistrationResult,
        auth_code: &str,
    ) -> Self {
        let mut body = BytesMut::with_capacity(3 + auth_code.len());

        body.put_u16(reply_serial);
        body.put_u8(result as u8);
        body.put_slice(auth_code.as_bytes());

        Self {
            message_id:  MessageId::RegistrationResponse as u16,
            terminal_id: terminal_id.to_string(),
            body:        body.freeze(),
        }
    }

    /// Time synchronization reply (0x8f01): `01` followed by `now` as BCD `YYMMDDhhmmss`.
    pub fn time_sync_response(terminal_id: &str, now: &DateTime<Utc>) -> Self {
        let mut body = BytesMut::with_capacity(1 + bcd::TIME_LEN);

        body.put_u8(0x01);
        body.put_slice(&bcd::encode_time(now));

        Self {
            message_id:  MessageId::TimeSyncResponse as u16,
            terminal_id: terminal_id.to_string(),
            body:        body.freeze(),
        }
    }

    pub fn packet(&self, serial: u16) -> Result<Packet, Error> {
        Ok(Packet {
            header: Header::new(self.message_id, self.body.len(), &self.terminal_id, serial)?,
            body:   self.body.clone(),
        })
    }

    /// Header, body and checksum for serial number `serial`, ready for escaping.
    #[inline]
    pub fn pack(&self, serial: u16) -> Result<BytesMut, Error> {
        self.packet(serial)?.pack()
    }
}
