//! The narrow interfaces the engine calls out through: authorization of registering terminals
//! and storage of what they send.

use std::net::SocketAddr;

use chrono::{
    DateTime,
    Utc,
};
use message::{
    Event,
    Header,
};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[async_trait::async_trait]
pub trait Authorizer: Send + Sync {
    /// Whether a registering terminal may connect. An `Err` is treated as a denial.
    async fn is_authorized(
        &self,
        terminal_id: &str,
        model: &str,
        hardware_id: &str,
        vin: Option<&str>,
    ) -> Result<bool, BoxError>;
}

/// Storage for decoded traffic. Errors are logged by the caller and otherwise ignored.
#[async_trait::async_trait]
pub trait EventSink: Send + Sync {
    /// Called once for every frame that decoded to an [`Event`], unrecognized message IDs
    /// included.
    async fn record(&self, record: &Record) -> Result<(), BoxError>;

    /// A VIN turned up in pass-through text from `terminal_id`.
    async fn vin_extracted(&self, _terminal_id: &str, _vin: &str) -> Result<(), BoxError> {
        Ok(())
    }

    async fn decode_failed(&self, _failure: &DecodeFailure) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Everything known about one decoded message.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Record {
    pub received:    DateTime<Utc>,
    pub peer:        SocketAddr,
    pub terminal_id: String,
    pub message_id:  u16,
    pub serial:      u16,
    pub event:       Event,
    /// Set for registrations only.
    pub authorized:  Option<bool>,
    /// Unescaped frame content, hex.
    pub raw:         String,
}

impl Record {
    pub fn new(
        received: DateTime<Utc>,
        peer: SocketAddr,
        header: &Header,
        event: Event,
        raw: &[u8],
    ) -> Self {
        Self {
            received,
            peer,
            terminal_id: header.terminal_id(),
            message_id: header.id,
            serial: header.serial,
            event,
            authorized: None,
            raw: hex::encode(raw),
        }
    }
}

/// A frame with a valid header whose body could not be decoded.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct DecodeFailure {
    pub received:    DateTime<Utc>,
    pub peer:        SocketAddr,
    pub terminal_id: String,
    pub message_id:  u16,
    pub serial:      u16,
    pub error:       String,
    pub raw:         String,
}
