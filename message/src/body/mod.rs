//! Typed events decoded from message bodies.

use bytes::Bytes;
use chrono::{
    DateTime,
    Utc,
};

use crate::{
    reader::{
        text,
        DecodeError,
    },
    MessageId,
    Packet,
};

mod location;
mod pass_through;
mod registration;

pub use location::{
    Extensions,
    LocationReport,
};
pub use pass_through::{
    PassThrough,
    PassThroughPolicy,
    VIN_PATTERN,
};
pub use registration::Registration;

/// One decoded uplink message.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    Registration(Registration),
    Authentication { code: Bytes },
    Heartbeat,
    LocationReport(LocationReport),
    TextMessage { text: String },
    ControlResponse { body: Bytes },
    TimeSyncRequest,
    DataPassThrough(PassThrough),
    TerminalCommonResponse { body: Bytes },
    Unrecognized { message_id: u16, body: Bytes },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Registration(_) => "registration",
            Event::Authentication {
                ..
            } => "authentication",
            Event::Heartbeat => "heartbeat",
            Event::LocationReport(_) => "location_report",
            Event::TextMessage {
                ..
            } => "text_message",
            Event::ControlResponse {
                ..
            } => "control_response",
            Event::TimeSyncRequest => "time_sync_request",
            Event::DataPassThrough(_) => "data_pass_through",
            Event::TerminalCommonResponse {
                ..
            } => "terminal_common_response",
            Event::Unrecognized {
                ..
            } => "unrecognized",
        }
    }
}

/// Dispatches a validated [`Packet`] to the body decoder for its message ID.
#[derive(Clone, Debug, Default)]
pub struct Decoder {
    pass_through: PassThroughPolicy,
}

impl Decoder {
    pub fn new(pass_through: PassThroughPolicy) -> Self {
        Self {
            pass_through,
        }
    }

    /// Decode `packet`'s body. `received` is used wherever the terminal omits its own time.
    #[tracing::instrument(level = "debug", skip_all, fields(header = %packet.header.display()))]
    pub fn decode(&self, packet: &Packet, received: DateTime<Utc>) -> Result<Event, DecodeError> {
        let body = &packet.body[..];

        let unrecognized = || Event::Unrecognized {
            message_id: packet.header.id,
            body:       packet.body.clone(),
        };

        let kind = match packet.header.kind() {
            Some(kind) => kind,
            None => return Ok(unrecognized()),
        };

        let event = match kind {
            MessageId::TerminalResponse => Event::TerminalCommonResponse {
                body: packet.body.clone(),
            },
            MessageId::Heartbeat => Event::Heartbeat,
            MessageId::Registration => Event::Registration(Registration::decode(body)?),
            MessageId::Authentication => Event::Authentication {
                code: packet.body.clone(),
            },
            MessageId::LocationReport => {
                Event::LocationReport(LocationReport::decode(body, received)?)
            },
            MessageId::TextMessage => Event::TextMessage {
                text: text(body),
            },
            MessageId::ControlResponse => Event::ControlResponse {
                body: packet.body.clone(),
            },
            MessageId::PassThrough => {
                Event::DataPassThrough(PassThrough::decode(body, &self.pass_through)?)
            },
            MessageId::TimeSyncRequest => Event::TimeSyncRequest,

            // platform-to-terminal messages have no business arriving here
            MessageId::PlatformResponse
            | MessageId::RegistrationResponse
            | MessageId::TimeSyncResponse => unrecognized(),
        };

        Ok(event)
    }
}
