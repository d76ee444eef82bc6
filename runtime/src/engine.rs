use std::{
    net::SocketAddr,
    sync::Arc,
};

use bytes::BytesMut;
use chrono::{
    DateTime,
    Utc,
};
use jt808_codec::RawFrame;
use message::{
    Decoder,
    Event,
    Header,
    OutboundMessage,
    Packet,
    PassThroughPolicy,
    Registration,
    RegistrationResult,
    ResponseResult,
};

use crate::{
    AtomicSerial,
    Authorizer,
    DecodeFailure,
    EventSink,
    Record,
    SerialSource,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("frame rejected: {0}")]
    Rejected(#[from] message::Error),

    #[error("decoding message body: {0}")]
    Decode(#[from] message::DecodeError),

    #[error("encoding response: {0}")]
    Encode(#[source] message::Error),
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Appended to every registration response.
    pub auth_code:    String,
    pub pass_through: PassThroughPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth_code:    "AUTH".to_string(),
            pass_through: PassThroughPolicy::default(),
        }
    }
}

/// Turns raw frames into events and responses.
///
/// One engine is shared by every connection. All per-connection state lives in the framing layer,
/// so frames can be handed to [`Engine::handle_frame`] from any number of tasks.
pub struct Engine {
    decoder:    Decoder,
    auth_code:  String,
    authorizer: Arc<dyn Authorizer>,
    sink:       Arc<dyn EventSink>,
    serials:    Arc<dyn SerialSource>,
}

impl Engine {
    pub fn new(config: Config, authorizer: Arc<dyn Authorizer>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            decoder: Decoder::new(config.pass_through),
            auth_code: config.auth_code,
            authorizer,
            sink,
            serials: Arc::new(AtomicSerial::default()),
        }
    }

    pub fn with_serials(self, serials: Arc<dyn SerialSource>) -> Self {
        Self {
            serials,
            ..self
        }
    }

    /// Run one frame through unescaping, validation, decoding and the collaborators.
    ///
    /// Returns the escaped-ready bytes (header, body, checksum) of the response, if the message
    /// calls for one. An `Err` means the frame was dropped; the connection should carry on.
    #[tracing::instrument(level = "debug", skip_all, fields(peer = %peer))]
    pub async fn handle_frame(
        &self,
        peer: SocketAddr,
        frame: &RawFrame,
    ) -> Result<Option<BytesMut>, Error> {
        let received = Utc::now();

        let content = frame.unescape();
        let packet = Packet::unpack(&content)?;

        tracing::debug!(%packet, "accepted frame");

        let event = match self.decoder.decode(&packet, received) {
            Ok(event) => event,
            Err(e) => {
                let failure = DecodeFailure {
                    received,
                    peer,
                    terminal_id: packet.header.terminal_id(),
                    message_id: packet.header.id,
                    serial: packet.header.serial,
                    error: e.to_string(),
                    raw: hex::encode(&content),
                };

                trace_catch!(self.sink.decode_failed(&failure).await, "reporting decode failure");

                return Err(e.into());
            },
        };

        let authorized = match &event {
            Event::Registration(reg) => Some(self.authorize(&packet.header, reg).await),
            _ => None,
        };

        let response = self.respond(&packet.header, &event, authorized, &received);

        let mut record = Record::new(received, peer, &packet.header, event, &content);
        record.authorized = authorized;
        self.store(&record).await;

        response.map(|msg| self.encode(&msg)).transpose()
    }

    async fn authorize(&self, header: &Header, reg: &Registration) -> bool {
        let terminal_id = header.terminal_id();

        let result = self
            .authorizer
            .is_authorized(&terminal_id, &reg.model, &reg.hardware_id, reg.vin.as_deref())
            .await;

        match result {
            Ok(authorized) => {
                tracing::info!(%terminal_id, authorized, model = %reg.model, "terminal registration");
                authorized
            },
            Err(e) => {
                tracing::error!(error = %e, %terminal_id, "authorization failed, denying registration");
                false
            },
        }
    }

    async fn store(&self, record: &Record) {
        trace_catch!(self.sink.record(record).await, event = record.event.name(), "storing record");

        if let Event::DataPassThrough(pt) = &record.event {
            if let Some(vin) = &pt.vin {
                tracing::info!(terminal_id = %record.terminal_id, %vin, "vin found in pass-through data");

                trace_catch!(
                    self.sink.vin_extracted(&record.terminal_id, vin).await,
                    terminal_id = %record.terminal_id,
                    "storing extracted vin"
                );
            }
        }
    }

    fn respond(
        &self,
        header: &Header,
        event: &Event,
        authorized: Option<bool>,
        now: &DateTime<Utc>,
    ) -> Option<OutboundMessage> {
        let terminal_id = header.terminal_id();
        let ack = |result: ResponseResult| {
            OutboundMessage::universal_response(&terminal_id, header.serial, header.id, result)
        };

        let msg = match event {
            Event::TerminalCommonResponse {
                ..
            } => return None,

            Event::Registration(_) => {
                let result = match authorized {
                    Some(true) => RegistrationResult::Success,
                    _ => RegistrationResult::Denied,
                };

                OutboundMessage::registration_response(
                    &terminal_id,
                    header.serial,
                    result,
                    &self.auth_code,
                )
            },

            Event::TimeSyncRequest => OutboundMessage::time_sync_response(&terminal_id, now),

            Event::Unrecognized {
                message_id,
                body,
            } => {
                tracing::info!(
                    message_id = %format_args!("{:#06x}", message_id),
                    body = %hex::encode(body),
                    "unrecognized message"
                );

                ack(ResponseResult::Unsupported)
            },

            Event::Authentication {
                ..
            }
            | Event::Heartbeat
            | Event::LocationReport(_)
            | Event::TextMessage {
                ..
            }
            | Event::ControlResponse {
                ..
            }
            | Event::DataPassThrough(_) => ack(ResponseResult::Success),
        };

        Some(msg)
    }

    fn encode(&self, msg: &OutboundMessage) -> Result<BytesMut, Error> {
        let serial = self.serials.next();

        tracing::debug!(
            message_id = %format_args!("{:#06x}", msg.message_id),
            serial,
            body = %hex::encode(&msg.body),
            "sending response"
        );

        msg.pack(serial).map_err(Error::Encode)
    }
}
