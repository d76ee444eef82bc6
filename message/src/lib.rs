pub mod bcd;
pub mod body;
pub mod checksum;
pub mod header;
mod outbound;
mod packet;
mod reader;

pub use body::{
    Decoder,
    Event,
    Extensions,
    LocationReport,
    PassThrough,
    PassThroughPolicy,
    Registration,
};
pub use header::{
    BodyProperties,
    Header,
    MessageId,
    HEADER_LEN,
};
pub use outbound::{
    OutboundMessage,
    RegistrationResult,
    ResponseResult,
};
pub use packet::{
    Error,
    Packet,
};
pub use reader::DecodeError;
