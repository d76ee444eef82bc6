#[macro_use]
mod macros;

mod collaborator;
mod engine;
mod seq;

pub use collaborator::{
    Authorizer,
    BoxError,
    DecodeFailure,
    EventSink,
    Record,
};
pub use engine::{
    Config,
    Engine,
    Error,
};
pub use seq::{
    AtomicSerial,
    SerialSource,
};
