//! A server for terminals speaking the JT/T 808 vehicle telemetry protocol.
//!
//! The protocol itself lives in the member crates re-exported here; this crate wires them into a
//! binary.

pub use ::codec;
pub use ::message;
pub use ::net;
pub use ::runtime;

pub use crate::options::Options;

pub mod collaborators;
pub mod options;
pub mod signals;
pub mod trace;

mod macros;
