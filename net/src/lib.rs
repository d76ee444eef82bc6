//! The TCP side of the server: accepting terminals and running each one's frame loop.

use std::io;

mod connection;
mod server;

pub use server::{
    Server,
    ServerConfig,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Codec(#[from] jt808_codec::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}
