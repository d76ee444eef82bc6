pub use ::tokio_util::codec as tokio_codec;

pub mod escape;
mod frame;

pub use self::{
    escape::{
        escape,
        unescape,
        ESCAPE,
        FLAG,
    },
    frame::*,
};
