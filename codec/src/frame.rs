use std::fmt::{
    Display,
    Formatter,
};

use bytes::{
    Buf,
    Bytes,
    BytesMut,
};
use tokio_util::codec::{
    Decoder,
    Encoder,
};

use crate::escape::{
    self,
    FLAG,
};

/// Longest unterminated candidate frame kept in the buffer before it is dropped.
pub const DEFAULT_MAX_FRAME: usize = 4096;

/// A delimiter-bounded frame exactly as it appeared on the wire: both delimiters included, content
/// still escaped.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RawFrame(Bytes);

impl RawFrame {
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    /// The escaped bytes between the two delimiters.
    #[inline]
    pub fn content(&self) -> &[u8] {
        &self.0[1..self.0.len() - 1]
    }

    #[inline]
    pub fn unescape(&self) -> BytesMut {
        escape::unescape(self.content())
    }
}

impl AsRef<[u8]> for RawFrame {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl Display for RawFrame {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Splits a byte stream into [`RawFrame`]s and writes escaped, delimited frames back out.
///
/// The decoder pairs each delimiter with the next one it finds. Bytes ahead of a start delimiter
/// can never belong to a frame and are dropped; a lone delimiter waits in the buffer for its
/// partner. Malformed input never surfaces as an error, so a [`FramedRead`] built on this codec
/// keeps running for as long as the connection does.
///
/// A frame with more than `max_len` bytes ahead of its end delimiter is dropped along with that
/// delimiter, whether it arrives whole or the limit is crossed while it is still being buffered.
///
/// [`FramedRead`]: tokio_util::codec::FramedRead
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_len:     usize,
    search_from: usize,
    /// Skipping the rest of an oversized frame, up to and including its end delimiter.
    discarding:  bool,
}

impl FrameCodec {
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len,
            search_from: 0,
            discarding: false,
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME)
    }
}

impl Decoder for FrameCodec {
    type Error = Error;
    type Item = RawFrame;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if self.discarding {
                match src.iter().position(|&b| b == FLAG) {
                    Some(end) => {
                        src.advance(end + 1);
                        self.discarding = false;
                    },
                    None => {
                        src.clear();
                        return Ok(None);
                    },
                }
            }

            let start = match src.iter().position(|&b| b == FLAG) {
                Some(start) => start,
                None => {
                    if !src.is_empty() {
                        tracing::trace!(discarded = %hex::encode(&src[..]), "no frame delimiter in buffer");
                    }

                    src.clear();
                    self.search_from = 0;

                    return Ok(None);
                },
            };

            if start > 0 {
                tracing::debug!(discarded = %hex::encode(&src[..start]), "dropping bytes ahead of frame start");
                src.advance(start);
                self.search_from = 0;
            }

            let from = self.search_from.max(1);

            match src[from..].iter().position(|&b| b == FLAG) {
                Some(offset) => {
                    let end = from + offset;
                    self.search_from = 0;

                    if end > self.max_len {
                        tracing::warn!(len = end + 1, limit = self.max_len, "frame exceeded size limit, discarding");

                        src.advance(end + 1);
                        continue;
                    }

                    return Ok(Some(RawFrame(src.split_to(end + 1).freeze())));
                },
                None if src.len() > self.max_len => {
                    tracing::warn!(
                        len = src.len(),
                        limit = self.max_len,
                        "unterminated frame exceeded size limit, discarding"
                    );

                    src.clear();
                    self.search_from = 0;
                    self.discarding = true;

                    return Ok(None);
                },
                None => {
                    self.search_from = src.len();
                    return Ok(None);
                },
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let result @ Some(_) = self.decode(buf)? {
            return Ok(result);
        }

        if !buf.is_empty() {
            tracing::debug!(remaining = %hex::encode(&buf[..]), "stream closed inside a frame");
            buf.clear();
        }

        self.search_from = 0;
        self.discarding = false;

        Ok(None)
    }
}

impl<T> Encoder<T> for FrameCodec
where
    T: AsRef<[u8]>,
{
    type Error = Error;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let item = item.as_ref();

        dst.reserve(item.len() + 2);
        dst.extend_from_slice(&[FLAG]);
        escape::escape_into(item, dst);
        dst.extend_from_slice(&[FLAG]);

        Ok(())
    }
}
