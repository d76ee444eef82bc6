use std::net::SocketAddr;

use futures::{
    SinkExt,
    StreamExt,
};
use jt808_codec::{
    tokio_codec::{
        FramedRead,
        FramedWrite,
    },
    FrameCodec,
};
use runtime::Engine;
use tokio::net::TcpStream;

use crate::{
    Error,
    ServerConfig,
};

/// Process frames from one terminal, strictly in arrival order, until it disconnects or idles out.
///
/// Nothing a single frame contains ends the loop; only transport failures do.
#[tracing::instrument(level = "debug", skip(stream, engine, config))]
pub(crate) async fn serve(
    stream: TcpStream,
    peer: SocketAddr,
    engine: &Engine,
    config: &ServerConfig,
) -> Result<(), Error> {
    stream.set_nodelay(true)?;

    let (rx, tx) = stream.into_split();

    let mut frames = FramedRead::new(rx, FrameCodec::new(config.max_frame));
    let mut responses = FramedWrite::new(tx, FrameCodec::new(config.max_frame));

    loop {
        let next = match config.idle_timeout {
            Some(idle) => match tokio::time::timeout(idle, frames.next()).await {
                Ok(next) => next,
                Err(_) => {
                    tracing::info!(%peer, ?idle, "idle timeout");
                    break;
                },
            },
            None => frames.next().await,
        };

        let frame = match next {
            Some(frame) => frame?,
            None => break,
        };

        match engine.handle_frame(peer, &frame).await {
            Ok(Some(response)) => responses.send(response).await?,
            Ok(None) => {},

            Err(e @ runtime::Error::Encode(_)) => {
                tracing::error!(error = %e, %frame, "building response");
            },
            Err(e) => {
                tracing::warn!(error = %e, %frame, "dropped frame");
            },
        }
    }

    Ok(())
}
