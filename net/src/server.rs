use std::{
    future::Future,
    net::SocketAddr,
    sync::Arc,
    time::Duration,
};

use runtime::Engine;
use tokio::{
    net::{
        TcpListener,
        TcpStream,
        ToSocketAddrs,
    },
    sync::Semaphore,
};

use crate::{
    connection,
    Error,
};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// Connections past this many wait for a slot before their first read.
    pub max_connections: usize,
    /// Close a connection that produces no frame for this long.
    pub idle_timeout:    Option<Duration>,
    pub max_frame:       usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_connections: 1024,
            idle_timeout:    Some(Duration::from_secs(300)),
            max_frame:       jt808_codec::DEFAULT_MAX_FRAME,
        }
    }
}

pub struct Server {
    listener: TcpListener,
    engine:   Arc<Engine>,
    config:   Arc<ServerConfig>,
    permits:  Arc<Semaphore>,
}

impl Server {
    #[tracing::instrument(skip_all, err(Display))]
    pub async fn bind(
        addr: impl ToSocketAddrs,
        engine: Arc<Engine>,
        config: ServerConfig,
    ) -> Result<Self, Error> {
        let listener = TcpListener::bind(addr).await?;

        Ok(Self::from_listener(listener, engine, config))
    }

    pub fn from_listener(listener: TcpListener, engine: Arc<Engine>, config: ServerConfig) -> Self {
        // zero would park every connection forever, past MAX_PERMITS the semaphore panics
        let permits = Arc::new(Semaphore::new(config.max_connections.clamp(1, Semaphore::MAX_PERMITS)));

        Self {
            listener,
            engine,
            config: Arc::new(config),
            permits,
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever.
    pub async fn run(self) {
        self.run_until(futures::future::pending()).await
    }

    /// Accept connections until `shutdown` resolves. Connections already accepted keep running.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);

        match self.local_addr() {
            Ok(addr) => tracing::info!(%addr, max_connections = self.config.max_connections, "listening"),
            Err(e) => tracing::warn!(error = %e, "listening on unknown address"),
        }

        loop {
            let accepted = tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("no longer accepting connections");
                    return;
                },
                accepted = self.listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer)) => self.spawn(stream, peer),
                Err(e) => {
                    tracing::warn!(error = %e, "accepting connection");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                },
            }
        }
    }

    fn spawn(&self, stream: TcpStream, peer: SocketAddr) {
        let engine = self.engine.clone();
        let config = self.config.clone();
        let permits = self.permits.clone();

        tracing::info!(%peer, "connection opened");

        tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    tracing::error!(error = %e, %peer, "connection slots closed");
                    return;
                },
            };

            match connection::serve(stream, peer, &engine, &config).await {
                Ok(()) => tracing::info!(%peer, "connection closed"),
                Err(e) => tracing::warn!(error = %e, %peer, "connection closed with error"),
            }
        });
    }
}
