#![allow(dead_code)]

use std::{
    net::SocketAddr,
    str::FromStr,
    sync::{
        Arc,
        Mutex,
    },
    time::Duration,
};

use bytes::{
    Bytes,
    BytesMut,
};
use futures::StreamExt as _;
use tokio::net::{
    tcp::OwnedReadHalf,
    TcpStream,
};
use tokio_util::codec::{
    Encoder as _,
    FramedRead,
};
use tracing_subscriber::{
    fmt::format::FmtSpan,
    EnvFilter,
};

use jt808::{
    codec::FrameCodec,
    message::{
        Header,
        Packet,
    },
    net::{
        Server,
        ServerConfig,
    },
    runtime::{
        Authorizer,
        BoxError,
        Config,
        DecodeFailure,
        Engine,
        EventSink,
        Record,
    },
};

pub const TERMINAL_ID: &str = "000000012345";

const RESPONSE_WAIT: Duration = Duration::from_secs(5);

pub fn trace_init() {
    let level_filter = EnvFilter::from_str("debug").unwrap();

    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stdout)
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(level_filter)
        .pretty()
        .try_init();
}

pub struct ListAuthorizer(pub Vec<String>);

#[async_trait::async_trait]
impl Authorizer for ListAuthorizer {
    async fn is_authorized(
        &self,
        terminal_id: &str,
        _model: &str,
        _hardware_id: &str,
        _vin: Option<&str>,
    ) -> Result<bool, BoxError> {
        Ok(self.0.iter().any(|id| id == terminal_id))
    }
}

#[derive(Default)]
pub struct MemorySink {
    pub records:  Mutex<Vec<Record>>,
    pub failures: Mutex<Vec<DecodeFailure>>,
    pub vins:     Mutex<Vec<(String, String)>>,
}

#[async_trait::async_trait]
impl EventSink for MemorySink {
    async fn record(&self, record: &Record) -> Result<(), BoxError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn vin_extracted(&self, terminal_id: &str, vin: &str) -> Result<(), BoxError> {
        self.vins.lock().unwrap().push((terminal_id.to_string(), vin.to_string()));
        Ok(())
    }

    async fn decode_failed(&self, failure: &DecodeFailure) -> Result<(), BoxError> {
        self.failures.lock().unwrap().push(failure.clone());
        Ok(())
    }
}

/// A running server plus the collaborators it reports to.
pub struct Harness {
    pub addr: SocketAddr,
    pub sink: Arc<MemorySink>,
}

impl Harness {
    pub async fn start(allowed: &[&str]) -> eyre::Result<Self> {
        trace_init();

        let sink = Arc::new(MemorySink::default());
        let authorizer = ListAuthorizer(allowed.iter().map(|s| s.to_string()).collect());

        let engine = Engine::new(Config::default(), Arc::new(authorizer), sink.clone());
        let server = Server::bind("127.0.0.1:0", Arc::new(engine), ServerConfig::default()).await?;
        let addr = server.local_addr()?;

        tokio::spawn(server.run());

        Ok(Self {
            addr,
            sink,
        })
    }

    pub async fn connect(&self) -> eyre::Result<Terminal> {
        let (rx, tx) = TcpStream::connect(self.addr).await?.into_split();

        Ok(Terminal {
            frames: FramedRead::new(rx, FrameCodec::default()),
            tx,
        })
    }

    pub fn records(&self) -> Vec<Record> {
        self.sink.records.lock().unwrap().clone()
    }
}

/// The client end of one connection.
pub struct Terminal {
    frames: FramedRead<OwnedReadHalf, FrameCodec>,
    pub tx: tokio::net::tcp::OwnedWriteHalf,
}

impl Terminal {
    pub async fn send_raw(&mut self, bytes: &[u8]) -> eyre::Result<()> {
        use tokio::io::AsyncWriteExt as _;

        self.tx.write_all(bytes).await?;
        self.tx.flush().await?;

        Ok(())
    }

    pub async fn send(&mut self, id: u16, serial: u16, body: &[u8]) -> eyre::Result<()> {
        self.send_raw(&frame(id, serial, body)?).await
    }

    pub async fn recv(&mut self) -> eyre::Result<Packet> {
        let frame = tokio::time::timeout(RESPONSE_WAIT, self.frames.next())
            .await?
            .ok_or_else(|| eyre::eyre!("connection closed"))??;

        Ok(Packet::unpack(&frame.unescape())?)
    }

    /// Assert nothing arrives for a little while.
    pub async fn expect_silence(&mut self) -> eyre::Result<()> {
        match tokio::time::timeout(Duration::from_millis(200), self.frames.next()).await {
            Err(_) => Ok(()),
            Ok(None) => Err(eyre::eyre!("connection closed")),
            Ok(Some(frame)) => Err(eyre::eyre!("unexpected frame: {}", frame?)),
        }
    }
}

/// A complete wire frame, delimiters included.
pub fn frame(id: u16, serial: u16, body: &[u8]) -> eyre::Result<Vec<u8>> {
    let packed = Packet {
        header: Header::new(id, body.len(), TERMINAL_ID, serial)?,
        body:   Bytes::copy_from_slice(body),
    }
    .pack()?;

    let mut out = BytesMut::new();
    FrameCodec::default().encode(packed, &mut out)?;

    Ok(out.to_vec())
}

pub fn registration_body(vin: &str) -> Vec<u8> {
    let mut out = vec![0x00, 0x2c, 0x01, 0x2f];

    out.extend_from_slice(b"ITB01");
    out.extend_from_slice(&padded(b"GT06-N", 20));
    out.extend_from_slice(b"HW00042");
    out.push(0x02);
    out.extend_from_slice(vin.as_bytes());

    out
}

pub fn location_body(status: u32, time: [u8; 6], tail: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();

    out.extend_from_slice(&0u32.to_be_bytes());
    out.extend_from_slice(&status.to_be_bytes());
    out.extend_from_slice(&31_230_416u32.to_be_bytes());
    out.extend_from_slice(&121_473_701u32.to_be_bytes());
    out.extend_from_slice(&12u16.to_be_bytes());
    out.extend_from_slice(&605u16.to_be_bytes());
    out.extend_from_slice(&90u16.to_be_bytes());
    out.extend_from_slice(&time);
    out.extend_from_slice(tail);

    out
}

fn padded(s: &[u8], len: usize) -> Vec<u8> {
    let mut out = s.to_vec();
    out.resize(len, 0);
    out
}
