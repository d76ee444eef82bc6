use std::{
    net::{
        IpAddr,
        SocketAddr,
    },
    num::ParseIntError,
    time::Duration,
};

use message::PassThroughPolicy;

#[derive(Debug, Clone, PartialEq, Eq, structopt::StructOpt)]
#[structopt(name = "jt808", about = "JT/T 808 terminal server")]
pub struct Options {
    /// TCP port to accept terminals on.
    #[structopt(short, long)]
    pub port: u16,

    #[structopt(long, default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Connections beyond this many wait for a free slot.
    #[structopt(short = "c", long, default_value = "1024")]
    pub max_connections: usize,

    /// Seconds without a frame before a connection is closed. 0 disables.
    #[structopt(long, default_value = "300")]
    pub idle_timeout: u64,

    /// Largest unterminated frame buffered before it is thrown away.
    #[structopt(long, default_value = "4096")]
    pub max_frame: usize,

    /// Auth code handed back to registering terminals.
    #[structopt(long, default_value = "AUTH")]
    pub auth_code: String,

    /// Terminal ID permitted to register. Repeatable; when absent, every terminal is accepted.
    #[structopt(long = "allow")]
    pub allow: Vec<String>,

    /// Pass-through type byte carrying text (decimal or 0x-prefixed hex). Repeatable.
    #[structopt(long = "passthrough-text-type", parse(try_from_str = parse_byte))]
    pub passthrough_text_types: Vec<u8>,
}

impl Options {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn engine_config(&self) -> runtime::Config {
        let pass_through = if self.passthrough_text_types.is_empty() {
            PassThroughPolicy::default()
        } else {
            PassThroughPolicy::with_text_kinds(self.passthrough_text_types.iter().copied())
        };

        runtime::Config {
            auth_code: self.auth_code.clone(),
            pass_through,
        }
    }

    pub fn server_config(&self) -> net::ServerConfig {
        net::ServerConfig {
            max_connections: self.max_connections,
            idle_timeout:    (self.idle_timeout > 0).then(|| Duration::from_secs(self.idle_timeout)),
            max_frame:       self.max_frame,
        }
    }
}

fn parse_byte(s: &str) -> Result<u8, ParseIntError> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    }
}
