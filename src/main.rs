use std::sync::Arc;

use eyre::Result;
use structopt::StructOpt as _;

use jt808::{
    bootstrap,
    collaborators::{
        StaticAuthorizer,
        TracingSink,
    },
    net::Server,
    runtime::Engine,
    signals,
    trace,
    Options,
};

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap!("starting {} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let options = Options::from_args();

    trace::init()?;

    tracing::info!(
        application = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        addr = %options.addr(),
        "tracing subsystem initialized"
    );

    let authorizer = StaticAuthorizer::new(options.allow.iter().cloned());
    let engine = Engine::new(options.engine_config(), Arc::new(authorizer), Arc::new(TracingSink));

    let server = Server::bind(options.addr(), Arc::new(engine), options.server_config()).await?;
    server.run_until(signals::shutdown()).await;

    tracing::info!("shut down");

    Ok(())
}
