use tracing_subscriber::{
    fmt::format::FmtSpan,
    prelude::*,
    EnvFilter,
};

use crate::bootstrap;

cfg_if::cfg_if! {
    if #[cfg(debug_assertions)] {
        const DEFAULT_DIRECTIVE: &str =
            "info,jt808=debug,jt808_net=debug,jt808_runtime=debug,jt808_message=debug";
    } else {
        const DEFAULT_DIRECTIVE: &str = "warn,jt808=info,jt808_net=info,jt808_runtime=info";
    }
}

/// Install the global subscriber on stderr. Debug builds print for humans, release builds emit
/// one JSON object per line. A set `RUST_LOG` replaces the default directive, and a malformed
/// one fails startup.
pub fn init() -> eyre::Result<()> {
    let filter = filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref())?;
    bootstrap!("enabling tracing with filter directive: {}", filter);

    let output = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE);

    let output = {
        cfg_if::cfg_if! {
            if #[cfg(debug_assertions)] {
                output.pretty()
            } else {
                output.json().flatten_event(true)
            }
        }
    };

    tracing_subscriber::registry().with(filter).with(output).try_init()?;

    Ok(())
}

fn filter(directive: Option<&str>) -> eyre::Result<EnvFilter> {
    let directive = match directive.map(str::trim) {
        Some(d) if !d.is_empty() => d,
        _ => DEFAULT_DIRECTIVE,
    };

    Ok(EnvFilter::try_new(directive)?)
}
