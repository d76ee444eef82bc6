//! Collaborators the binary runs with when nothing better is plugged in.

use std::collections::HashSet;

use runtime::{
    Authorizer,
    BoxError,
    DecodeFailure,
    EventSink,
    Record,
};

/// Accepts terminals from a fixed list, or every terminal if the list is empty.
#[derive(Clone, Debug, Default)]
pub struct StaticAuthorizer {
    allowed: HashSet<String>,
}

impl StaticAuthorizer {
    pub fn new(allowed: impl IntoIterator<Item = String>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }
}

#[async_trait::async_trait]
impl Authorizer for StaticAuthorizer {
    async fn is_authorized(
        &self,
        terminal_id: &str,
        _model: &str,
        _hardware_id: &str,
        _vin: Option<&str>,
    ) -> Result<bool, BoxError> {
        Ok(self.allowed.is_empty() || self.allowed.contains(terminal_id))
    }
}

/// Writes every record into the log as JSON.
#[derive(Copy, Clone, Debug, Default)]
pub struct TracingSink;

#[async_trait::async_trait]
impl EventSink for TracingSink {
    async fn record(&self, record: &Record) -> Result<(), BoxError> {
        let json = serde_json::to_string(record)?;

        tracing::info!(
            terminal_id = %record.terminal_id,
            kind = record.event.name(),
            record = %json,
            "record"
        );

        Ok(())
    }

    async fn vin_extracted(&self, terminal_id: &str, vin: &str) -> Result<(), BoxError> {
        tracing::info!(%terminal_id, %vin, "vin extracted");

        Ok(())
    }

    async fn decode_failed(&self, failure: &DecodeFailure) -> Result<(), BoxError> {
        let json = serde_json::to_string(failure)?;

        tracing::warn!(terminal_id = %failure.terminal_id, failure = %json, "decode failure");

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    async fn allowed(auth: &StaticAuthorizer, terminal_id: &str) -> bool {
        auth.is_authorized(terminal_id, "M", "HW", None).await.unwrap()
    }

    #[tokio::test]
    async fn test_empty_allowlist_accepts_all() {
        assert!(allowed(&StaticAuthorizer::default(), "000000012345").await);
    }

    #[tokio::test]
    async fn test_allowlist() {
        let auth = StaticAuthorizer::new(["000000012345".to_string()]);

        assert!(allowed(&auth, "000000012345").await);
        assert!(!allowed(&auth, "000000099999").await);
    }

    #[tokio::test]
    async fn test_tracing_sink_serializes() -> eyre::Result<()> {
        let header = message::Header::new(0x0002, 0, "000000012345", 9)?;
        let record = Record::new(
            chrono::Utc::now(),
            "127.0.0.1:9000".parse()?,
            &header,
            message::Event::Heartbeat,
            &[0x00, 0x02],
        );

        TracingSink.record(&record).await.map_err(|e| eyre::eyre!("{}", e))?;

        Ok(())
    }
}
