//! Time-boxed handoff channel read.
//!
//! The host writes one JSON payload to our stdin and closes it. The read
//! goes through these states:
//!
//! ```text
//! disabled ──────────────────────────────▶ NoData(Disabled)
//! awaiting ──deadline first──────────────▶ NoData(Failed(ChannelTimeout))
//!          ──I/O error───────────────────▶ NoData(Failed(ChannelIo))
//!          ──end of input──▶ complete ──▶ Payload(value)
//!                                     ──▶ NoData(Empty)
//!                                     ──▶ NoData(Failed(ChannelParse))
//! ```
//!
//! The deadline and the read are raced with [`tokio::time::timeout`]:
//! whichever settles first wins and the other future is dropped, so no
//! timer outlives the read.

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::ChannelConfig;
use crate::error::BridgeError;

/// Why a channel read produced no payload.
#[derive(Debug)]
pub enum NoDataReason {
    /// `CLAUDE_USE_STDIN` was not `"true"`.
    Disabled,
    /// End of input arrived with nothing but whitespace.
    Empty,
    /// Timeout, I/O failure, or unparseable JSON.
    Failed(BridgeError),
}

/// Terminal outcome of a channel read. Reads never fail past this type.
#[derive(Debug)]
pub enum ChannelOutcome {
    Payload(Value),
    NoData(NoDataReason),
}

impl ChannelOutcome {
    pub fn into_payload(self) -> Option<Value> {
        match self {
            ChannelOutcome::Payload(value) => Some(value),
            ChannelOutcome::NoData(_) => None,
        }
    }
}

/// Read one payload from `reader`, bounded by `config.timeout()`.
///
/// When the channel is disabled `reader` is never polled.
pub async fn read_channel<R>(mut reader: R, config: &ChannelConfig) -> ChannelOutcome
where
    R: AsyncRead + Unpin,
{
    if !config.enabled {
        tracing::debug!("channel read disabled");
        return ChannelOutcome::NoData(NoDataReason::Disabled);
    }

    let mut buf = Vec::new();
    let outcome = match tokio::time::timeout(config.timeout(), reader.read_to_end(&mut buf)).await
    {
        Err(_elapsed) => ChannelOutcome::NoData(NoDataReason::Failed(BridgeError::ChannelTimeout)),
        Ok(Err(e)) => {
            ChannelOutcome::NoData(NoDataReason::Failed(BridgeError::ChannelIo(e.to_string())))
        }
        Ok(Ok(_)) => parse_payload(&buf),
    };

    match &outcome {
        ChannelOutcome::NoData(NoDataReason::Failed(err)) => {
            tracing::warn!(timeout_ms = config.timeout_ms, "{}", err)
        }
        ChannelOutcome::NoData(NoDataReason::Empty) => tracing::debug!("channel was empty"),
        ChannelOutcome::Payload(_) => tracing::debug!(bytes = buf.len(), "channel payload read"),
        ChannelOutcome::NoData(NoDataReason::Disabled) => {}
    }
    outcome
}

/// Read the channel from the process's stdin.
pub async fn read_stdin(config: &ChannelConfig) -> ChannelOutcome {
    read_channel(tokio::io::stdin(), config).await
}

fn parse_payload(bytes: &[u8]) -> ChannelOutcome {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return ChannelOutcome::NoData(NoDataReason::Empty);
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(value) => ChannelOutcome::Payload(value),
        Err(e) => ChannelOutcome::NoData(NoDataReason::Failed(BridgeError::ChannelParse(
            e.to_string(),
        ))),
    }
}
