//! Delivery channels
//!
//! A channel carries one corrective instruction to its target and reports the
//! attempt honestly; the dispatcher owns all retry state. Channels may drop
//! messages, so a single failed delivery says nothing final about the target.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::dispatcher::CorrectiveInstruction;

const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// One failed delivery attempt.
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// The target could not be reached at all.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The target answered and refused the instruction.
    #[error("instruction rejected with status {0}")]
    Rejected(u16),
}

impl DeliveryError {
    /// True when retrying cannot help: the target understood the instruction
    /// and refused it.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Rejected(status) if (400..500).contains(status))
    }
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// A way of carrying an instruction to its target.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, instruction: &CorrectiveInstruction) -> Result<(), DeliveryError>;
}

/// HTTP delivery: the instruction is POSTed to the target's endpoint.
pub struct HttpChannel {
    client: reqwest::Client,
    base_url: String,
}

impl HttpChannel {
    pub fn new(base_url: impl Into<String>) -> Result<Self, DeliveryError> {
        Self::with_timeout_ms(base_url, DEFAULT_TIMEOUT_MS)
    }

    pub fn with_timeout_ms(
        base_url: impl Into<String>,
        timeout_ms: u64,
    ) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl DeliveryChannel for HttpChannel {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn deliver(&self, instruction: &CorrectiveInstruction) -> Result<(), DeliveryError> {
        let url = format!(
            "{}/v1/instructions/{}",
            self.base_url.trim_end_matches('/'),
            instruction.target
        );

        debug!(url = %url, instruction = %instruction.id, "delivering instruction");
        let response = self.client.post(&url).json(instruction).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Rejected(status.as_u16()))
        }
    }
}
