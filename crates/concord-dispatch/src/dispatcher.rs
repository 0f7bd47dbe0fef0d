//! Bounded-retry dispatch
//!
//! The dispatcher drives one instruction through its channel under a
//! [`RetryPolicy`]. Exhausted retries are a soft failure: the instruction
//! comes back [`DispatchOutcome::Blocked`] and the caller accounts it as
//! accumulating systemic waste. Nothing here raises an error past the
//! dispatch boundary; a refusal the channel marks permanent merely ends the
//! loop early.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, warn};
use uuid::Uuid;

use concord_core::RepairAction;

use crate::channel::{DeliveryChannel, DeliveryError};
use crate::retry::RetryPolicy;

/// One corrective action addressed to one participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectiveInstruction {
    pub id: Uuid,
    pub target: String,
    pub action: RepairAction,
    pub issued_at: DateTime<Utc>,
}

impl CorrectiveInstruction {
    pub fn new(target: impl Into<String>, action: RepairAction) -> Self {
        Self {
            id: Uuid::new_v4(),
            target: target.into(),
            action,
            issued_at: Utc::now(),
        }
    }
}

/// Terminal state of one dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// The channel accepted the instruction.
    Delivered { attempts: u32 },
    /// Retries exhausted, refusal marked permanent, or deadline expired.
    Blocked { reason: String },
}

impl DispatchOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

/// Retrying dispatcher over an injected delivery channel.
pub struct Dispatcher {
    channel: Arc<dyn DeliveryChannel>,
    policy: RetryPolicy,
}

impl Dispatcher {
    pub fn new(channel: Arc<dyn DeliveryChannel>) -> Self {
        Self {
            channel,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Deliver one instruction, retrying with backoff.
    ///
    /// Never returns an error; a dispatch that cannot complete yields
    /// [`DispatchOutcome::Blocked`] with the last failure as its reason.
    pub async fn dispatch(&self, instruction: &CorrectiveInstruction) -> DispatchOutcome {
        let mut last_error: Option<DeliveryError> = None;

        for attempt in 1..=self.policy.max_attempts.max(1) {
            if attempt > 1 {
                let backoff = self.policy.backoff_after(attempt - 1);
                debug!(
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    "backing off before retry"
                );
                sleep(backoff).await;
            }

            match self.channel.deliver(instruction).await {
                Ok(()) => {
                    debug!(
                        instruction = %instruction.id,
                        target = %instruction.target,
                        attempts = attempt,
                        "instruction delivered"
                    );
                    return DispatchOutcome::Delivered { attempts: attempt };
                }
                Err(err) => {
                    warn!(
                        instruction = %instruction.id,
                        attempt,
                        error = %err,
                        "delivery attempt failed"
                    );
                    let permanent = err.is_permanent();
                    last_error = Some(err);
                    if permanent {
                        break;
                    }
                }
            }
        }

        let reason = last_error
            .map(|err| err.to_string())
            .unwrap_or_else(|| "no delivery attempt was made".to_string());
        warn!(
            instruction = %instruction.id,
            target = %instruction.target,
            reason = %reason,
            "instruction blocked"
        );
        DispatchOutcome::Blocked { reason }
    }

    /// [`Dispatcher::dispatch`] under an overall deadline.
    ///
    /// Expiry cancels the remaining retries and maps to
    /// [`DispatchOutcome::Blocked`], not an error.
    pub async fn dispatch_with_deadline(
        &self,
        instruction: &CorrectiveInstruction,
        deadline: Duration,
    ) -> DispatchOutcome {
        match tokio::time::timeout(deadline, self.dispatch(instruction)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    instruction = %instruction.id,
                    deadline_ms = deadline.as_millis() as u64,
                    "dispatch deadline expired"
                );
                DispatchOutcome::Blocked {
                    reason: format!("deadline of {} ms expired", deadline.as_millis()),
                }
            }
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("channel", &self.channel.name())
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` deliveries, then succeeds.
    struct FlakyChannel {
        failures: u32,
        calls: AtomicU32,
        permanent: bool,
    }

    impl FlakyChannel {
        fn failing(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                permanent: false,
            }
        }

        fn refusing() -> Self {
            Self {
                failures: u32::MAX,
                calls: AtomicU32::new(0),
                permanent: true,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DeliveryChannel for FlakyChannel {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn deliver(
            &self,
            _instruction: &CorrectiveInstruction,
        ) -> Result<(), DeliveryError> {
            let seen = self.calls.fetch_add(1, Ordering::SeqCst);
            if seen < self.failures {
                if self.permanent {
                    Err(DeliveryError::Rejected(422))
                } else {
                    Err(DeliveryError::Transport("dropped".into()))
                }
            } else {
                Ok(())
            }
        }
    }

    fn instruction() -> CorrectiveInstruction {
        CorrectiveInstruction::new(
            "DRIVER",
            RepairAction::SupplementalShipment { units: 3.0 },
        )
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::default()
            .with_initial_backoff_ms(1)
            .with_max_backoff_ms(5)
    }

    #[test]
    fn clean_channel_delivers_on_the_first_attempt() {
        let channel = Arc::new(FlakyChannel::failing(0));
        let dispatcher = Dispatcher::new(channel.clone());

        let outcome = tokio_test::block_on(dispatcher.dispatch(&instruction()));
        assert_eq!(outcome, DispatchOutcome::Delivered { attempts: 1 });
        assert_eq!(channel.calls(), 1);
    }

    #[tokio::test]
    async fn retries_until_the_channel_recovers() {
        let channel = Arc::new(FlakyChannel::failing(2));
        let dispatcher = Dispatcher::new(channel.clone()).with_policy(fast_policy());

        let outcome = dispatcher.dispatch(&instruction()).await;
        assert_eq!(outcome, DispatchOutcome::Delivered { attempts: 3 });
        assert_eq!(channel.calls(), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_block_softly() {
        let channel = Arc::new(FlakyChannel::failing(u32::MAX));
        let dispatcher = Dispatcher::new(channel.clone()).with_policy(fast_policy());

        let outcome = dispatcher.dispatch(&instruction()).await;
        match outcome {
            DispatchOutcome::Blocked { reason } => assert!(reason.contains("dropped")),
            other => panic!("expected blocked, got {other:?}"),
        }
        assert_eq!(channel.calls(), 3);
    }

    #[tokio::test]
    async fn permanent_refusal_skips_the_remaining_retries() {
        let channel = Arc::new(FlakyChannel::refusing());
        let dispatcher = Dispatcher::new(channel.clone()).with_policy(fast_policy());

        let outcome = dispatcher.dispatch(&instruction()).await;
        assert!(!outcome.is_delivered());
        assert_eq!(channel.calls(), 1);
    }

    #[tokio::test]
    async fn deadline_expiry_blocks_instead_of_erroring() {
        let channel = Arc::new(FlakyChannel::failing(u32::MAX));
        let dispatcher = Dispatcher::new(channel).with_policy(
            RetryPolicy::default()
                .with_max_attempts(100)
                .with_initial_backoff_ms(20),
        );

        let outcome = dispatcher
            .dispatch_with_deadline(&instruction(), Duration::from_millis(30))
            .await;
        match outcome {
            DispatchOutcome::Blocked { reason } => assert!(reason.contains("deadline")),
            other => panic!("expected blocked, got {other:?}"),
        }
    }

    #[test]
    fn instruction_envelope_serializes_with_action_kind() {
        let json = serde_json::to_value(instruction()).unwrap();
        assert_eq!(json["target"], "DRIVER");
        assert_eq!(json["action"]["kind"], "supplemental_shipment");
        assert_eq!(json["action"]["units"], 3.0);
        assert!(json["id"].is_string());
    }

    #[test]
    fn outcome_serializes_with_a_tag() {
        let json = serde_json::to_value(DispatchOutcome::Delivered { attempts: 2 }).unwrap();
        assert_eq!(json["outcome"], "delivered");
        assert_eq!(json["attempts"], 2);
    }
}
