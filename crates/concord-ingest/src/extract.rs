//! Extraction strategy chain
//!
//! Strategies are tried in priority order: the external service first when a
//! credential is configured, the deterministic pattern set as the terminal
//! fallback. A strategy failure (transport, timeout, malformed response) is
//! never surfaced to the caller; the chain logs it and moves on. A strategy
//! reporting waste is double-checked by the remaining strategies before the
//! record is written off, since the service occasionally misses content the
//! patterns can still recover.
//!
//! The chain's outcome is always a tagged [`Extraction`], never an error:
//! a validated [`Signal`], a [`Waste`] artifact, or a [`Rejection`] when a
//! strategy found numeric content the normalizer refused.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use concord_core::{ExtractionMethod, Signal, SignalMeta, Waste};

use crate::pattern::PatternStrategy;
use crate::sanitize::sanitize;
use crate::schema::{self, RawFields, SchemaViolation};
use crate::service::{ServiceConfig, ServiceStrategy};

/// Failures internal to a single strategy.
///
/// These never leave the extractor; each one means "try the next strategy".
#[derive(Error, Debug)]
pub enum StrategyError {
    /// The strategy is missing something it needs to run at all.
    #[error("strategy not configured: missing {0}")]
    NotConfigured(&'static str),

    /// The service call did not complete in time.
    #[error("service call timed out after {0} ms")]
    Timeout(u64),

    /// The service answered with something that is not a candidate record.
    #[error("malformed service response: {0}")]
    Malformed(String),

    /// The service could not be reached.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
}

/// What one strategy found in the sanitized text.
#[derive(Debug, Clone)]
pub enum Candidate {
    /// Fields already normalized onto signal ranges.
    Fields(RawFields),
    /// A structured response still subject to synonym resolution.
    Structured(Value),
    /// The strategy found no numeric content.
    Waste,
}

/// One way of turning sanitized text into candidate fields.
///
/// Implementations stay stateless; the extractor owns ordering and fallback.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Provenance tag stamped on records this strategy produced.
    fn method(&self) -> ExtractionMethod;

    async fn draw(&self, text: &str) -> Result<Candidate, StrategyError>;
}

/// A record the normalizer refused, with the provenance of the strategy that
/// produced the offending fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub violation: SchemaViolation,
    pub meta: SignalMeta,
}

/// Outcome of running the full pipeline over one report.
///
/// All three arms are ordinary values; per the ingest boundary contract none
/// of them is raised as an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// A validated signal, safe for the audit graph.
    Signal(Signal),
    /// No discernible numeric content; excluded from audit.
    Waste(Waste),
    /// Numeric content was found but could not be coerced into a signal.
    Rejected(Rejection),
}

impl Extraction {
    pub fn is_signal(&self) -> bool {
        matches!(self, Self::Signal(_))
    }

    pub fn is_waste(&self) -> bool {
        matches!(self, Self::Waste(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    pub fn into_signal(self) -> Option<Signal> {
        match self {
            Self::Signal(signal) => Some(signal),
            _ => None,
        }
    }

    /// Provenance of whichever strategy settled the record.
    pub fn meta(&self) -> &SignalMeta {
        match self {
            Self::Signal(signal) => &signal.meta,
            Self::Waste(waste) => &waste.meta,
            Self::Rejected(rejection) => &rejection.meta,
        }
    }
}

/// Priority-ordered extraction chain.
#[derive(Default)]
pub struct Extractor {
    strategies: Vec<Arc<dyn ExtractionStrategy>>,
}

impl Extractor {
    /// An empty chain; every input becomes waste until strategies are added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pattern extraction only. This is the chain used when no service
    /// credential is available.
    pub fn fallback_only() -> Self {
        Self::new().with_strategy(PatternStrategy::new())
    }

    /// Service extraction (when configured) with pattern fallback.
    ///
    /// An absent credential is not an error; the chain silently runs
    /// fallback-only, per the service contract.
    pub fn from_env() -> Self {
        Self::with_service_config(ServiceConfig::from_env())
    }

    /// Like [`Extractor::from_env`] with explicit service settings.
    pub fn with_service_config(config: ServiceConfig) -> Self {
        let mut extractor = Self::new();
        if config.is_configured() {
            match ServiceStrategy::new(config) {
                Ok(service) => extractor.push_strategy(service),
                Err(err) => {
                    warn!(error = %err, "service strategy unavailable, running fallback-only")
                }
            }
        } else {
            debug!("no extraction credential, running fallback-only");
        }
        extractor.with_strategy(PatternStrategy::new())
    }

    /// Append a strategy at the lowest priority so far.
    pub fn with_strategy<S: ExtractionStrategy + 'static>(mut self, strategy: S) -> Self {
        self.push_strategy(strategy);
        self
    }

    pub fn push_strategy<S: ExtractionStrategy + 'static>(&mut self, strategy: S) {
        self.strategies.push(Arc::new(strategy));
    }

    /// Strategy names in priority order.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Run the chain over one raw report.
    ///
    /// A validated non-zero signal from any strategy wins immediately. A
    /// record whose fields validate to all zeroes is waste, not a signal.
    /// Across strategies the outcome precedence is signal, then rejection,
    /// then waste.
    pub async fn extract(&self, raw_text: &str, source_label: &str) -> Extraction {
        let clean = sanitize(raw_text);
        let mut rejection: Option<Rejection> = None;
        let mut waste_method = self
            .strategies
            .last()
            .map(|s| s.method())
            .unwrap_or(ExtractionMethod::Manual);

        for strategy in &self.strategies {
            debug!(strategy = strategy.name(), "drawing candidate fields");
            let candidate = match strategy.draw(&clean).await {
                Ok(candidate) => candidate,
                Err(err) => {
                    warn!(strategy = strategy.name(), error = %err, "strategy failed, falling back");
                    continue;
                }
            };

            let validated = match candidate {
                Candidate::Waste => {
                    debug!(strategy = strategy.name(), "strategy reported waste");
                    waste_method = strategy.method();
                    continue;
                }
                Candidate::Fields(fields) => schema::validate_fields(fields),
                Candidate::Structured(value) => schema::validate_value(&value),
            };

            match validated {
                Ok(vector) if vector.is_zero() => {
                    debug!(strategy = strategy.name(), "all fields zero, classifying as waste");
                    waste_method = strategy.method();
                }
                Ok(vector) => {
                    debug!(
                        strategy = strategy.name(),
                        alpha = vector.alpha,
                        "signal extracted"
                    );
                    let meta = SignalMeta::now(source_label, strategy.method());
                    return Extraction::Signal(Signal::from_vector(vector, meta));
                }
                Err(violation) => {
                    warn!(strategy = strategy.name(), %violation, "candidate rejected by schema");
                    rejection.get_or_insert_with(|| Rejection {
                        violation,
                        meta: SignalMeta::now(source_label, strategy.method()),
                    });
                }
            }
        }

        match rejection {
            Some(rejection) => Extraction::Rejected(rejection),
            None => Extraction::Waste(Waste::new(SignalMeta::now(source_label, waste_method))),
        }
    }
}

impl fmt::Debug for Extractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extractor")
            .field("strategies", &self.strategy_names())
            .finish()
    }
}
