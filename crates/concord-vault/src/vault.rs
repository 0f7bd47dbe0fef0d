//! Epoch vault state machine
//!
//! Owns the epoch counter, the active-region set and the per-epoch shares,
//! all behind one mutex so heartbeat failures, shifts and basis reads are
//! serialized. Concurrent failure reports cannot double-shift an epoch: the
//! whole transition runs inside a single critical section.
//!
//! Everything the vault produces is derived from `(master_salt, epoch_id)`
//! with SHA-256, so a holder of the salt can reproduce any epoch. That makes
//! the scheme bookkeeping for the quorum rule rather than cryptography; see
//! the crate docs.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};

use concord_core::{BasisSource, SignalVector};

use crate::region::{Region, Share};

/// Minimum active regions for the vault to operate.
pub const QUORUM: usize = 2;

/// Environment variable supplying the master salt for [`EpochVault::from_env`].
pub const VAULT_SALT_ENV: &str = "CONCORD_VAULT_SALT";

const SECRET_MODULUS: u64 = 10_000_000_000;
const SLOPE_MODULUS: u64 = 100_000;

/// Vault failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// Below the 2-of-3 threshold. The single fatal condition in the system:
    /// dependent operations must halt rather than proceed unverified.
    #[error("insufficient quorum: {active} active regions, need {required}")]
    InsufficientQuorum { active: usize, required: usize },

    /// The vault could not be constructed from its configuration.
    #[error("vault configuration error: {0}")]
    Configuration(String),
}

impl VaultError {
    fn insufficient(active: usize) -> Self {
        Self::InsufficientQuorum {
            active,
            required: QUORUM,
        }
    }

    /// True for the fail-closed condition that must stop the pipeline.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InsufficientQuorum { .. })
    }
}

#[derive(Debug)]
struct VaultState {
    epoch_id: u64,
    active: BTreeSet<Region>,
    shares: BTreeMap<Region, Share>,
}

/// Quorum-gated epoch vault.
///
/// Starts at epoch 1 with all three regions active and shares already
/// distributed. Shares are wholly discarded and regenerated on every epoch
/// shift; no share survives its epoch.
pub struct EpochVault {
    master_salt: String,
    state: Mutex<VaultState>,
}

impl EpochVault {
    pub fn new(master_salt: impl Into<String>) -> Self {
        let master_salt = master_salt.into();
        let active: BTreeSet<Region> = Region::ALL.into_iter().collect();
        let shares = compute_shares(&master_salt, 1, &active);
        Self {
            master_salt,
            state: Mutex::new(VaultState {
                epoch_id: 1,
                active,
                shares,
            }),
        }
    }

    /// Construct from [`VAULT_SALT_ENV`]. A missing or empty salt is a
    /// configuration error, not a quorum condition.
    pub fn from_env() -> Result<Self, VaultError> {
        match std::env::var(VAULT_SALT_ENV) {
            Ok(salt) if !salt.is_empty() => Ok(Self::new(salt)),
            _ => Err(VaultError::Configuration(format!(
                "{VAULT_SALT_ENV} is not set"
            ))),
        }
    }

    pub fn epoch_id(&self) -> u64 {
        self.state().epoch_id
    }

    pub fn active_regions(&self) -> Vec<Region> {
        self.state().active.iter().copied().collect()
    }

    /// Current epoch's share map. Diagnostic view; see [`Share`].
    pub fn shares(&self) -> BTreeMap<Region, Share> {
        self.state().shares.clone()
    }

    /// True while at least [`QUORUM`] regions are active.
    pub fn is_operable(&self) -> bool {
        self.state().active.len() >= QUORUM
    }

    /// Health pulse. `failing = None` reports all regions healthy and changes
    /// nothing. Reporting an active region as failing removes it and re-keys
    /// the epoch; reporting an already-inactive region is a no-op.
    pub fn heartbeat(&self, failing: Option<Region>) -> Result<(), VaultError> {
        let mut state = self.state();
        let region = match failing {
            Some(region) => region,
            None => {
                debug!(epoch = state.epoch_id, "heartbeat clean");
                return Ok(());
            }
        };

        if !state.active.remove(&region) {
            debug!(%region, "failure reported for inactive region, ignoring");
            return Ok(());
        }

        warn!(%region, remaining = state.active.len(), "region failed, re-keying epoch");
        self.shift_locked(&mut state).map(|_| ())
    }

    /// Advance to the next epoch, discarding all shares and distributing
    /// fresh ones to the active regions. Returns the new epoch id.
    ///
    /// Below quorum this fails without touching the epoch id or the shares.
    pub fn shift(&self) -> Result<u64, VaultError> {
        let mut state = self.state();
        self.shift_locked(&mut state)
    }

    fn shift_locked(&self, state: &mut VaultState) -> Result<u64, VaultError> {
        if state.active.len() < QUORUM {
            warn!(
                active = state.active.len(),
                required = QUORUM,
                fingerprint = %fingerprint_for(&self.master_salt, state.epoch_id),
                "shift refused below quorum"
            );
            return Err(VaultError::insufficient(state.active.len()));
        }

        state.epoch_id += 1;
        state.shares = compute_shares(&self.master_salt, state.epoch_id, &state.active);
        info!(
            epoch = state.epoch_id,
            fingerprint = %fingerprint_for(&self.master_salt, state.epoch_id),
            shares = state.shares.len(),
            "epoch shifted"
        );
        Ok(state.epoch_id)
    }

    /// Deterministic 4-component perturbation basis for the current epoch, or
    /// `None` below quorum.
    pub fn synthesize_basis(&self) -> Option<SignalVector> {
        let state = self.state();
        if state.active.len() < QUORUM {
            return None;
        }
        Some(synthesize(&self.master_salt, state.epoch_id))
    }

    /// Short hex tag identifying the current `(salt, epoch)` pair in logs
    /// without disclosing either.
    pub fn fingerprint(&self) -> String {
        fingerprint_for(&self.master_salt, self.state().epoch_id)
    }

    fn state(&self) -> MutexGuard<'_, VaultState> {
        self.state.lock().expect("vault state mutex poisoned")
    }
}

impl BasisSource for EpochVault {
    fn current_basis(&self) -> Option<SignalVector> {
        self.synthesize_basis()
    }
}

impl fmt::Debug for EpochVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("EpochVault")
            .field("epoch_id", &state.epoch_id)
            .field("active", &state.active)
            .finish()
    }
}

fn derive_u64(salt: &str, epoch: u64, label: &str) -> u64 {
    let digest = Sha256::digest(format!("{salt}_EPOCH_{epoch}_{label}").as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

fn basis_coefficients(salt: &str, epoch: u64) -> (u64, u64) {
    let secret = derive_u64(salt, epoch, "secret") % SECRET_MODULUS;
    let slope = derive_u64(salt, epoch, "slope") % SLOPE_MODULUS;
    (secret, slope)
}

fn compute_shares(salt: &str, epoch: u64, active: &BTreeSet<Region>) -> BTreeMap<Region, Share> {
    let (secret, slope) = basis_coefficients(salt, epoch);
    active
        .iter()
        .map(|region| {
            let index = region.index();
            let share = Share {
                index,
                value: secret + slope * index,
            };
            (*region, share)
        })
        .collect()
}

fn synthesize(salt: &str, epoch: u64) -> SignalVector {
    let mut rng = StdRng::seed_from_u64(derive_u64(salt, epoch, "basis"));
    SignalVector::new(
        1.0,
        rng.gen_range(-0.5..0.5),
        rng.gen_range(-0.1..0.1),
        rng.gen_range(-0.05..0.05),
    )
}

fn fingerprint_for(salt: &str, epoch: u64) -> String {
    let digest = Sha256::digest(format!("{salt}_EPOCH_{epoch}").as_bytes());
    hex::encode(&digest[..6])
}
