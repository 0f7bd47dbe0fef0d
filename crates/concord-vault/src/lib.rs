//! # Concord Vault
//!
//! Epoch-based quorum vault: a rotating basis shared across three custody
//! regions, re-keyed on every epoch shift and gated on a 2-of-3 quorum. The
//! audit engine consumes the basis through the [`concord_core::BasisSource`]
//! seam; when quorum is lost the vault stops producing a basis and audits
//! fail closed.
//!
//! Explicitly non-cryptographic: basis and shares regenerate deterministically
//! from `(master_salt, epoch_id)`, so anyone holding the salt can reproduce
//! every epoch. The shares implement the quorum bookkeeping, not secrecy.
//! Forward secrecy here means only that no share survives its epoch.

pub mod region;
pub mod vault;

pub use region::{Region, Share};
pub use vault::{EpochVault, VaultError, QUORUM, VAULT_SALT_ENV};
