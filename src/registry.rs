use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    address::Address,
    config::{FeeRecipient, GameConfig},
    error::GameError,
    events::GameEvent,
    ledger::{LedgerMutation, LedgerState},
};

/// Addresses that paid the one-time verification fee. Flags are never cleared.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct VerificationRegistry {
    verified: BTreeSet<Address>,
}

impl VerificationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with root pre-verified.
    pub fn with_root(root: Address) -> Self {
        let mut registry = Self::new();
        registry.verified.insert(root);
        registry
    }

    pub fn is_verified(&self, account: &Address) -> bool {
        self.verified.contains(account)
    }

    pub fn verified_count(&self) -> usize {
        self.verified.len()
    }

    /// Pulls the fee from `caller` (against its approval of the engine) and marks it verified.
    pub fn verify(
        &mut self,
        ledger: &mut LedgerState,
        config: &GameConfig,
        caller: Address,
    ) -> Result<GameEvent, GameError> {
        if self.is_verified(&caller) {
            return Err(GameError::AlreadyVerified);
        }
        let fee_to = match config.fee_recipient {
            FeeRecipient::Engine => config.engine,
            FeeRecipient::Root => config.root,
        };
        ledger.apply_mutations(&[LedgerMutation::TransferFrom {
            spender: config.engine,
            from: caller,
            to: fee_to,
            amount: config.verification_fee,
            memo: Some("verification fee".into()),
        }])?;
        self.verified.insert(caller);
        info!(user = %caller, fee = config.verification_fee, to = %fee_to, "user verified");
        Ok(GameEvent::UserVerification { user: caller })
    }
}
