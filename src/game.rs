use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::{
    address::Address,
    config::GameConfig,
    engine::{TableEngine, TableInfo},
    error::GameError,
    events::GameEvent,
    ledger::{Amount, Asset, LedgerError, LedgerSnapshot, LedgerState},
    registry::VerificationRegistry,
};

/// Outcome of one successful state-changing call.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallReceipt {
    pub height: u64,
    pub caller: Address,
    pub events: Vec<GameEvent>,
    #[serde(with = "hex_digest")]
    pub digest: [u8; 32],
}

/// Read-only projection of a participant.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantInfo {
    pub address: Address,
    pub verified: bool,
    pub current_table: usize,
    pub referrer: Option<Address>,
    pub has_received_donation_bonus: bool,
}

/// The deployed game: configuration, host ledger, verification registry and table engine.
///
/// Every state-changing call either commits all of its effects and returns a
/// receipt, or fails and leaves the game as it was.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Game {
    config: GameConfig,
    ledger: LedgerState,
    registry: VerificationRegistry,
    engine: TableEngine,
    receipts: Vec<CallReceipt>,
}

impl Game {
    pub fn new(config: GameConfig) -> Result<Self, GameError> {
        config.validate()?;
        Ok(Self {
            ledger: LedgerState::new(),
            registry: VerificationRegistry::with_root(config.root),
            engine: TableEngine::new(&config),
            receipts: Vec::new(),
            config,
        })
    }

    pub fn load(path: &Path) -> Result<Self, GameError> {
        let bytes = fs::read(path)?;
        let game: Game = serde_json::from_slice(&bytes)?;
        game.config.validate()?;
        Ok(game)
    }

    pub fn save(&self, path: &Path) -> Result<(), GameError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn ledger(&self) -> &LedgerState {
        &self.ledger
    }

    pub fn receipts(&self) -> &[CallReceipt] {
        &self.receipts
    }

    // ---- host-side helpers (token faucet, approvals, recipient behaviour) ----

    pub fn mint(&mut self, to: Address, asset: Asset, amount: Amount) -> Result<(), LedgerError> {
        self.ledger.mint(to, asset, amount)
    }

    /// Stable-token approval of the engine by `owner`.
    pub fn approve(&mut self, owner: Address, amount: Amount) {
        self.ledger.approve(owner, self.config.engine, amount);
    }

    pub fn set_rejects_native(&mut self, account: Address, rejects: bool) {
        self.ledger.set_rejects_native(account, rejects);
    }

    // ---- state-changing calls ----

    pub fn verify(&mut self, caller: Address) -> Result<CallReceipt, GameError> {
        self.transact(caller, |game| {
            let event = game
                .registry
                .verify(&mut game.ledger, &game.config, caller)?;
            Ok(vec![event])
        })
    }

    pub fn buy(
        &mut self,
        caller: Address,
        referrer: Address,
        amount: Amount,
    ) -> Result<CallReceipt, GameError> {
        self.transact(caller, |game| {
            game.engine.buy(
                &mut game.ledger,
                &game.registry,
                &game.config,
                caller,
                referrer,
                amount,
            )
        })
    }

    /// Plain value transfer to the engine address.
    pub fn send(&mut self, caller: Address, amount: Amount) -> Result<CallReceipt, GameError> {
        self.transact(caller, |game| {
            game.engine
                .receive_direct(&mut game.ledger, &game.registry, &game.config, caller, amount)
        })
    }

    /// Registry and engine fail before touching any state, and the ledger
    /// applies a batch all-or-nothing, so an error here leaves the game as it was.
    fn transact<F>(&mut self, caller: Address, call: F) -> Result<CallReceipt, GameError>
    where
        F: FnOnce(&mut Game) -> Result<Vec<GameEvent>, GameError>,
    {
        match call(self) {
            Ok(events) => Ok(self.seal(caller, events)),
            Err(err) => {
                warn!(caller = %caller, reason = err.reason(), error = %err, "call reverted");
                Err(err)
            }
        }
    }

    fn seal(&mut self, caller: Address, events: Vec<GameEvent>) -> CallReceipt {
        let height = self.ledger.meta.height + 1;
        let mut hasher = Sha256::new();
        hasher.update(self.ledger.meta.previous_receipt.unwrap_or([0u8; 32]));
        hasher.update(height.to_le_bytes());
        hasher.update(caller.as_bytes());
        hasher.update((events.len() as u64).to_le_bytes());
        for event in &events {
            hasher.update(event.commitment());
        }
        let digest: [u8; 32] = hasher.finalize().into();

        self.ledger.seal(digest);
        let receipt = CallReceipt {
            height,
            caller,
            events,
            digest,
        };
        self.receipts.push(receipt.clone());
        receipt
    }

    // ---- read-only queries ----

    pub fn is_verified(&self, account: &Address) -> bool {
        self.registry.is_verified(account)
    }

    pub fn get_tables_count(&self) -> usize {
        self.engine.tables_count()
    }

    pub fn get_table_threshold(&self, table: usize) -> Result<Amount, GameError> {
        self.engine.table_threshold(table)
    }

    pub fn get_table_addresses_count(&self, table: usize) -> Result<usize, GameError> {
        self.engine.table_addresses_count(table)
    }

    pub fn info(&self, account: &Address) -> ParticipantInfo {
        let participant = self.engine.participant(account).cloned().unwrap_or_default();
        ParticipantInfo {
            address: *account,
            verified: self.registry.is_verified(account),
            current_table: participant.current_table,
            referrer: participant.referrer,
            has_received_donation_bonus: participant.has_received_donation_bonus,
        }
    }

    pub fn info_table(&self, table: usize, account: &Address) -> Result<TableInfo, GameError> {
        self.engine.info_table(table, account)
    }

    pub fn root_address(&self) -> Address {
        self.config.root
    }

    pub fn charity_address(&self) -> Address {
        self.config.charity
    }

    pub fn stable_token(&self) -> Address {
        self.config.stable_token
    }

    pub fn engine_address(&self) -> Address {
        self.config.engine
    }

    pub fn verification_cost(&self) -> Amount {
        self.config.verification_fee
    }

    /// Native balance held by the engine.
    pub fn retained_pool(&self) -> Amount {
        self.ledger.native_balance(&self.config.engine)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.ledger.snapshot()
    }
}

mod hex_digest {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let bytes = hex::decode(&encoded).map_err(D::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| D::Error::custom("digest must be 32 bytes"))
    }
}
