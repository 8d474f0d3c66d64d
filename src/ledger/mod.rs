use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::address::Address;

pub type Amount = u128;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Asset {
    /// The host currency contributions are paid in.
    Native,
    /// The stable token verification fees are paid in.
    Stable,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("insufficient native balance in account {account}")]
    InsufficientNative { account: Address },
    #[error("insufficient stable-token balance in account {account}")]
    InsufficientStable { account: Address },
    #[error("allowance of {spender} over {owner} is too low")]
    InsufficientAllowance { owner: Address, spender: Address },
    #[error("account {account} rejects native transfers")]
    RejectsNative { account: Address },
    #[error("balance overflow in account {account}")]
    Overflow { account: Address },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AccountBalance {
    #[serde(with = "crate::units::amount_serde")]
    pub native: Amount,
    #[serde(with = "crate::units::amount_serde")]
    pub stable: Amount,
}

impl AccountBalance {
    fn slot(&mut self, asset: Asset) -> &mut Amount {
        match asset {
            Asset::Native => &mut self.native,
            Asset::Stable => &mut self.stable,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SnapshotMetadata {
    pub height: u64,
    pub previous_receipt: Option<[u8; 32]>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub meta: SnapshotMetadata,
    pub accounts: BTreeMap<Address, AccountBalance>,
    pub merkle_root: [u8; 32],
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    Mint {
        to: Address,
        asset: Asset,
        #[serde(with = "crate::units::amount_serde")]
        amount: Amount,
    },
    Approval {
        owner: Address,
        spender: Address,
        #[serde(with = "crate::units::amount_serde")]
        amount: Amount,
    },
    Transfer {
        asset: Asset,
        from: Address,
        to: Address,
        #[serde(with = "crate::units::amount_serde")]
        amount: Amount,
        memo: Option<String>,
    },
}

/// A single value movement requested by the game layer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerMutation {
    Transfer {
        asset: Asset,
        from: Address,
        to: Address,
        #[serde(with = "crate::units::amount_serde")]
        amount: Amount,
        memo: Option<String>,
    },
    /// Stable-token pull against a prior approval of `spender` by `from`.
    TransferFrom {
        spender: Address,
        from: Address,
        to: Address,
        #[serde(with = "crate::units::amount_serde")]
        amount: Amount,
        memo: Option<String>,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LedgerState {
    pub meta: SnapshotMetadata,
    pub accounts: BTreeMap<Address, AccountBalance>,
    #[serde(with = "crate::units::amount_serde::nested_map")]
    allowances: BTreeMap<Address, BTreeMap<Address, Amount>>,
    rejects_native: BTreeSet<Address>,
    pub events: Vec<LedgerEvent>,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, account: &Address) -> AccountBalance {
        self.accounts.get(account).cloned().unwrap_or_default()
    }

    pub fn native_balance(&self, account: &Address) -> Amount {
        self.balance(account).native
    }

    pub fn stable_balance(&self, account: &Address) -> Amount {
        self.balance(account).stable
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(owner)
            .and_then(|by_spender| by_spender.get(spender))
            .copied()
            .unwrap_or(0)
    }

    pub fn rejects_native(&self, account: &Address) -> bool {
        self.rejects_native.contains(account)
    }

    /// Marks `account` as refusing (or accepting again) native receipts.
    pub fn set_rejects_native(&mut self, account: Address, rejects: bool) {
        if rejects {
            self.rejects_native.insert(account);
        } else {
            self.rejects_native.remove(&account);
        }
    }

    /// Faucet used by simulations and tests; the game itself never mints.
    pub fn mint(&mut self, to: Address, asset: Asset, amount: Amount) -> Result<(), LedgerError> {
        credit(&mut self.accounts, to, asset, amount)?;
        self.events.push(LedgerEvent::Mint { to, asset, amount });
        Ok(())
    }

    pub fn approve(&mut self, owner: Address, spender: Address, amount: Amount) {
        self.allowances
            .entry(owner)
            .or_default()
            .insert(spender, amount);
        self.events.push(LedgerEvent::Approval {
            owner,
            spender,
            amount,
        });
    }

    /// Applies every mutation or none of them.
    pub fn apply_mutations(&mut self, mutations: &[LedgerMutation]) -> Result<(), LedgerError> {
        let mut accounts = self.accounts.clone();
        let mut allowances = self.allowances.clone();
        let mut events = Vec::with_capacity(mutations.len());

        for mutation in mutations {
            match mutation {
                LedgerMutation::Transfer {
                    asset,
                    from,
                    to,
                    amount,
                    memo,
                } => {
                    if *asset == Asset::Native && self.rejects_native.contains(to) {
                        return Err(LedgerError::RejectsNative { account: *to });
                    }
                    debit(&mut accounts, *from, *asset, *amount)?;
                    credit(&mut accounts, *to, *asset, *amount)?;
                    events.push(LedgerEvent::Transfer {
                        asset: *asset,
                        from: *from,
                        to: *to,
                        amount: *amount,
                        memo: memo.clone(),
                    });
                }
                LedgerMutation::TransferFrom {
                    spender,
                    from,
                    to,
                    amount,
                    memo,
                } => {
                    let allowance = allowances
                        .get_mut(from)
                        .and_then(|by_spender| by_spender.get_mut(spender))
                        .filter(|allowed| **allowed >= *amount)
                        .ok_or(LedgerError::InsufficientAllowance {
                            owner: *from,
                            spender: *spender,
                        })?;
                    *allowance -= amount;
                    debit(&mut accounts, *from, Asset::Stable, *amount)?;
                    credit(&mut accounts, *to, Asset::Stable, *amount)?;
                    events.push(LedgerEvent::Transfer {
                        asset: Asset::Stable,
                        from: *from,
                        to: *to,
                        amount: *amount,
                        memo: memo.clone(),
                    });
                }
            }
        }

        self.accounts = accounts;
        self.allowances = allowances;
        self.events.extend(events);
        Ok(())
    }

    /// Closes the current call: bumps the height and chains the receipt digest.
    pub fn seal(&mut self, receipt_id: [u8; 32]) {
        self.meta.height += 1;
        self.meta.previous_receipt = Some(receipt_id);
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            meta: self.meta.clone(),
            accounts: self.accounts.clone(),
            merkle_root: compute_merkle_root(&self.accounts),
        }
    }
}

fn credit(
    accounts: &mut BTreeMap<Address, AccountBalance>,
    account: Address,
    asset: Asset,
    amount: Amount,
) -> Result<(), LedgerError> {
    let slot = accounts.entry(account).or_default().slot(asset);
    *slot = slot
        .checked_add(amount)
        .ok_or(LedgerError::Overflow { account })?;
    Ok(())
}

fn debit(
    accounts: &mut BTreeMap<Address, AccountBalance>,
    account: Address,
    asset: Asset,
    amount: Amount,
) -> Result<(), LedgerError> {
    let insufficient = || match asset {
        Asset::Native => LedgerError::InsufficientNative { account },
        Asset::Stable => LedgerError::InsufficientStable { account },
    };
    let balance = accounts.get_mut(&account).ok_or_else(insufficient)?;
    let slot = balance.slot(asset);
    if *slot < amount {
        return Err(insufficient());
    }
    *slot -= amount;
    Ok(())
}

fn compute_merkle_root(accounts: &BTreeMap<Address, AccountBalance>) -> [u8; 32] {
    let leaves = accounts
        .iter()
        .map(|(account, balance)| {
            let mut hasher = Sha256::new();
            hasher.update(b"acct");
            hasher.update(account.as_bytes());
            hasher.update(balance.native.to_le_bytes());
            hasher.update(balance.stable.to_le_bytes());
            hasher.finalize().into()
        })
        .collect();
    build_merkle(leaves)
}

fn build_merkle(mut leaves: Vec<[u8; 32]>) -> [u8; 32] {
    if leaves.is_empty() {
        return Sha256::digest(b"table-ladder-empty").into();
    }
    while leaves.len() > 1 {
        let mut next = Vec::with_capacity((leaves.len() + 1) / 2);
        for chunk in leaves.chunks(2) {
            let mut hasher = Sha256::new();
            hasher.update(b"node");
            hasher.update(chunk[0]);
            hasher.update(chunk.get(1).unwrap_or(&chunk[0]));
            next.push(hasher.finalize().into());
        }
        leaves = next;
    }
    leaves[0]
}
