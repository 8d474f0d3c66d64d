//! Table ladder state machine and contribution distribution.
//!
//! A contribution is planned against the current state, settled on the
//! ledger in one atomic batch, and only then committed to participant and
//! table state. A ledger failure therefore leaves the engine untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    address::Address,
    config::{GameConfig, ReferrerPolicy},
    distribution::{split_contribution, split_direct},
    error::GameError,
    events::GameEvent,
    ledger::{Amount, Asset, LedgerMutation, LedgerState},
    registry::VerificationRegistry,
};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Participant {
    /// 0 until the first table is entered.
    pub current_table: usize,
    /// Fixed on first entry; `None` only for root.
    pub referrer: Option<Address>,
    /// Set the first time this participant is credited as someone's referrer.
    pub has_received_donation_bonus: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TableEarnings {
    #[serde(with = "crate::units::amount_serde")]
    pub referral: Amount,
    #[serde(with = "crate::units::amount_serde")]
    pub donation: Amount,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Table {
    #[serde(with = "crate::units::amount_serde")]
    pub threshold: Amount,
    roster: Vec<Address>,
    earnings: BTreeMap<Address, TableEarnings>,
}

impl Table {
    fn new(threshold: Amount) -> Self {
        Self {
            threshold,
            roster: Vec::new(),
            earnings: BTreeMap::new(),
        }
    }

    pub fn roster(&self) -> &[Address] {
        &self.roster
    }

    pub fn position_of(&self, account: &Address) -> Option<usize> {
        self.roster.iter().position(|a| a == account)
    }

    pub fn earnings_of(&self, account: &Address) -> TableEarnings {
        self.earnings.get(account).cloned().unwrap_or_default()
    }

    fn credit(&mut self, account: Address, referral: Amount, donation: Amount) {
        let entry = self.earnings.entry(account).or_default();
        entry.referral += referral;
        entry.donation += donation;
    }
}

/// Membership projection returned by `info_table`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableInfo {
    pub table: usize,
    #[serde(with = "crate::units::amount_serde")]
    pub threshold: Amount,
    pub address: Address,
    pub entered: bool,
    /// Zero-based roster position.
    pub position: Option<usize>,
    #[serde(with = "crate::units::amount_serde")]
    pub referral_earned: Amount,
    #[serde(with = "crate::units::amount_serde")]
    pub donation_earned: Amount,
}

struct Payout {
    to: Address,
    value: Amount,
    event: fn(Address, Amount, usize) -> GameEvent,
}

fn referral_event(to: Address, value: Amount, table: usize) -> GameEvent {
    GameEvent::ReferralRewardSent { to, value, table }
}

fn donation_event(to: Address, value: Amount, table: usize) -> GameEvent {
    GameEvent::DonationRewardSent { to, value, table }
}

fn donation_referral_event(to: Address, value: Amount, table: usize) -> GameEvent {
    GameEvent::DonationReferralRewardSent { to, value, table }
}

fn charity_event(to: Address, value: Amount, table: usize) -> GameEvent {
    GameEvent::CharitySent { to, value, table }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableEngine {
    tables: Vec<Table>,
    participants: BTreeMap<Address, Participant>,
}

impl TableEngine {
    /// Builds the ladder from `config.thresholds`, seating root at the top of every table.
    pub fn new(config: &GameConfig) -> Self {
        let mut tables: Vec<Table> = config.thresholds.iter().copied().map(Table::new).collect();
        for table in &mut tables {
            table.roster.push(config.root);
        }
        let mut participants = BTreeMap::new();
        participants.insert(
            config.root,
            Participant {
                current_table: tables.len(),
                referrer: None,
                has_received_donation_bonus: false,
            },
        );
        Self {
            tables,
            participants,
        }
    }

    pub fn tables_count(&self) -> usize {
        self.tables.len()
    }

    pub fn table(&self, table: usize) -> Result<&Table, GameError> {
        table
            .checked_sub(1)
            .and_then(|idx| self.tables.get(idx))
            .ok_or(GameError::InvalidTable(table))
    }

    pub fn table_threshold(&self, table: usize) -> Result<Amount, GameError> {
        Ok(self.table(table)?.threshold)
    }

    pub fn table_addresses_count(&self, table: usize) -> Result<usize, GameError> {
        Ok(self.table(table)?.roster.len())
    }

    pub fn participant(&self, account: &Address) -> Option<&Participant> {
        self.participants.get(account)
    }

    pub fn current_table(&self, account: &Address) -> usize {
        self.participants
            .get(account)
            .map_or(0, |p| p.current_table)
    }

    pub fn info_table(&self, table: usize, account: &Address) -> Result<TableInfo, GameError> {
        let t = self.table(table)?;
        let position = t.position_of(account);
        let earned = t.earnings_of(account);
        Ok(TableInfo {
            table,
            threshold: t.threshold,
            address: *account,
            entered: position.is_some(),
            position,
            referral_earned: earned.referral,
            donation_earned: earned.donation,
        })
    }

    /// Validates verification, ladder end and exact amount, returning the table to enter.
    fn next_table(
        &self,
        registry: &VerificationRegistry,
        caller: &Address,
        amount: Amount,
    ) -> Result<usize, GameError> {
        if !registry.is_verified(caller) {
            return Err(GameError::UnverifiedCaller);
        }
        let target = self.current_table(caller) + 1;
        if target > self.tables.len() {
            return Err(GameError::AllTablesCompleted);
        }
        if self.tables[target - 1].threshold != amount {
            return Err(GameError::NotNextTable);
        }
        Ok(target)
    }

    /// Stored referrer if one exists, otherwise the candidate after policy checks.
    fn resolve_referrer(
        &self,
        registry: &VerificationRegistry,
        config: &GameConfig,
        caller: &Address,
        candidate: Address,
    ) -> Address {
        if let Some(stored) = self.participants.get(caller).and_then(|p| p.referrer) {
            return stored;
        }
        if candidate.is_zero() || candidate == *caller {
            return config.root;
        }
        match config.referrer_policy {
            ReferrerPolicy::Any => candidate,
            ReferrerPolicy::VerifiedOnly if registry.is_verified(&candidate) => candidate,
            ReferrerPolicy::VerifiedOnly => config.root,
        }
    }

    /// `buy(referrer)` with `amount` attached.
    pub fn buy(
        &mut self,
        ledger: &mut LedgerState,
        registry: &VerificationRegistry,
        config: &GameConfig,
        caller: Address,
        referrer_candidate: Address,
        amount: Amount,
    ) -> Result<Vec<GameEvent>, GameError> {
        let target = self.next_table(registry, &caller, amount)?;
        let referrer = self.resolve_referrer(registry, config, &caller, referrer_candidate);
        let upline = self.participants.get(&referrer);
        let donation_target = upline.and_then(|p| p.referrer).unwrap_or(config.root);
        let pay_bonus = !upline.map_or(false, |p| p.has_received_donation_bonus);

        let split = split_contribution(amount, &config.contribution_shares, pay_bonus);
        let mut payouts = vec![
            Payout {
                to: referrer,
                value: split.referral,
                event: referral_event,
            },
            Payout {
                to: donation_target,
                value: split.donation,
                event: donation_event,
            },
        ];
        if pay_bonus {
            payouts.push(Payout {
                to: config.root,
                value: split.donation_referral,
                event: donation_referral_event,
            });
        }
        payouts.push(Payout {
            to: config.charity,
            value: split.charity,
            event: charity_event,
        });

        let events = self.settle(ledger, config, caller, amount, target, &payouts)?;

        if pay_bonus {
            self.participants
                .entry(referrer)
                .or_default()
                .has_received_donation_bonus = true;
        }
        let table = &mut self.tables[target - 1];
        table.credit(referrer, split.referral, 0);
        table.credit(donation_target, 0, split.donation);
        self.enter(caller, target, referrer);

        info!(
            user = %caller,
            table = target,
            value = amount,
            referrer = %referrer,
            bonus = pay_bonus,
            retained = split.retained,
            "investment received"
        );
        Ok(events)
    }

    /// Plain value transfer: root takes the collapsed referral chain share.
    pub fn receive_direct(
        &mut self,
        ledger: &mut LedgerState,
        registry: &VerificationRegistry,
        config: &GameConfig,
        caller: Address,
        amount: Amount,
    ) -> Result<Vec<GameEvent>, GameError> {
        let target = self.next_table(registry, &caller, amount)?;
        let referrer = self
            .participants
            .get(&caller)
            .and_then(|p| p.referrer)
            .unwrap_or(config.root);

        let split = split_direct(amount, &config.direct_shares);
        let payouts = [
            Payout {
                to: config.root,
                value: split.root,
                event: referral_event,
            },
            Payout {
                to: config.charity,
                value: split.charity,
                event: charity_event,
            },
        ];

        let events = self.settle(ledger, config, caller, amount, target, &payouts)?;

        self.tables[target - 1].credit(config.root, split.root, 0);
        self.enter(caller, target, referrer);

        info!(
            user = %caller,
            table = target,
            value = amount,
            retained = split.retained,
            "direct investment received"
        );
        Ok(events)
    }

    /// Moves `amount` into the engine and pays every payout out of it, atomically.
    fn settle(
        &self,
        ledger: &mut LedgerState,
        config: &GameConfig,
        caller: Address,
        amount: Amount,
        table: usize,
        payouts: &[Payout],
    ) -> Result<Vec<GameEvent>, GameError> {
        let mut mutations = Vec::with_capacity(payouts.len() + 1);
        mutations.push(LedgerMutation::Transfer {
            asset: Asset::Native,
            from: caller,
            to: config.engine,
            amount,
            memo: Some(format!("table {table} contribution")),
        });
        let mut events = Vec::with_capacity(payouts.len() + 1);
        for payout in payouts {
            mutations.push(LedgerMutation::Transfer {
                asset: Asset::Native,
                from: config.engine,
                to: payout.to,
                amount: payout.value,
                memo: Some(format!("table {table} payout")),
            });
            let event = (payout.event)(payout.to, payout.value, table);
            debug!(event = event.name(), to = %payout.to, value = payout.value, table, "payout planned");
            events.push(event);
        }
        events.push(GameEvent::InvestmentReceived {
            user: caller,
            value: amount,
            table,
        });

        ledger.apply_mutations(&mutations)?;
        Ok(events)
    }

    fn enter(&mut self, caller: Address, table: usize, referrer: Address) {
        let participant = self.participants.entry(caller).or_default();
        participant.current_table = table;
        participant.referrer.get_or_insert(referrer);
        self.tables[table - 1].roster.push(caller);
    }
}
