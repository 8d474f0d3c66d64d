use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    address::Address,
    ledger::Amount,
    units::UNIT,
};

pub const BPS_DENOMINATOR: u32 = 10_000;
pub const DEFAULT_TABLES_COUNT: usize = 11;
pub const DEFAULT_FIRST_THRESHOLD: Amount = UNIT / 10; // 0.1 native unit
pub const DEFAULT_VERIFICATION_FEE: Amount = 10 * UNIT;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("at least one table is required")]
    NoTables,
    #[error("table {table} threshold must exceed the previous one")]
    NonIncreasingThreshold { table: usize },
    #[error("table 1 threshold must be non-zero")]
    ZeroThreshold,
    #[error("{path} shares sum to {total} bps, above 10000")]
    SharesExceedTotal { path: &'static str, total: u32 },
    #[error("{role} address must not be zero")]
    ZeroAddress { role: &'static str },
    #[error("engine address must differ from root and charity")]
    EngineAddressClash,
    #[error("config io: {0}")]
    Io(#[from] std::io::Error),
    #[error("config json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Basis-point split applied to a `buy` contribution.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContributionShares {
    pub referral_bps: u32,
    pub donation_bps: u32,
    pub donation_referral_bps: u32,
    pub charity_bps: u32,
}

impl Default for ContributionShares {
    fn default() -> Self {
        Self {
            referral_bps: 2_500,
            donation_bps: 800,
            donation_referral_bps: 500,
            charity_bps: 1_000,
        }
    }
}

impl ContributionShares {
    pub fn total_bps(&self) -> u32 {
        self.referral_bps
            .saturating_add(self.donation_bps)
            .saturating_add(self.donation_referral_bps)
            .saturating_add(self.charity_bps)
    }
}

/// Basis-point split applied to a plain value transfer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirectTransferShares {
    pub root_bps: u32,
    pub charity_bps: u32,
}

impl Default for DirectTransferShares {
    fn default() -> Self {
        Self {
            root_bps: 6_500,
            charity_bps: 1_000,
        }
    }
}

impl DirectTransferShares {
    pub fn total_bps(&self) -> u32 {
        self.root_bps.saturating_add(self.charity_bps)
    }
}

/// Where the verification fee lands.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FeeRecipient {
    #[default]
    Engine,
    Root,
}

/// Which first-entry referrer candidates are accepted as-is.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReferrerPolicy {
    /// Any non-zero address other than the caller.
    #[default]
    Any,
    /// Only verified addresses; anything else falls back to root.
    VerifiedOnly,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameConfig {
    pub root: Address,
    pub charity: Address,
    pub stable_token: Address,
    /// The engine's own account: receives contributions and holds the retained pool.
    pub engine: Address,
    #[serde(with = "crate::units::amount_serde")]
    pub verification_fee: Amount,
    #[serde(with = "crate::units::amount_serde::vec")]
    pub thresholds: Vec<Amount>,
    #[serde(default)]
    pub contribution_shares: ContributionShares,
    #[serde(default)]
    pub direct_shares: DirectTransferShares,
    #[serde(default)]
    pub fee_recipient: FeeRecipient,
    #[serde(default)]
    pub referrer_policy: ReferrerPolicy,
}

impl GameConfig {
    pub fn new(root: Address, charity: Address, stable_token: Address, engine: Address) -> Self {
        Self {
            root,
            charity,
            stable_token,
            engine,
            verification_fee: DEFAULT_VERIFICATION_FEE,
            thresholds: doubling_thresholds(DEFAULT_FIRST_THRESHOLD, DEFAULT_TABLES_COUNT),
            contribution_shares: ContributionShares::default(),
            direct_shares: DirectTransferShares::default(),
            fee_recipient: FeeRecipient::default(),
            referrer_policy: ReferrerPolicy::default(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let bytes = fs::read(path)?;
        let config: GameConfig = serde_json::from_slice(&bytes)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_vec_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (role, address) in [
            ("root", self.root),
            ("charity", self.charity),
            ("stable token", self.stable_token),
            ("engine", self.engine),
        ] {
            if address.is_zero() {
                return Err(ConfigError::ZeroAddress { role });
            }
        }
        if self.engine == self.root || self.engine == self.charity {
            return Err(ConfigError::EngineAddressClash);
        }

        match self.thresholds.first() {
            None => return Err(ConfigError::NoTables),
            Some(&0) => return Err(ConfigError::ZeroThreshold),
            Some(_) => {}
        }
        for (idx, pair) in self.thresholds.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(ConfigError::NonIncreasingThreshold { table: idx + 2 });
            }
        }

        let total = self.contribution_shares.total_bps();
        if total > BPS_DENOMINATOR {
            return Err(ConfigError::SharesExceedTotal {
                path: "contribution",
                total,
            });
        }
        let total = self.direct_shares.total_bps();
        if total > BPS_DENOMINATOR {
            return Err(ConfigError::SharesExceedTotal {
                path: "direct transfer",
                total,
            });
        }
        Ok(())
    }
}

/// `first, 2*first, 4*first, ...` for `count` tables.
pub fn doubling_thresholds(first: Amount, count: usize) -> Vec<Amount> {
    (0..count).map(|idx| first << idx).collect()
}
