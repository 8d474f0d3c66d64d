use serde::{Deserialize, Serialize};

use crate::{address::Address, ledger::Amount};

/// Observable outcome of a successful call, one per money movement.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    UserVerification {
        user: Address,
    },
    InvestmentReceived {
        user: Address,
        #[serde(with = "crate::units::amount_serde")]
        value: Amount,
        table: usize,
    },
    ReferralRewardSent {
        to: Address,
        #[serde(with = "crate::units::amount_serde")]
        value: Amount,
        table: usize,
    },
    DonationRewardSent {
        to: Address,
        #[serde(with = "crate::units::amount_serde")]
        value: Amount,
        table: usize,
    },
    DonationReferralRewardSent {
        to: Address,
        #[serde(with = "crate::units::amount_serde")]
        value: Amount,
        table: usize,
    },
    CharitySent {
        to: Address,
        #[serde(with = "crate::units::amount_serde")]
        value: Amount,
        table: usize,
    },
}

impl GameEvent {
    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::UserVerification { .. } => "UserVerification",
            GameEvent::InvestmentReceived { .. } => "InvestmentReceived",
            GameEvent::ReferralRewardSent { .. } => "ReferralRewardSent",
            GameEvent::DonationRewardSent { .. } => "DonationRewardSent",
            GameEvent::DonationReferralRewardSent { .. } => "DonationReferralRewardSent",
            GameEvent::CharitySent { .. } => "CharitySent",
        }
    }

    /// Fixed-layout bytes hashed into the receipt digest.
    pub fn commitment(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(96);
        out.extend_from_slice(self.name().as_bytes());
        out.push(0);
        match self {
            GameEvent::UserVerification { user } => out.extend_from_slice(user.as_bytes()),
            GameEvent::InvestmentReceived {
                user: to,
                value,
                table,
            }
            | GameEvent::ReferralRewardSent { to, value, table }
            | GameEvent::DonationRewardSent { to, value, table }
            | GameEvent::DonationReferralRewardSent { to, value, table }
            | GameEvent::CharitySent { to, value, table } => {
                out.extend_from_slice(to.as_bytes());
                out.extend_from_slice(&value.to_le_bytes());
                out.extend_from_slice(&(*table as u64).to_le_bytes());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::UNIT;

    #[test]
    fn commitment_separates_kind_and_fields() {
        let to = Address::derive(b"alice");
        let referral = GameEvent::ReferralRewardSent { to, value: UNIT, table: 1 };
        let charity = GameEvent::CharitySent { to, value: UNIT, table: 1 };
        let next_table = GameEvent::ReferralRewardSent { to, value: UNIT, table: 2 };

        assert_ne!(referral.commitment(), charity.commitment());
        assert_ne!(referral.commitment(), next_table.commitment());
        assert_eq!(referral.commitment(), referral.clone().commitment());
    }

    #[test]
    fn large_values_round_trip_through_tagged_json() {
        let event = GameEvent::InvestmentReceived {
            user: Address::derive(b"bob"),
            value: 1024 * UNIT / 10,
            table: 11,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""value":"102400000000000000000""#));
        assert_eq!(serde_json::from_str::<GameEvent>(&json).unwrap(), event);
    }
}
