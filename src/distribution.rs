//! Pure reward-split arithmetic.
//!
//! Every outbound share is floored in basis points; the retained pool takes
//! whatever is left, so the parts always add back up to the contribution.

use serde::{Deserialize, Serialize};

use crate::{
    config::{ContributionShares, DirectTransferShares, BPS_DENOMINATOR},
    ledger::Amount,
};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RewardSplit {
    #[serde(with = "crate::units::amount_serde")]
    pub referral: Amount,
    #[serde(with = "crate::units::amount_serde")]
    pub donation: Amount,
    /// Zero when the referrer already triggered its one-time bonus.
    #[serde(with = "crate::units::amount_serde")]
    pub donation_referral: Amount,
    #[serde(with = "crate::units::amount_serde")]
    pub charity: Amount,
    #[serde(with = "crate::units::amount_serde")]
    pub retained: Amount,
}

impl RewardSplit {
    pub fn outbound(&self) -> Amount {
        self.referral + self.donation + self.donation_referral + self.charity
    }

    pub fn total(&self) -> Amount {
        self.outbound() + self.retained
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirectSplit {
    #[serde(with = "crate::units::amount_serde")]
    pub root: Amount,
    #[serde(with = "crate::units::amount_serde")]
    pub charity: Amount,
    #[serde(with = "crate::units::amount_serde")]
    pub retained: Amount,
}

impl DirectSplit {
    pub fn total(&self) -> Amount {
        self.root + self.charity + self.retained
    }
}

pub fn bps_of(amount: Amount, bps: u32) -> Amount {
    // Split into quotient and remainder so the product cannot overflow for bps <= 10_000.
    amount / BPS_DENOMINATOR as Amount * bps as Amount
        + amount % BPS_DENOMINATOR as Amount * bps as Amount / BPS_DENOMINATOR as Amount
}

/// Split for a `buy` contribution; `pay_bonus` decides the one-time donation-referral share.
pub fn split_contribution(amount: Amount, shares: &ContributionShares, pay_bonus: bool) -> RewardSplit {
    let referral = bps_of(amount, shares.referral_bps);
    let donation = bps_of(amount, shares.donation_bps);
    let donation_referral = if pay_bonus {
        bps_of(amount, shares.donation_referral_bps)
    } else {
        0
    };
    let charity = bps_of(amount, shares.charity_bps);
    let retained = amount - (referral + donation + donation_referral + charity);
    RewardSplit {
        referral,
        donation,
        donation_referral,
        charity,
        retained,
    }
}

/// Split for a plain value transfer: root absorbs the collapsed referral chain.
pub fn split_direct(amount: Amount, shares: &DirectTransferShares) -> DirectSplit {
    let root = bps_of(amount, shares.root_bps);
    let charity = bps_of(amount, shares.charity_bps);
    DirectSplit {
        root,
        charity,
        retained: amount - (root + charity),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{parse_units, UNIT};
    use proptest::prelude::*;

    #[test]
    fn first_table_split_matches_observed_payouts() {
        let split = split_contribution(UNIT / 10, &ContributionShares::default(), true);
        assert_eq!(split.referral, parse_units("0.025").unwrap());
        assert_eq!(split.donation, parse_units("0.008").unwrap());
        assert_eq!(split.donation_referral, parse_units("0.005").unwrap());
        assert_eq!(split.charity, parse_units("0.01").unwrap());
        assert_eq!(split.retained, parse_units("0.052").unwrap());
    }

    #[test]
    fn bonus_skipped_goes_to_the_pool() {
        let split = split_contribution(UNIT / 5, &ContributionShares::default(), false);
        assert_eq!(split.referral, parse_units("0.05").unwrap());
        assert_eq!(split.donation, parse_units("0.016").unwrap());
        assert_eq!(split.donation_referral, 0);
        assert_eq!(split.charity, parse_units("0.02").unwrap());
        assert_eq!(split.retained, parse_units("0.114").unwrap());
    }

    #[test]
    fn direct_split_sends_sixty_five_percent_to_root() {
        let split = split_direct(UNIT / 10, &DirectTransferShares::default());
        assert_eq!(split.root, parse_units("0.065").unwrap());
        assert_eq!(split.charity, parse_units("0.01").unwrap());
        assert_eq!(split.retained, parse_units("0.025").unwrap());
    }

    #[test]
    fn odd_amounts_leave_dust_in_the_pool() {
        let split = split_contribution(9_999, &ContributionShares::default(), true);
        assert_eq!(split.referral, 2_499);
        assert_eq!(split.donation, 799);
        assert_eq!(split.donation_referral, 499);
        assert_eq!(split.charity, 999);
        assert_eq!(split.total(), 9_999);
    }

    #[test]
    fn bps_of_handles_huge_amounts() {
        assert_eq!(bps_of(u128::MAX, BPS_DENOMINATOR), u128::MAX);
        assert_eq!(bps_of(u128::MAX, 0), 0);
    }

    proptest! {
        #[test]
        fn prop_contribution_parts_sum_exactly(amount in 0u128..=1u128 << 100, bonus in any::<bool>()) {
            let split = split_contribution(amount, &ContributionShares::default(), bonus);
            prop_assert_eq!(split.total(), amount);
            prop_assert_eq!(split.referral, amount * 2_500 / 10_000);
        }

        #[test]
        fn prop_direct_parts_sum_exactly(amount in 0u128..=u128::MAX / 2) {
            let split = split_direct(amount, &DirectTransferShares::default());
            prop_assert_eq!(split.total(), amount);
        }
    }
}
