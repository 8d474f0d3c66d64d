//! Decimal text <-> base-unit conversion for 18-decimal assets.

use crate::ledger::Amount;

pub const DECIMALS: u32 = 18;
pub const UNIT: Amount = 1_000_000_000_000_000_000; // 1 token = 1e18 base units

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UnitsError {
    #[error("empty amount")]
    Empty,
    #[error("invalid amount {0:?}")]
    Invalid(String),
    #[error("amount {0:?} has more than 18 fractional digits")]
    TooPrecise(String),
    #[error("amount {0:?} overflows")]
    Overflow(String),
}

/// Parses `"0.1"` into `100_000_000_000_000_000`.
pub fn parse_units(text: &str) -> Result<Amount, UnitsError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(UnitsError::Empty);
    }
    let (whole, frac) = match text.split_once('.') {
        Some((w, f)) => (w, f),
        None => (text, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(UnitsError::Invalid(text.to_string()));
    }
    let digits_only = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !digits_only(whole) || !digits_only(frac) {
        return Err(UnitsError::Invalid(text.to_string()));
    }
    if frac.len() > DECIMALS as usize {
        return Err(UnitsError::TooPrecise(text.to_string()));
    }

    let overflow = || UnitsError::Overflow(text.to_string());
    let whole_units: Amount = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| overflow())?
    };
    let mut frac_units: Amount = if frac.is_empty() {
        0
    } else {
        frac.parse().map_err(|_| overflow())?
    };
    frac_units *= 10u128.pow(DECIMALS - frac.len() as u32);

    whole_units
        .checked_mul(UNIT)
        .and_then(|w| w.checked_add(frac_units))
        .ok_or_else(overflow)
}

/// Formats base units as a trimmed decimal string (`"0.025"`).
pub fn format_units(amount: Amount) -> String {
    let whole = amount / UNIT;
    let frac = amount % UNIT;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0width$}", frac, width = DECIMALS as usize);
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

/// Serde helper writing base-unit amounts as decimal strings (`"100000000000000000"`).
///
/// JSON numbers above `u64::MAX` do not survive `serde_json::Value` or the
/// buffering behind internally tagged enums, so amounts never travel as numbers.
pub mod amount_serde {
    use std::collections::BTreeMap;

    use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

    use crate::{address::Address, ledger::Amount};

    pub fn serialize<S>(value: &Amount, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Amount, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        encoded.parse().map_err(D::Error::custom)
    }

    pub mod vec {
        use super::*;

        pub fn serialize<S>(values: &[Amount], serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            let encoded: Vec<String> = values.iter().map(Amount::to_string).collect();
            encoded.serialize(serializer)
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Amount>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Vec::<String>::deserialize(deserializer)?
                .iter()
                .map(|text| text.parse().map_err(D::Error::custom))
                .collect()
        }
    }

    /// Owner -> spender -> amount.
    pub mod nested_map {
        use super::*;

        type Nested<T> = BTreeMap<Address, BTreeMap<Address, T>>;

        pub fn serialize<S>(values: &Nested<Amount>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            let encoded: Nested<String> = values
                .iter()
                .map(|(owner, inner)| {
                    let inner = inner
                        .iter()
                        .map(|(spender, amount)| (*spender, amount.to_string()))
                        .collect();
                    (*owner, inner)
                })
                .collect();
            encoded.serialize(serializer)
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Nested<Amount>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let encoded = Nested::<String>::deserialize(deserializer)?;
            let mut decoded = Nested::new();
            for (owner, inner) in encoded {
                let mut by_spender = BTreeMap::new();
                for (spender, text) in inner {
                    by_spender.insert(spender, text.parse().map_err(D::Error::custom)?);
                }
                decoded.insert(owner, by_spender);
            }
            Ok(decoded)
        }
    }
}
