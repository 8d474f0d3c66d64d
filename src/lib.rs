//! Referral-driven table ladder.
//!
//! Participants pay a one-time verification fee in a stable token, then climb
//! a fixed ladder of tables by contributing exactly the next table's threshold
//! in native currency. Each contribution is split between the referrer, the
//! referrer's upline, a one-time donation-referral bonus to root, charity and
//! the engine's retained pool.
//!
//! * [`registry`] — the verification gate.
//! * [`engine`] — table progression and contribution distribution.
//! * [`distribution`] — the pure split arithmetic.
//! * [`ledger`] — the host balances every call settles against atomically.
//! * [`game`] — the facade that runs each call as one transaction.

pub mod address;
pub mod config;
pub mod distribution;
pub mod engine;
pub mod events;
pub mod game;
pub mod ledger;
pub mod registry;
pub mod units;

mod error;

pub use address::Address;
pub use config::GameConfig;
pub use error::GameError;
pub use events::GameEvent;
pub use game::{CallReceipt, Game, ParticipantInfo};
