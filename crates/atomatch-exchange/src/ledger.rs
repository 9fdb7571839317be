//! Fill and approval ledgers.
//!
//! Both are keyed by `(maker, orderHash)` and live in the exchange's
//! storage. The handles only know the exchange address, so they can read a
//! bare [`WorldState`] (from a predicate, an indexer or a test) and write
//! through a [`Chain`] inside a frame.
//!
//! | Ledger   | Value  | Transitions                                    |
//! |----------|--------|------------------------------------------------|
//! | fills    | `U256` | monotonically non-decreasing                   |
//! | approved | `bool` | `false -> true`, once, never back              |

use atomatch_chain::{Chain, Slot, WorldState};
use atomatch_types::{Address, AtomatchError, B256, Result, U256};

fn fill_slot(maker: Address, hash: B256) -> Slot {
    Slot::named("exchange.fills")
        .at(maker.as_slice())
        .at(hash.as_slice())
}

fn approval_slot(maker: Address, hash: B256) -> Slot {
    Slot::named("exchange.approved")
        .at(maker.as_slice())
        .at(hash.as_slice())
}

/// `(maker, hash) -> cumulative fill`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillLedger {
    exchange: Address,
}

impl FillLedger {
    #[must_use]
    pub fn new(exchange: Address) -> Self {
        Self { exchange }
    }

    #[must_use]
    pub fn get(&self, state: &WorldState, maker: Address, hash: B256) -> U256 {
        state.load_u256(self.exchange, fill_slot(maker, hash))
    }

    /// Raise the fill. Lowering it fails with
    /// [`AtomatchError::OrderFillCannotDecrease`]. Returns `true` if the
    /// value changed.
    pub fn raise(&self, chain: &mut Chain, maker: Address, hash: B256, fill: U256) -> Result<bool> {
        let current = self.get(chain.state(), maker, hash);
        if fill < current {
            return Err(AtomatchError::OrderFillCannotDecrease {
                current,
                requested: fill,
            });
        }
        if fill == current {
            return Ok(false);
        }
        chain.store_u256(self.exchange, fill_slot(maker, hash), fill)?;
        Ok(true)
    }
}

/// `(maker, hash) -> approved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalLedger {
    exchange: Address,
}

impl ApprovalLedger {
    #[must_use]
    pub fn new(exchange: Address) -> Self {
        Self { exchange }
    }

    #[must_use]
    pub fn is_approved(&self, state: &WorldState, maker: Address, hash: B256) -> bool {
        state.load_bool(self.exchange, approval_slot(maker, hash))
    }

    /// Record the approval; a second approval of the same pair fails.
    pub fn approve(&self, chain: &mut Chain, maker: Address, hash: B256) -> Result<()> {
        if self.is_approved(chain.state(), maker, hash) {
            return Err(AtomatchError::OrderHasAlreadyBeenApproved { hash });
        }
        chain.store_bool(self.exchange, approval_slot(maker, hash), true)
    }
}
