//! Static predicates: per-order compatibility and fill logic.
//!
//! A predicate is addressed by `(staticTarget, staticSelector)` from the
//! order. It sees both orders, both settlement calls and a shared borrow of
//! the world state, so it cannot mutate anything the exchange relies on.

use std::fmt;

use atomatch_types::{Address, Call, Order, Result, Selector, U256};

use crate::WorldState;

/// Inputs to one predicate evaluation, seen from the order being checked.
#[derive(Debug, Clone, Copy)]
pub struct PredicateContext<'a> {
    pub selector: Selector,
    /// The order's `staticExtradata`.
    pub extradata: &'a [u8],
    pub order: &'a Order,
    pub call: &'a Call,
    pub counter_order: &'a Order,
    pub counter_call: &'a Call,
    /// Account that submitted the match.
    pub matcher: Address,
    pub previous_fill: U256,
    pub counter_previous_fill: U256,
    pub timestamp: u64,
}

/// Decides whether two orders and their calls are mutually compatible and
/// returns the order's new cumulative fill.
///
/// Returning an error (conventionally
/// [`AtomatchError::PredicateRejected`](atomatch_types::AtomatchError::PredicateRejected))
/// aborts the match.
pub trait OrderPredicate: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn evaluate(&self, state: &WorldState, ctx: &PredicateContext<'_>) -> Result<U256>;
}
