//! # atomatch-chain
//!
//! The execution substrate the protocol components run on: accounts with
//! balances, code and storage; call frames with an authenticated caller;
//! `call`, `delegate_call` and `static_call`; and checkpointed state so
//! every frame is all-or-nothing.
//!
//! Components implement [`Contract`]. Static predicates implement
//! [`OrderPredicate`] and are evaluated against a shared borrow of
//! [`WorldState`], never called.
//!
//! With the `test-helpers` feature, [`mocks`] provides token, wallet and
//! attacker contracts for tests.

pub mod chain;
pub mod contract;
#[cfg(any(test, feature = "test-helpers"))]
pub mod mocks;
pub mod predicate;
pub mod state;

pub use chain::{Chain, decode_return, derive_address};
pub use contract::{Contract, Frame, dispatch, returns};
pub use predicate::{OrderPredicate, PredicateContext};
pub use state::{Account, Code, Slot, WorldState};
