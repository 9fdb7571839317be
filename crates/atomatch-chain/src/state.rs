//! World state: accounts, code, storage and the event log.
//!
//! The whole state is `Clone`; every frame checkpoints it before running
//! and puts the checkpoint back if the frame fails. That is the only
//! rollback mechanism, so nothing outside `WorldState` may hold
//! transaction-scoped data.

use std::{collections::HashMap, fmt, sync::Arc};

use atomatch_types::{Address, B256, Log, U256};

use crate::{contract::Contract, predicate::OrderPredicate};

// ---------------------------------------------------------------------------
// Slot
// ---------------------------------------------------------------------------

/// A storage key. Named roots are hashed, mapping keys are folded in the
/// way Solidity derives mapping slots: `keccak256(key || parent)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot(B256);

impl Slot {
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self(atomatch_types::keccak256(name.as_bytes()))
    }

    /// Descend into a mapping at `key`.
    #[must_use]
    pub fn at(self, key: &[u8]) -> Self {
        let mut buf = Vec::with_capacity(key.len() + 32);
        buf.extend_from_slice(key);
        buf.extend_from_slice(self.0.as_slice());
        Self(atomatch_types::keccak256(buf))
    }

    #[must_use]
    pub fn word(&self) -> B256 {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Code
// ---------------------------------------------------------------------------

/// What lives at an address with code.
#[derive(Clone)]
pub enum Code {
    /// A callable component.
    Contract(Arc<dyn Contract>),
    /// A static predicate; evaluated read-only, never called.
    Predicate(Arc<dyn OrderPredicate>),
}

impl Code {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Contract(c) => c.name(),
            Self::Predicate(p) => p.name(),
        }
    }
}

impl fmt::Debug for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contract(c) => write!(f, "Contract({})", c.name()),
            Self::Predicate(p) => write!(f, "Predicate({})", p.name()),
        }
    }
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Account {
    pub balance: U256,
    /// Number of contracts this account has deployed.
    pub nonce: u64,
    pub code: Option<Code>,
    pub storage: HashMap<B256, B256>,
}

// ---------------------------------------------------------------------------
// WorldState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct WorldState {
    accounts: HashMap<Address, Account>,
    logs: Vec<Log>,
}

impl WorldState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn account(&self, address: Address) -> Option<&Account> {
        self.accounts.get(&address)
    }

    pub(crate) fn account_mut(&mut self, address: Address) -> &mut Account {
        self.accounts.entry(address).or_default()
    }

    #[must_use]
    pub fn code(&self, address: Address) -> Option<&Code> {
        self.accounts.get(&address).and_then(|a| a.code.as_ref())
    }

    #[must_use]
    pub fn has_code(&self, address: Address) -> bool {
        self.code(address).is_some()
    }

    #[must_use]
    pub fn balance(&self, address: Address) -> U256 {
        self.accounts
            .get(&address)
            .map_or(U256::ZERO, |a| a.balance)
    }

    #[must_use]
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    pub(crate) fn push_log(&mut self, log: Log) {
        self.logs.push(log);
    }

    // --- storage reads -----------------------------------------------------

    #[must_use]
    pub fn sload(&self, address: Address, slot: Slot) -> B256 {
        self.accounts
            .get(&address)
            .and_then(|a| a.storage.get(&slot.word()))
            .copied()
            .unwrap_or(B256::ZERO)
    }

    #[must_use]
    pub fn load_u256(&self, address: Address, slot: Slot) -> U256 {
        U256::from_be_bytes(self.sload(address, slot).0)
    }

    #[must_use]
    pub fn load_address(&self, address: Address, slot: Slot) -> Address {
        Address::from_word(self.sload(address, slot))
    }

    #[must_use]
    pub fn load_bool(&self, address: Address, slot: Slot) -> bool {
        !self.sload(address, slot).is_zero()
    }

    pub(crate) fn sstore(&mut self, address: Address, slot: Slot, value: B256) {
        let storage = &mut self.account_mut(address).storage;
        if value.is_zero() {
            storage.remove(&slot.word());
        } else {
            storage.insert(slot.word(), value);
        }
    }
}
