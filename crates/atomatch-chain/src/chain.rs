//! The execution substrate.
//!
//! ```text
//! transact ─▶ call ─▶ run_frame ─┬─ checkpoint state
//!                                ├─ move value
//!                                ├─ Contract::execute ─▶ call / delegate_call / static_call ...
//!                                └─ on error: restore checkpoint
//! ```
//!
//! Each frame either completes or leaves the world exactly as it found it,
//! which gives every entry point all-or-nothing semantics without any
//! component having to undo its own writes.

use std::sync::Arc;

use alloy_sol_types::{SolCall, SolType, SolValue};
use atomatch_types::{
    Address, AtomatchError, B256, Bytes, ChainConfig, Event, Log, Result, U256,
    constants::MAX_CALL_DEPTH, keccak256,
};
use chrono::Utc;

use crate::{
    Code, Contract, Frame, OrderPredicate, PredicateContext, Slot, WorldState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Call,
    Delegate,
    Static,
}

/// Accounts, code, storage, clock, and the call machinery over them.
#[derive(Debug)]
pub struct Chain {
    state: WorldState,
    chain_id: u64,
    timestamp: u64,
    depth: usize,
    static_depth: usize,
}

impl Default for Chain {
    fn default() -> Self {
        Self::new(&ChainConfig::default())
    }
}

impl Chain {
    #[must_use]
    pub fn new(config: &ChainConfig) -> Self {
        let timestamp = config
            .genesis_timestamp
            .unwrap_or_else(|| u64::try_from(Utc::now().timestamp()).unwrap_or_default());
        Self {
            state: WorldState::new(),
            chain_id: config.chain_id,
            timestamp,
            depth: 0,
            static_depth: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Environment
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Current block timestamp in seconds.
    #[must_use]
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: u64) {
        self.timestamp = timestamp;
    }

    pub fn advance_time(&mut self, seconds: u64) {
        self.timestamp = self.timestamp.saturating_add(seconds);
    }

    #[must_use]
    pub fn state(&self) -> &WorldState {
        &self.state
    }

    #[must_use]
    pub fn has_code(&self, address: Address) -> bool {
        self.state.has_code(address)
    }

    #[must_use]
    pub fn balance(&self, address: Address) -> U256 {
        self.state.balance(address)
    }

    /// Credit native balance out of thin air (genesis allocation).
    pub fn fund(&mut self, address: Address, amount: U256) {
        let account = self.state.account_mut(address);
        account.balance = account.balance.saturating_add(amount);
    }

    #[must_use]
    pub fn logs(&self) -> &[Log] {
        self.state.logs()
    }

    /// Events emitted by `emitter`, oldest first.
    pub fn events_from(&self, emitter: Address) -> impl Iterator<Item = &Event> {
        self.state
            .logs()
            .iter()
            .filter(move |log| log.emitter == emitter)
            .map(|log| &log.event)
    }

    /// `true` while any enclosing frame is a static call.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.static_depth > 0
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.is_static() {
            Err(AtomatchError::StaticCallViolation)
        } else {
            Ok(())
        }
    }

    // -----------------------------------------------------------------------
    // Storage and events
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn sload(&self, address: Address, slot: Slot) -> B256 {
        self.state.sload(address, slot)
    }

    #[must_use]
    pub fn load_u256(&self, address: Address, slot: Slot) -> U256 {
        self.state.load_u256(address, slot)
    }

    #[must_use]
    pub fn load_address(&self, address: Address, slot: Slot) -> Address {
        self.state.load_address(address, slot)
    }

    #[must_use]
    pub fn load_bool(&self, address: Address, slot: Slot) -> bool {
        self.state.load_bool(address, slot)
    }

    pub fn sstore(&mut self, address: Address, slot: Slot, value: B256) -> Result<()> {
        self.ensure_mutable()?;
        self.state.sstore(address, slot, value);
        Ok(())
    }

    pub fn store_u256(&mut self, address: Address, slot: Slot, value: U256) -> Result<()> {
        self.sstore(address, slot, B256::from(value.to_be_bytes::<32>()))
    }

    pub fn store_address(&mut self, address: Address, slot: Slot, value: Address) -> Result<()> {
        self.sstore(address, slot, value.into_word())
    }

    pub fn store_bool(&mut self, address: Address, slot: Slot, value: bool) -> Result<()> {
        let word = if value {
            B256::with_last_byte(1)
        } else {
            B256::ZERO
        };
        self.sstore(address, slot, word)
    }

    pub fn emit(&mut self, emitter: Address, event: Event) -> Result<()> {
        self.ensure_mutable()?;
        tracing::debug!(emitter = %emitter, event = event.name(), "Event emitted");
        self.state.push_log(Log { emitter, event });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Deployment
    // -----------------------------------------------------------------------

    /// Install `code` at a fresh address derived from the deployer and its
    /// nonce, then run the constructor. A failing constructor leaves no
    /// account behind.
    pub fn deploy(&mut self, deployer: Address, code: Code) -> Result<Address> {
        self.ensure_mutable()?;
        if self.depth >= MAX_CALL_DEPTH {
            return Err(AtomatchError::CallDepthExceeded(MAX_CALL_DEPTH));
        }
        let checkpoint = self.state.clone();

        let deployer_account = self.state.account_mut(deployer);
        let nonce = deployer_account.nonce;
        deployer_account.nonce += 1;
        let address = derive_address(deployer, nonce);
        if self.state.has_code(address) {
            self.state = checkpoint;
            return Err(AtomatchError::Internal(format!(
                "address collision deploying at {address}"
            )));
        }
        self.state.account_mut(address).code = Some(code.clone());

        let constructed = match &code {
            Code::Contract(contract) => {
                let frame = Frame {
                    address,
                    code_address: address,
                    caller: deployer,
                    value: U256::ZERO,
                    input: Bytes::new(),
                };
                self.depth += 1;
                let result = contract.construct(self, &frame);
                self.depth -= 1;
                result
            }
            Code::Predicate(_) => Ok(()),
        };

        match constructed {
            Ok(()) => {
                tracing::debug!(
                    deployer = %deployer,
                    address = %address,
                    code = code.name(),
                    "Code deployed"
                );
                Ok(address)
            }
            Err(err) => {
                self.state = checkpoint;
                Err(err)
            }
        }
    }

    pub fn deploy_contract<C: Contract + 'static>(
        &mut self,
        deployer: Address,
        contract: C,
    ) -> Result<Address> {
        self.deploy(deployer, Code::Contract(Arc::new(contract)))
    }

    pub fn deploy_predicate<P: OrderPredicate + 'static>(
        &mut self,
        deployer: Address,
        predicate: P,
    ) -> Result<Address> {
        self.deploy(deployer, Code::Predicate(Arc::new(predicate)))
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    /// Top-level entry point: an externally-owned account sends a message.
    pub fn transact(
        &mut self,
        from: Address,
        to: Address,
        value: U256,
        input: &[u8],
    ) -> Result<Bytes> {
        if self.depth != 0 {
            return Err(AtomatchError::Internal(
                "transact called from inside a frame".into(),
            ));
        }
        let result = self.call(from, to, value, input);
        if let Err(err) = &result {
            tracing::warn!(from = %from, to = %to, error = %err, "Transaction reverted");
        }
        result
    }

    /// Convenience wrapper around [`Self::transact`] for `sol!` calls.
    pub fn transact_sol<C: SolCall>(&mut self, from: Address, to: Address, call: &C) -> Result<Bytes> {
        self.transact(from, to, U256::ZERO, &call.abi_encode())
    }

    /// Message call: `target`'s code runs on `target`'s storage with
    /// `msg.sender = caller`.
    pub fn call(
        &mut self,
        caller: Address,
        target: Address,
        value: U256,
        input: &[u8],
    ) -> Result<Bytes> {
        let frame = Frame {
            address: target,
            code_address: target,
            caller,
            value,
            input: Bytes::copy_from_slice(input),
        };
        self.run_frame(&frame, FrameKind::Call)
    }

    pub fn call_sol<C: SolCall>(&mut self, caller: Address, target: Address, call: &C) -> Result<Bytes> {
        self.call(caller, target, U256::ZERO, &call.abi_encode())
    }

    /// Delegate call: `target`'s code runs on the current frame's storage,
    /// keeping the current `msg.sender` and `msg.value`.
    pub fn delegate_call(&mut self, current: &Frame, target: Address, input: &[u8]) -> Result<Bytes> {
        let frame = Frame {
            address: current.address,
            code_address: target,
            caller: current.caller,
            value: current.value,
            input: Bytes::copy_from_slice(input),
        };
        self.run_frame(&frame, FrameKind::Delegate)
    }

    /// Read-only call: any storage write, event, deployment or value
    /// transfer inside fails with [`AtomatchError::StaticCallViolation`].
    pub fn static_call(&mut self, caller: Address, target: Address, input: &[u8]) -> Result<Bytes> {
        let frame = Frame {
            address: target,
            code_address: target,
            caller,
            value: U256::ZERO,
            input: Bytes::copy_from_slice(input),
        };
        self.run_frame(&frame, FrameKind::Static)
    }

    /// Static-call a view function and decode its single return value.
    pub fn view<C, R>(&mut self, caller: Address, target: Address, call: &C) -> Result<R>
    where
        C: SolCall,
        R: SolValue + From<<<R as SolValue>::SolType as SolType>::RustType>,
    {
        let output = self.static_call(caller, target, &call.abi_encode())?;
        decode_return(&output)
    }

    /// Evaluate the predicate deployed at `target` against a read-only
    /// borrow of the world state.
    pub fn evaluate_predicate(&self, target: Address, ctx: &PredicateContext<'_>) -> Result<U256> {
        match self.state.code(target) {
            Some(Code::Predicate(predicate)) => predicate.evaluate(&self.state, ctx),
            _ => Err(AtomatchError::PredicateNotFound { target }),
        }
    }

    fn run_frame(&mut self, frame: &Frame, kind: FrameKind) -> Result<Bytes> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(AtomatchError::CallDepthExceeded(MAX_CALL_DEPTH));
        }
        let checkpoint = self.state.clone();

        self.depth += 1;
        if kind == FrameKind::Static {
            self.static_depth += 1;
        }
        let result = self.enter(frame, kind);
        if kind == FrameKind::Static {
            self.static_depth -= 1;
        }
        self.depth -= 1;

        if let Err(err) = &result {
            tracing::debug!(
                code = %frame.code_address,
                caller = %frame.caller,
                depth = self.depth,
                error = %err,
                "Frame reverted"
            );
            self.state = checkpoint;
        }
        result
    }

    fn enter(&mut self, frame: &Frame, kind: FrameKind) -> Result<Bytes> {
        if kind != FrameKind::Delegate && !frame.value.is_zero() {
            self.move_value(frame.caller, frame.address, frame.value)?;
        }
        match self.state.code(frame.code_address).cloned() {
            // Calls to accounts without code succeed and return nothing.
            None => Ok(Bytes::new()),
            Some(Code::Contract(contract)) => contract.execute(self, frame),
            Some(Code::Predicate(predicate)) => Err(AtomatchError::revert(format!(
                "{} at {} is a static predicate and cannot be called",
                predicate.name(),
                frame.code_address
            ))),
        }
    }

    fn move_value(&mut self, from: Address, to: Address, value: U256) -> Result<()> {
        self.ensure_mutable()?;
        let available = self.state.balance(from);
        if available < value {
            return Err(AtomatchError::InsufficientNativeBalance {
                needed: value,
                available,
            });
        }
        self.state.account_mut(from).balance -= value;
        self.state.account_mut(to).balance += value;
        Ok(())
    }
}

/// Decode a single ABI-encoded return value.
pub fn decode_return<R>(output: &[u8]) -> Result<R>
where
    R: SolValue + From<<<R as SolValue>::SolType as SolType>::RustType>,
{
    Ok(R::abi_decode(output)?)
}

/// `keccak256(deployer || nonce)[12..]`.
#[must_use]
pub fn derive_address(deployer: Address, nonce: u64) -> Address {
    let mut buf = Vec::with_capacity(28);
    buf.extend_from_slice(deployer.as_slice());
    buf.extend_from_slice(&nonce.to_be_bytes());
    Address::from_slice(&keccak256(buf)[12..])
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Input byte 0: 1 = write then succeed, 2 = write then fail,
    /// 3 = call the address in bytes 1..21 then fail, 4 = recurse forever.
    #[derive(Debug)]
    struct Probe;

    fn counter() -> Slot {
        Slot::named("probe.counter")
    }

    impl Contract for Probe {
        fn name(&self) -> &'static str {
            "Probe"
        }

        fn execute(&self, chain: &mut Chain, frame: &Frame) -> Result<Bytes> {
            let next = chain.load_u256(frame.address, counter()) + U256::from(1);
            match frame.input.first() {
                Some(1) => {
                    chain.store_u256(frame.address, counter(), next)?;
                    Ok(Bytes::new())
                }
                Some(2) => {
                    chain.store_u256(frame.address, counter(), next)?;
                    Err(AtomatchError::revert("probe failure"))
                }
                Some(3) => {
                    let inner = Address::from_slice(&frame.input[1..21]);
                    chain.call(frame.address, inner, U256::ZERO, &[1])?;
                    Err(AtomatchError::revert("outer failure"))
                }
                Some(4) => chain.call(frame.address, frame.address, U256::ZERO, &[4]),
                _ => Ok(Bytes::new()),
            }
        }
    }

    fn setup() -> (Chain, Address, Address) {
        let mut chain = Chain::new(&ChainConfig {
            chain_id: 1,
            genesis_timestamp: Some(1_000),
        });
        let deployer = Address::repeat_byte(0xde);
        let probe = chain.deploy_contract(deployer, Probe).unwrap();
        (chain, deployer, probe)
    }

    #[test]
    fn genesis_clock_and_chain_id() {
        let (mut chain, _, _) = setup();
        assert_eq!(chain.timestamp(), 1_000);
        assert_eq!(chain.chain_id(), 1);
        chain.advance_time(5);
        assert_eq!(chain.timestamp(), 1_005);
    }

    #[test]
    fn deploy_addresses_are_unique_and_have_code() {
        let (mut chain, deployer, probe) = setup();
        let second = chain.deploy_contract(deployer, Probe).unwrap();
        assert_ne!(probe, second);
        assert!(chain.has_code(probe));
        assert!(chain.has_code(second));
        assert_eq!(derive_address(deployer, 0), probe);
        assert_eq!(derive_address(deployer, 1), second);
    }

    #[test]
    fn successful_frame_persists() {
        let (mut chain, user, probe) = setup();
        chain.transact(user, probe, U256::ZERO, &[1]).unwrap();
        assert_eq!(chain.load_u256(probe, counter()), U256::from(1));
    }

    #[test]
    fn failed_frame_rolls_back_its_writes() {
        let (mut chain, user, probe) = setup();
        let err = chain.transact(user, probe, U256::ZERO, &[2]).unwrap_err();
        assert!(matches!(err, AtomatchError::Reverted { .. }));
        assert_eq!(chain.load_u256(probe, counter()), U256::ZERO);
    }

    #[test]
    fn outer_failure_rolls_back_successful_inner_call() {
        let (mut chain, user, probe) = setup();
        let inner = chain.deploy_contract(user, Probe).unwrap();
        let mut input = vec![3u8];
        input.extend_from_slice(inner.as_slice());
        assert!(chain.transact(user, probe, U256::ZERO, &input).is_err());
        assert_eq!(chain.load_u256(inner, counter()), U256::ZERO);
    }

    #[test]
    fn static_call_rejects_writes() {
        let (mut chain, user, probe) = setup();
        let err = chain.static_call(user, probe, &[1]).unwrap_err();
        assert!(matches!(err, AtomatchError::StaticCallViolation));
        assert!(!chain.is_static());
        // Reads are fine.
        chain.static_call(user, probe, &[0]).unwrap();
    }

    #[test]
    fn value_moves_with_calls_and_reverts_with_them() {
        let (mut chain, user, probe) = setup();
        chain.fund(user, U256::from(100));
        chain.transact(user, probe, U256::from(40), &[1]).unwrap();
        assert_eq!(chain.balance(user), U256::from(60));
        assert_eq!(chain.balance(probe), U256::from(40));

        assert!(chain.transact(user, probe, U256::from(10), &[2]).is_err());
        assert_eq!(chain.balance(user), U256::from(60));

        let err = chain.transact(user, probe, U256::from(1_000), &[1]).unwrap_err();
        assert!(matches!(err, AtomatchError::InsufficientNativeBalance { .. }));
    }

    #[test]
    fn calls_to_plain_accounts_succeed_empty() {
        let (mut chain, user, _) = setup();
        let out = chain
            .transact(user, Address::repeat_byte(0x77), U256::ZERO, &[1, 2, 3])
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn unbounded_recursion_hits_depth_limit() {
        let handle = std::thread::Builder::new()
            .stack_size(256 * 1024 * 1024)
            .spawn(|| {
                let (mut chain, user, probe) = setup();
                chain.transact(user, probe, U256::ZERO, &[4]).unwrap_err()
            })
            .unwrap();
        let err = handle.join().unwrap();
        assert!(matches!(err, AtomatchError::CallDepthExceeded(_)));
    }

    #[test]
    fn missing_predicate_is_reported() {
        let (chain, _, probe) = setup();
        let order = atomatch_types::Order::dummy(Address::ZERO, Address::ZERO, probe);
        let call = atomatch_types::Call::new(
            Address::ZERO,
            atomatch_types::HowToCall::Call,
            Bytes::new(),
        );
        let ctx = PredicateContext {
            selector: atomatch_types::Selector::ZERO,
            extradata: &[],
            order: &order,
            call: &call,
            counter_order: &order,
            counter_call: &call,
            matcher: Address::ZERO,
            previous_fill: U256::ZERO,
            counter_previous_fill: U256::ZERO,
            timestamp: 0,
        };
        assert!(matches!(
            chain.evaluate_predicate(probe, &ctx),
            Err(AtomatchError::PredicateNotFound { .. })
        ));
    }
}
