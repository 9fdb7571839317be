//! Frame semantics seen from outside the crate: who is `msg.sender`,
//! whose storage is written, and what survives a failure.

use atomatch_chain::{Chain, Contract, Frame, Slot};
use atomatch_types::{Address, AtomatchError, Bytes, ChainConfig, Result, U256};

fn last_caller() -> Slot {
    Slot::named("test.last_caller")
}

/// Records `msg.sender` in the storage it runs against.
#[derive(Debug)]
struct Recorder;

impl Contract for Recorder {
    fn name(&self) -> &'static str {
        "Recorder"
    }

    fn execute(&self, chain: &mut Chain, frame: &Frame) -> Result<Bytes> {
        chain.store_address(frame.address, last_caller(), frame.caller)?;
        Ok(Bytes::new())
    }
}

/// Input byte 0 selects: 0 = call, 1 = delegatecall, 2 = staticcall the
/// recorder.
#[derive(Debug)]
struct Caller {
    recorder: Address,
}

impl Contract for Caller {
    fn name(&self) -> &'static str {
        "Caller"
    }

    fn execute(&self, chain: &mut Chain, frame: &Frame) -> Result<Bytes> {
        match frame.input.first() {
            Some(0) => chain.call(frame.address, self.recorder, U256::ZERO, &[]),
            Some(1) => chain.delegate_call(frame, self.recorder, &[]),
            Some(2) => chain.static_call(frame.address, self.recorder, &[]),
            _ => Err(AtomatchError::revert("bad mode")),
        }
    }
}

/// Deploys a recorder from inside its own frame.
#[derive(Debug)]
struct Factory;

impl Contract for Factory {
    fn name(&self) -> &'static str {
        "Factory"
    }

    fn execute(&self, chain: &mut Chain, frame: &Frame) -> Result<Bytes> {
        let child = chain.deploy_contract(frame.address, Recorder)?;
        if frame.input.first() == Some(&1) {
            return Err(AtomatchError::revert("abandon child"));
        }
        Ok(Bytes::copy_from_slice(child.as_slice()))
    }
}

struct Setup {
    chain: Chain,
    eoa: Address,
    recorder: Address,
    caller: Address,
}

fn setup() -> Setup {
    let mut chain = Chain::new(&ChainConfig {
        chain_id: 1,
        genesis_timestamp: Some(0),
    });
    let eoa = Address::repeat_byte(0xe0);
    let recorder = chain.deploy_contract(eoa, Recorder).unwrap();
    let caller = chain.deploy_contract(eoa, Caller { recorder }).unwrap();
    Setup {
        chain,
        eoa,
        recorder,
        caller,
    }
}

#[test]
fn call_runs_on_callee_storage_with_caller_as_sender() {
    let mut s = setup();
    s.chain.transact(s.eoa, s.caller, U256::ZERO, &[0]).unwrap();
    assert_eq!(s.chain.load_address(s.recorder, last_caller()), s.caller);
    assert!(s.chain.load_address(s.caller, last_caller()).is_zero());
}

#[test]
fn delegate_call_runs_on_own_storage_and_keeps_sender() {
    let mut s = setup();
    s.chain.transact(s.eoa, s.caller, U256::ZERO, &[1]).unwrap();
    assert_eq!(s.chain.load_address(s.caller, last_caller()), s.eoa);
    assert!(s.chain.load_address(s.recorder, last_caller()).is_zero());
}

#[test]
fn static_call_cannot_write() {
    let mut s = setup();
    let err = s.chain.transact(s.eoa, s.caller, U256::ZERO, &[2]).unwrap_err();
    assert!(matches!(err, AtomatchError::StaticCallViolation));
}

#[test]
fn contracts_can_deploy_and_failed_deploys_vanish() {
    let mut s = setup();
    let factory = s.chain.deploy_contract(s.eoa, Factory).unwrap();
    let out = s.chain.transact(s.eoa, factory, U256::ZERO, &[0]).unwrap();
    let child = Address::from_slice(&out);
    assert!(s.chain.has_code(child));
    assert_eq!(child, atomatch_chain::derive_address(factory, 0));

    assert!(s.chain.transact(s.eoa, factory, U256::ZERO, &[1]).is_err());
    // The nonce bump was rolled back with the abandoned child.
    assert!(!s.chain.has_code(atomatch_chain::derive_address(factory, 1)));
    let out = s.chain.transact(s.eoa, factory, U256::ZERO, &[0]).unwrap();
    assert_eq!(Address::from_slice(&out), atomatch_chain::derive_address(factory, 1));
}
