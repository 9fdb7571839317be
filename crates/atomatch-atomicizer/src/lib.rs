//! # atomatch-atomicizer
//!
//! Runs a batch of calls in order and reverts all of them if any one
//! fails. Meant to be delegatecalled by a proxy, so the calls originate
//! from the proxy; called directly, they originate from the atomicizer.

use alloy_sol_types::SolCall;
use atomatch_chain::{Chain, Contract, Frame, dispatch};
use atomatch_types::{
    Address, AtomatchError, Bytes, Result, U256,
    abi::IAtomicizer::{self, IAtomicizerCalls},
};
use tracing::debug;

#[derive(Debug, Default, Clone, Copy)]
pub struct Atomicizer;

impl Atomicizer {
    /// Execute `targets[i]` with `values[i]` and `calldatas[i]` from
    /// `frame.address`, in order.
    pub fn atomicize(
        chain: &mut Chain,
        frame: &Frame,
        targets: &[Address],
        values: &[U256],
        calldatas: &[Bytes],
    ) -> Result<()> {
        if targets.len() != values.len() || targets.len() != calldatas.len() {
            return Err(AtomatchError::LengthsMismatch {
                targets: targets.len(),
                values: values.len(),
                calldatas: calldatas.len(),
            });
        }
        for (index, ((target, value), data)) in targets.iter().zip(values).zip(calldatas).enumerate() {
            chain
                .call(frame.address, *target, *value, data)
                .map_err(|source| AtomatchError::SubcallFailed {
                    index,
                    source: Box::new(source),
                })?;
        }
        debug!(origin = %frame.address, calls = targets.len(), "Batch executed");
        Ok(())
    }
}

impl Contract for Atomicizer {
    fn name(&self) -> &'static str {
        "Atomicizer"
    }

    fn execute(&self, chain: &mut Chain, frame: &Frame) -> Result<Bytes> {
        match dispatch::<IAtomicizerCalls>(self.name(), &frame.input)? {
            IAtomicizerCalls::atomicize(call) => {
                Self::atomicize(chain, frame, &call.targets, &call.values, &call.calldatas)?;
                Ok(Bytes::new())
            }
        }
    }
}

/// Calldata for `atomicize(targets, values, calldatas)`.
#[must_use]
pub fn encode_batch(calls: &[(Address, U256, Bytes)]) -> Bytes {
    IAtomicizer::atomicizeCall {
        targets: calls.iter().map(|c| c.0).collect(),
        values: calls.iter().map(|c| c.1).collect(),
        calldatas: calls.iter().map(|c| c.2.clone()).collect(),
    }
    .abi_encode()
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use atomatch_chain::mocks::{Reverter, TestErc20, erc20_balance};
    use atomatch_types::{
        ChainConfig,
        abi::{IERC20, ITestToken},
    };

    fn transfer(to: Address, amount: u64) -> Bytes {
        IERC20::transferCall {
            to,
            amount: U256::from(amount),
        }
        .abi_encode()
        .into()
    }

    #[test]
    fn direct_batch_runs_from_atomicizer() {
        let mut chain = Chain::new(&ChainConfig::default());
        let user = Address::repeat_byte(0x01);
        let atomicizer = chain.deploy_contract(user, Atomicizer).unwrap();
        let token = chain.deploy_contract(user, TestErc20).unwrap();
        chain
            .transact_sol(user, token, &ITestToken::mintCall { to: atomicizer, amountOrId: U256::from(10) })
            .unwrap();

        let a = Address::repeat_byte(0xaa);
        let b = Address::repeat_byte(0xbb);
        let batch = encode_batch(&[(token, U256::ZERO, transfer(a, 3)), (token, U256::ZERO, transfer(b, 4))]);
        chain.transact(user, atomicizer, U256::ZERO, &batch).unwrap();
        assert_eq!(erc20_balance(&mut chain, token, a).unwrap(), U256::from(3));
        assert_eq!(erc20_balance(&mut chain, token, b).unwrap(), U256::from(4));
    }

    #[test]
    fn failing_middle_call_reverts_batch() {
        let mut chain = Chain::new(&ChainConfig::default());
        let user = Address::repeat_byte(0x01);
        let atomicizer = chain.deploy_contract(user, Atomicizer).unwrap();
        let token = chain.deploy_contract(user, TestErc20).unwrap();
        let reverter = chain.deploy_contract(user, Reverter).unwrap();
        chain
            .transact_sol(user, token, &ITestToken::mintCall { to: atomicizer, amountOrId: U256::from(10) })
            .unwrap();

        let a = Address::repeat_byte(0xaa);
        let batch = encode_batch(&[
            (token, U256::ZERO, transfer(a, 3)),
            (reverter, U256::ZERO, Bytes::new()),
            (token, U256::ZERO, transfer(a, 3)),
        ]);
        let err = chain.transact(user, atomicizer, U256::ZERO, &batch).unwrap_err();
        assert!(matches!(err, AtomatchError::SubcallFailed { index: 1, .. }));
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(erc20_balance(&mut chain, token, a).unwrap(), U256::ZERO);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let mut chain = Chain::new(&ChainConfig::default());
        let user = Address::repeat_byte(0x01);
        let atomicizer = chain.deploy_contract(user, Atomicizer).unwrap();
        let call = IAtomicizer::atomicizeCall {
            targets: vec![Address::repeat_byte(2); 2],
            values: vec![U256::ZERO],
            calldatas: vec![Bytes::new(); 2],
        };
        assert!(matches!(
            chain.transact_sol(user, atomicizer, &call),
            Err(AtomatchError::LengthsMismatch {
                targets: 2,
                values: 1,
                calldatas: 2
            })
        ));
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let mut chain = Chain::new(&ChainConfig::default());
        let user = Address::repeat_byte(0x01);
        let atomicizer = chain.deploy_contract(user, Atomicizer).unwrap();
        chain.transact(user, atomicizer, U256::ZERO, &encode_batch(&[])).unwrap();
    }
}
