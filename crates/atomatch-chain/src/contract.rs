//! The callable-component interface.

use std::fmt;

use alloy_sol_types::{SolCall, SolInterface, SolValue};
use atomatch_types::{Address, AtomatchError, Bytes, Result, Selector, U256, abi};

use crate::Chain;

/// Execution context of one call frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Account whose storage and balance the code acts on (`address(this)`).
    pub address: Address,
    /// Account whose code is running. Differs from `address` under
    /// delegate call.
    pub code_address: Address,
    /// Authenticated message origin (`msg.sender`).
    pub caller: Address,
    pub value: U256,
    pub input: Bytes,
}

impl Frame {
    /// The called function's selector.
    pub fn selector(&self) -> Result<Selector> {
        abi::selector_of(&self.input)
    }

    /// Decode the input as a call to `C`.
    pub fn decode<C: SolCall>(&self) -> Result<C> {
        Ok(C::abi_decode(&self.input)?)
    }
}

/// Decode calldata into one of the functions of interface `I`. Unknown
/// selectors fail with [`AtomatchError::FunctionNotFound`].
pub fn dispatch<I: SolInterface>(contract: &'static str, input: &[u8]) -> Result<I> {
    let selector = abi::selector_of(input)?;
    if !I::valid_selector(selector.0) {
        return Err(AtomatchError::FunctionNotFound { contract, selector });
    }
    Ok(I::abi_decode(input)?)
}

/// ABI-encode a single return value.
pub fn returns<T: SolValue>(value: &T) -> Bytes {
    value.abi_encode().into()
}

/// A component deployed at an address.
///
/// Implementations are code, not state: everything that must survive the
/// call lives in account storage reached through [`Chain`], so frames can
/// be rolled back and the same code can run under delegate call. Fields of
/// the implementing type play the role of constructor-time immutables.
pub trait Contract: Send + Sync + fmt::Debug {
    /// Human-readable name for logs and errors.
    fn name(&self) -> &'static str;

    /// Constructor hook, run once in a frame at the new address.
    fn construct(&self, _chain: &mut Chain, _frame: &Frame) -> Result<()> {
        Ok(())
    }

    /// Handle one call. Returning an error reverts the frame.
    fn execute(&self, chain: &mut Chain, frame: &Frame) -> Result<Bytes>;
}
