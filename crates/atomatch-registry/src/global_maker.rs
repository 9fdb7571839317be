//! # GlobalMaker
//!
//! Lets many makers share one proxy. Makers approve their assets to the
//! adapter's proxy once; an authenticated exchange then calls
//! `executeFor(maker, target, howToCall, data)` and the adapter forwards the
//! call only after proving, from the calldata itself, that it moves assets
//! of `maker` and nobody else.
//!
//! ## Decode table
//!
//! ```text
//! selector ─▶ MakerField { kind, offset }
//!
//! calldata: [ selector | word @4 | word @36 | ... ]
//!                          ▲
//!                          └── maker address read at `offset`
//! ```
//!
//! The table is fixed at deployment and validated then, so a bad offset
//! never reaches a live call.

use std::collections::HashMap;

use alloy_sol_types::SolCall;
use atomatch_chain::{Chain, Contract, Frame, Slot, decode_return, dispatch, returns};
use atomatch_types::{
    Address, AtomatchError, Bytes, GlobalMakerConfig, HowToCall, MessageKind, Result, Selector,
    U256,
    abi::{IAtomicizer, IGlobalMaker, IProxy, IRegistry},
    constants::ABI_WORD,
};
use tracing::{debug, info};

use crate::registry::is_authenticated;

fn proxy_slot() -> Slot {
    Slot::named("global_maker.proxy")
}

/// Where the maker sits in calldata of one whitelisted function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MakerField {
    pub kind: MessageKind,
    pub offset: usize,
}

/// Validated `selector -> MakerField` table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeTable {
    fields: HashMap<Selector, MakerField>,
}

impl DecodeTable {
    pub fn from_config(config: &GlobalMakerConfig) -> Result<Self> {
        config.validate()?;
        let fields = config
            .entries
            .iter()
            .map(|e| {
                (
                    e.selector,
                    MakerField {
                        kind: e.kind,
                        offset: e.offset,
                    },
                )
            })
            .collect();
        Ok(Self { fields })
    }

    #[must_use]
    pub fn field(&self, selector: Selector) -> Option<MakerField> {
        self.fields.get(&selector).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The maker named by `calldata`.
    pub fn maker_of(&self, calldata: &[u8]) -> Result<Address> {
        let selector = atomatch_types::abi::selector_of(calldata)?;
        let field = self
            .field(selector)
            .ok_or(AtomatchError::UnknownSelector { selector })?;
        let word = calldata
            .get(field.offset..field.offset + ABI_WORD)
            .ok_or_else(|| AtomatchError::MalformedCalldata {
                reason: format!(
                    "{} calldata of {} bytes has no word at offset {}",
                    field.kind,
                    calldata.len(),
                    field.offset
                ),
            })?;
        if word[..12].iter().any(|b| *b != 0) {
            return Err(AtomatchError::MalformedCalldata {
                reason: format!("dirty address word at offset {}", field.offset),
            });
        }
        Ok(Address::from_slice(&word[12..]))
    }

    /// Fails unless `calldata` is a whitelisted call naming `maker`.
    pub fn check_call(&self, maker: Address, calldata: &[u8]) -> Result<()> {
        let found = self.maker_of(calldata)?;
        if found == maker {
            Ok(())
        } else {
            Err(AtomatchError::MakerMismatch {
                expected: maker,
                found,
            })
        }
    }
}

/// The adapter contract. `registry` and `atomicizer` are immutables.
#[derive(Debug, Clone)]
pub struct GlobalMaker {
    pub registry: Address,
    pub atomicizer: Address,
    pub table: DecodeTable,
}

impl GlobalMaker {
    pub fn new(registry: Address, atomicizer: Address, config: &GlobalMakerConfig) -> Result<Self> {
        if registry.is_zero() || atomicizer.is_zero() {
            return Err(AtomatchError::ZeroAddress);
        }
        Ok(Self {
            registry,
            atomicizer,
            table: DecodeTable::from_config(config)?,
        })
    }

    /// Check a forwarded call before it reaches the shared proxy.
    pub fn validate(&self, maker: Address, target: Address, how_to_call: HowToCall, data: &[u8]) -> Result<()> {
        match how_to_call {
            HowToCall::Call => self.table.check_call(maker, data),
            HowToCall::DelegateCall => {
                if target != self.atomicizer {
                    return Err(AtomatchError::UnsupportedCallMode {
                        reason: format!("delegatecall to {target}, only the atomicizer is allowed"),
                    });
                }
                let selector = atomatch_types::abi::selector_of(data)?;
                if selector != Selector::from(IAtomicizer::atomicizeCall::SELECTOR) {
                    return Err(AtomatchError::UnknownSelector { selector });
                }
                let batch = IAtomicizer::atomicizeCall::abi_decode(data)?;
                if batch.targets.len() != batch.values.len() || batch.targets.len() != batch.calldatas.len() {
                    return Err(AtomatchError::LengthsMismatch {
                        targets: batch.targets.len(),
                        values: batch.values.len(),
                        calldatas: batch.calldatas.len(),
                    });
                }
                for (index, (value, calldata)) in batch.values.iter().zip(&batch.calldatas).enumerate() {
                    if !value.is_zero() {
                        return Err(AtomatchError::UnsupportedCallMode {
                            reason: format!("sub-call {index} carries value {value}"),
                        });
                    }
                    self.table.check_call(maker, calldata)?;
                }
                Ok(())
            }
        }
    }
}

impl Contract for GlobalMaker {
    fn name(&self) -> &'static str {
        "GlobalMaker"
    }

    fn construct(&self, chain: &mut Chain, frame: &Frame) -> Result<()> {
        let output = chain.call_sol(frame.address, self.registry, &IRegistry::registerProxyCall {})?;
        let proxy: Address = decode_return(&output)?;
        chain.store_address(frame.address, proxy_slot(), proxy)?;
        info!(
            global_maker = %frame.address,
            proxy = %proxy,
            selectors = self.table.len(),
            "GlobalMaker deployed"
        );
        Ok(())
    }

    fn execute(&self, chain: &mut Chain, frame: &Frame) -> Result<Bytes> {
        use IGlobalMaker::IGlobalMakerCalls as Calls;

        let this = frame.address;
        match dispatch::<Calls>(self.name(), &frame.input)? {
            Calls::executeFor(call) => {
                if !is_authenticated(chain, this, self.registry, frame.caller)? {
                    return Err(AtomatchError::Unauthorized {
                        caller: frame.caller,
                    });
                }
                let how_to_call = HowToCall::try_from(call.howToCall)?;
                self.validate(call.maker, call.target, how_to_call, &call.data)?;
                debug!(
                    maker = %call.maker,
                    target = %call.target,
                    how = %how_to_call,
                    "GlobalMaker forwarding"
                );
                let proxy = chain.load_address(this, proxy_slot());
                let output = chain.call_sol(
                    this,
                    proxy,
                    &IProxy::executeCall {
                        target: call.target,
                        howToCall: call.howToCall,
                        data: call.data,
                    },
                )?;
                let result: Bytes = decode_return(&output)?;
                Ok(returns(&result))
            }
            Calls::proxy(_) => Ok(returns(&chain.load_address(this, proxy_slot()))),
            Calls::makerOffset(call) => {
                let offset = self
                    .table
                    .field(call.selector)
                    .map_or(U256::ZERO, |f| U256::from(f.offset));
                Ok(returns(&offset))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atomatch_types::{
        MakerFieldConfig,
        abi::{IERC20, IERC721},
    };

    fn table() -> DecodeTable {
        DecodeTable::from_config(&GlobalMakerConfig::default()).unwrap()
    }

    fn transfer_from(from: Address) -> Vec<u8> {
        IERC20::transferFromCall {
            from,
            to: Address::repeat_byte(2),
            amount: U256::from(5),
        }
        .abi_encode()
    }

    #[test]
    fn reads_maker_from_first_argument() {
        let maker = Address::repeat_byte(0xaa);
        assert_eq!(table().maker_of(&transfer_from(maker)).unwrap(), maker);

        let safe = IERC721::safeTransferFrom_1Call {
            from: maker,
            to: Address::repeat_byte(2),
            tokenId: U256::from(1),
            data: Bytes::from_static(b"hello"),
        }
        .abi_encode();
        assert_eq!(table().maker_of(&safe).unwrap(), maker);
    }

    #[test]
    fn unknown_selector_is_rejected() {
        let data = IERC20::transferCall {
            to: Address::repeat_byte(2),
            amount: U256::from(1),
        }
        .abi_encode();
        assert!(matches!(
            table().maker_of(&data),
            Err(AtomatchError::UnknownSelector { .. })
        ));
    }

    #[test]
    fn short_or_dirty_calldata_is_malformed() {
        let data = transfer_from(Address::repeat_byte(0xaa));
        assert!(matches!(
            table().maker_of(&data[..20]),
            Err(AtomatchError::MalformedCalldata { .. })
        ));
        let mut dirty = data;
        dirty[4] = 0x01;
        assert!(matches!(
            table().maker_of(&dirty),
            Err(AtomatchError::MalformedCalldata { .. })
        ));
    }

    #[test]
    fn mismatched_maker_is_rejected() {
        let data = transfer_from(Address::repeat_byte(0xbb));
        assert!(matches!(
            table().check_call(Address::repeat_byte(0xaa), &data),
            Err(AtomatchError::MakerMismatch { .. })
        ));
    }

    #[test]
    fn custom_offsets_are_honoured() {
        // Maker in the second argument.
        let config = GlobalMakerConfig {
            entries: vec![MakerFieldConfig {
                kind: MessageKind::Custom,
                selector: IERC20::transferFromCall::SELECTOR.into(),
                offset: 36,
            }],
        };
        let table = DecodeTable::from_config(&config).unwrap();
        let data = IERC20::transferFromCall {
            from: Address::repeat_byte(1),
            to: Address::repeat_byte(0xcc),
            amount: U256::from(1),
        }
        .abi_encode();
        assert_eq!(table.maker_of(&data).unwrap(), Address::repeat_byte(0xcc));
    }

    #[test]
    fn delegatecall_only_to_atomicizer_without_value() {
        let atomicizer = Address::repeat_byte(0xa7);
        let gm = GlobalMaker::new(Address::repeat_byte(0x01), atomicizer, &GlobalMakerConfig::default()).unwrap();
        let maker = Address::repeat_byte(0xaa);
        let token = Address::repeat_byte(0x70);

        let batch = |values: Vec<U256>, from: Address| {
            IAtomicizer::atomicizeCall {
                targets: vec![token; values.len()],
                calldatas: vec![transfer_from(from).into(); values.len()],
                values,
            }
            .abi_encode()
        };

        gm.validate(maker, atomicizer, HowToCall::DelegateCall, &batch(vec![U256::ZERO; 2], maker))
            .unwrap();
        assert!(matches!(
            gm.validate(maker, token, HowToCall::DelegateCall, &batch(vec![U256::ZERO], maker)),
            Err(AtomatchError::UnsupportedCallMode { .. })
        ));
        assert!(matches!(
            gm.validate(maker, atomicizer, HowToCall::DelegateCall, &batch(vec![U256::from(1)], maker)),
            Err(AtomatchError::UnsupportedCallMode { .. })
        ));
        assert!(matches!(
            gm.validate(
                maker,
                atomicizer,
                HowToCall::DelegateCall,
                &batch(vec![U256::ZERO], Address::repeat_byte(0xbb))
            ),
            Err(AtomatchError::MakerMismatch { .. })
        ));
    }

    #[test]
    fn rejects_invalid_config() {
        let config = GlobalMakerConfig { entries: vec![] };
        assert!(matches!(
            GlobalMaker::new(Address::repeat_byte(1), Address::repeat_byte(2), &config),
            Err(AtomatchError::InvalidConfiguration(_))
        ));
    }
}
