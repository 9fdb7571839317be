//! Order and settlement-call model.
//!
//! Orders are never stored whole: the exchange only persists state keyed by
//! `(maker, order.hash())`. The hash is the EIP-712 struct hash over every
//! field, so changing any field (the salt included) produces an unrelated
//! order with its own fill history.

use alloy_primitives::{Address, B256, Bytes, Selector, U256};
use alloy_sol_types::{SolStruct, SolValue};
use serde::{Deserialize, Serialize};

use crate::{AtomatchError, Result, abi};

/// How a proxy forwards a settlement call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum HowToCall {
    /// Plain call: the target runs in its own context, `msg.sender` is the proxy.
    Call = 0,
    /// Delegate call: the target's code runs in the proxy's context.
    DelegateCall = 1,
}

impl HowToCall {
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for HowToCall {
    type Error = AtomatchError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Call),
            1 => Ok(Self::DelegateCall),
            other => Err(AtomatchError::InvalidHowToCall(other)),
        }
    }
}

impl std::fmt::Display for HowToCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "CALL"),
            Self::DelegateCall => write!(f, "DELEGATECALL"),
        }
    }
}

/// Listing window and uniqueness salt, packed on the wire as
/// `abi.encode(listingTime, expirationTime, salt)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderExtra {
    /// First second at which the order may match.
    pub listing_time: U256,
    /// First second at which the order may no longer match.
    pub expiration_time: U256,
    /// Distinguishes otherwise identical orders.
    pub salt: U256,
}

impl OrderExtra {
    #[must_use]
    pub fn new(listing_time: u64, expiration_time: u64, salt: U256) -> Self {
        Self {
            listing_time: U256::from(listing_time),
            expiration_time: U256::from(expiration_time),
            salt,
        }
    }

    #[must_use]
    pub fn pack(&self) -> Bytes {
        (self.listing_time, self.expiration_time, self.salt)
            .abi_encode()
            .into()
    }

    pub fn unpack(data: &[u8]) -> Result<Self> {
        let (listing_time, expiration_time, salt) = <(U256, U256, U256)>::abi_decode(data)?;
        Ok(Self {
            listing_time,
            expiration_time,
            salt,
        })
    }

    /// `listingTime <= now < expirationTime`.
    #[must_use]
    pub fn is_live_at(&self, now: u64) -> bool {
        let now = U256::from(now);
        self.listing_time <= now && now < self.expiration_time
    }
}

/// A trade intent authored by `maker`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Registry whose proxies settle this order.
    pub registry: Address,
    /// Logical owner of the assets.
    pub maker: Address,
    /// Agent the settlement call is routed through; zero means the maker's
    /// own proxy.
    pub executer: Address,
    /// Address of the static predicate.
    pub static_target: Address,
    /// Predicate entry point.
    pub static_selector: Selector,
    /// Predicate parameters.
    pub static_extradata: Bytes,
    /// Largest cumulative fill this order can reach.
    pub maximum_fill: U256,
    pub extra: OrderExtra,
}

impl Order {
    /// The account whose proxy carries this order's settlement call.
    #[must_use]
    pub fn agent(&self) -> Address {
        if self.executer.is_zero() {
            self.maker
        } else {
            self.executer
        }
    }

    /// EIP-712 struct hash of the order. This is the key of the fill and
    /// approval ledgers.
    #[must_use]
    pub fn hash(&self) -> B256 {
        self.to_abi().eip712_hash_struct()
    }

    #[must_use]
    pub fn to_abi(&self) -> abi::Order {
        abi::Order {
            registry: self.registry,
            maker: self.maker,
            executer: self.executer,
            staticTarget: self.static_target,
            staticSelector: self.static_selector,
            staticExtradata: self.static_extradata.clone(),
            maximumFill: self.maximum_fill,
            extraData: self.extra.pack(),
        }
    }

    pub fn from_abi(order: &abi::Order) -> Result<Self> {
        Ok(Self {
            registry: order.registry,
            maker: order.maker,
            executer: order.executer,
            static_target: order.staticTarget,
            static_selector: order.staticSelector,
            static_extradata: order.staticExtradata.clone(),
            maximum_fill: order.maximumFill,
            extra: OrderExtra::unpack(&order.extraData)?,
        })
    }
}

/// A settlement call executed through the agent's proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub target: Address,
    pub how_to_call: HowToCall,
    pub data: Bytes,
}

impl Call {
    #[must_use]
    pub fn new(target: Address, how_to_call: HowToCall, data: impl Into<Bytes>) -> Self {
        Self {
            target,
            how_to_call,
            data: data.into(),
        }
    }

    /// Selector of the forwarded calldata.
    pub fn selector(&self) -> Result<Selector> {
        abi::selector_of(&self.data)
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    /// A live, one-shot order with a random salt.
    pub fn dummy(registry: Address, maker: Address, static_target: Address) -> Self {
        Self {
            registry,
            maker,
            executer: Address::ZERO,
            static_target,
            static_selector: Selector::ZERO,
            static_extradata: Bytes::new(),
            maximum_fill: U256::from(1),
            extra: OrderExtra {
                listing_time: U256::ZERO,
                expiration_time: U256::MAX,
                salt: U256::from_be_bytes(rand::random::<[u8; 32]>()),
            },
        }
    }
}
