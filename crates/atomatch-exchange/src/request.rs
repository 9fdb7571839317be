//! The structured view of an `atomicMatch` call.
//!
//! On the wire both orders travel as flat arrays:
//!
//! ```text
//! addrs[10] = [registry, maker, executer, staticTarget, callTarget] × 2
//! uints[8]  = [maximumFill, listingTime, expirationTime, salt]       × 2
//! ```
//!
//! with selectors, extradata, calldata and `howToCall` in parallel
//! arguments and `signatures = abi.encode(bytes first, bytes second)`.

use alloy_sol_types::{SolCall, SolValue};
use atomatch_types::{
    Address, B256, Bytes, Call, HowToCall, Order, OrderExtra, Result, Selector, U256,
    abi::IExchange,
};
use serde::{Deserialize, Serialize};

/// One side of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSide {
    pub order: Order,
    pub call: Call,
    /// Empty when the order is authorized some other way.
    pub signature: Bytes,
}

impl MatchSide {
    #[must_use]
    pub fn new(order: Order, call: Call, signature: impl Into<Bytes>) -> Self {
        Self {
            order,
            call,
            signature: signature.into(),
        }
    }
}

/// Both sides plus the relayer's metadata word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRequest {
    pub first: MatchSide,
    pub second: MatchSide,
    pub metadata: B256,
}

impl MatchRequest {
    #[must_use]
    pub fn new(first: MatchSide, second: MatchSide) -> Self {
        Self {
            first,
            second,
            metadata: B256::ZERO,
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: B256) -> Self {
        self.metadata = metadata;
        self
    }

    /// Flatten into the `atomicMatch` argument list.
    #[must_use]
    pub fn to_call(&self) -> IExchange::atomicMatchCall {
        let (a, b) = (&self.first, &self.second);
        let addrs = |s: &MatchSide| {
            [
                s.order.registry,
                s.order.maker,
                s.order.executer,
                s.order.static_target,
                s.call.target,
            ]
        };
        let uints = |s: &MatchSide| {
            [
                s.order.maximum_fill,
                s.order.extra.listing_time,
                s.order.extra.expiration_time,
                s.order.extra.salt,
            ]
        };
        let [a0, a1, a2, a3, a4] = addrs(a);
        let [b0, b1, b2, b3, b4] = addrs(b);
        let [u0, u1, u2, u3] = uints(a);
        let [v0, v1, v2, v3] = uints(b);
        IExchange::atomicMatchCall {
            addrs: [a0, a1, a2, a3, a4, b0, b1, b2, b3, b4],
            uints: [u0, u1, u2, u3, v0, v1, v2, v3],
            staticSelectors: [a.order.static_selector, b.order.static_selector],
            firstExtradata: a.order.static_extradata.clone(),
            firstCalldata: a.call.data.clone(),
            secondExtradata: b.order.static_extradata.clone(),
            secondCalldata: b.call.data.clone(),
            howToCalls: [a.call.how_to_call.as_u8(), b.call.how_to_call.as_u8()],
            metadata: self.metadata,
            signatures: (a.signature.clone(), b.signature.clone())
                .abi_encode_params()
                .into(),
        }
    }

    /// ABI calldata for `atomicMatch`.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        self.to_call().abi_encode().into()
    }

    /// Rebuild both sides from the flat arguments.
    pub fn from_call(call: &IExchange::atomicMatchCall) -> Result<Self> {
        let (first_sig, second_sig) = <(Bytes, Bytes)>::abi_decode_params(&call.signatures)?;
        let side = |i: usize, extradata: &Bytes, calldata: &Bytes, signature: Bytes| -> Result<MatchSide> {
            let addrs = &call.addrs[i * 5..i * 5 + 5];
            let uints = &call.uints[i * 4..i * 4 + 4];
            let order = Order {
                registry: addrs[0],
                maker: addrs[1],
                executer: addrs[2],
                static_target: addrs[3],
                static_selector: call.staticSelectors[i],
                static_extradata: extradata.clone(),
                maximum_fill: uints[0],
                extra: OrderExtra {
                    listing_time: uints[1],
                    expiration_time: uints[2],
                    salt: uints[3],
                },
            };
            let how_to_call = HowToCall::try_from(call.howToCalls[i])?;
            Ok(MatchSide {
                order,
                call: Call::new(addrs[4], how_to_call, calldata.clone()),
                signature,
            })
        };
        Ok(Self {
            first: side(0, &call.firstExtradata, &call.firstCalldata, first_sig)?,
            second: side(1, &call.secondExtradata, &call.secondCalldata, second_sig)?,
            metadata: call.metadata,
        })
    }
}

/// An order with the usual defaults: own proxy, live from `listing_time`
/// until `expiration_time`.
#[must_use]
pub fn order(
    registry: Address,
    maker: Address,
    static_target: Address,
    static_selector: Selector,
    static_extradata: impl Into<Bytes>,
    maximum_fill: U256,
    extra: OrderExtra,
) -> Order {
    Order {
        registry,
        maker,
        executer: Address::ZERO,
        static_target,
        static_selector,
        static_extradata: static_extradata.into(),
        maximum_fill,
        extra,
    }
}
