//! Wire-visible events emitted by the components.
//!
//! Events are recorded in the world state alongside storage, so a reverted
//! frame drops the events it emitted.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::Order;

/// Everything the core components emit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// Two orders were matched and both settlement calls succeeded.
    OrdersMatched {
        first_hash: B256,
        second_hash: B256,
        first_maker: Address,
        second_maker: Address,
        first_fill: U256,
        second_fill: U256,
        metadata: B256,
    },
    /// A fill changed, through matching or `setOrderFill`.
    OrderFillChanged {
        hash: B256,
        maker: Address,
        new_fill: U256,
    },
    /// A maker approved an order on-chain.
    OrderApproved {
        hash: B256,
        maker: Address,
        /// Present when approved through `approveOrder`, absent for
        /// `approveOrderHash`.
        order: Option<Box<Order>>,
        orderbook_inclusion_desired: bool,
    },
    /// An exchange may now direct proxies of the emitting registry.
    AuthGranted { exchange: Address },
    /// An exchange may no longer direct proxies of the emitting registry.
    AuthRevoked { exchange: Address },
    /// The registry deployed a proxy for `user`.
    ProxyRegistered { user: Address, proxy: Address },
    /// A proxy owner toggled exchange access.
    Revoked { revoked: bool },
    /// A proxy owner asked to hand the proxy over.
    ProxyTransferRequested { from: Address, to: Address },
    /// The destination accepted; the proxy has a new owner.
    ProxyTransferred { from: Address, to: Address },
    /// Registry or exchange ownership moved.
    OwnershipTransferred {
        previous_owner: Address,
        new_owner: Address,
    },
}

impl Event {
    /// Stable event name, used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::OrdersMatched { .. } => "OrdersMatched",
            Self::OrderFillChanged { .. } => "OrderFillChanged",
            Self::OrderApproved { .. } => "OrderApproved",
            Self::AuthGranted { .. } => "AuthGranted",
            Self::AuthRevoked { .. } => "AuthRevoked",
            Self::ProxyRegistered { .. } => "ProxyRegistered",
            Self::Revoked { .. } => "Revoked",
            Self::ProxyTransferRequested { .. } => "ProxyTransferRequested",
            Self::ProxyTransferred { .. } => "ProxyTransferred",
            Self::OwnershipTransferred { .. } => "OwnershipTransferred",
        }
    }
}

/// An event together with the account that emitted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub emitter: Address,
    pub event: Event,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_stable() {
        assert_eq!(Event::Revoked { revoked: true }.name(), "Revoked");
        assert_eq!(
            Event::AuthGranted {
                exchange: Address::ZERO
            }
            .name(),
            "AuthGranted"
        );
    }

    #[test]
    fn log_serde_roundtrip() {
        let log = Log {
            emitter: Address::repeat_byte(1),
            event: Event::OrderFillChanged {
                hash: B256::repeat_byte(2),
                maker: Address::repeat_byte(3),
                new_fill: U256::from(4),
            },
        };
        let json = serde_json::to_string(&log).unwrap();
        let back: Log = serde_json::from_str(&json).unwrap();
        assert_eq!(log, back);
    }
}
