//! EIP-712 hashing of orders.
//!
//! ```text
//! hashOrder(order)  = hashStruct(Order)
//! hashToSign(hash)  = keccak256(0x19 0x01 || domainSeparator || hash)
//! personal variant  = keccak256("\x19Ethereum Signed Message:\n32" || hashToSign)
//! ```
//!
//! The domain binds name, version, chain id and the exchange address, so a
//! signature for one deployment is worthless on any other.

use std::borrow::Cow;

use alloy_sol_types::Eip712Domain;
use atomatch_types::{Address, B256, ExchangeConfig, Order, U256, keccak256};

/// Signing context of one exchange deployment.
#[derive(Debug, Clone)]
pub struct OrderHasher {
    domain: Eip712Domain,
    separator: B256,
}

impl OrderHasher {
    #[must_use]
    pub fn new(config: &ExchangeConfig, chain_id: u64, exchange: Address) -> Self {
        let domain = Eip712Domain::new(
            Some(Cow::Owned(config.name.clone())),
            Some(Cow::Owned(config.version.clone())),
            Some(U256::from(chain_id)),
            Some(exchange),
            None,
        );
        let separator = domain.separator();
        Self { domain, separator }
    }

    #[must_use]
    pub fn domain(&self) -> &Eip712Domain {
        &self.domain
    }

    #[must_use]
    pub fn domain_separator(&self) -> B256 {
        self.separator
    }

    #[must_use]
    pub fn hash_order(order: &Order) -> B256 {
        order.hash()
    }

    /// The digest makers sign.
    #[must_use]
    pub fn hash_to_sign(&self, order_hash: &B256) -> B256 {
        let mut buf = [0u8; 66];
        buf[0] = 0x19;
        buf[1] = 0x01;
        buf[2..34].copy_from_slice(self.separator.as_slice());
        buf[34..].copy_from_slice(order_hash.as_slice());
        keccak256(buf)
    }
}
