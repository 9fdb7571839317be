//! Order authorization and parameter validation.
//!
//! An order is authorized by the first path that succeeds, cheapest first:
//!
//! ```text
//! fills[maker][hash] != 0 ─▶ Filled
//! maker == caller         ─▶ Sender
//! approved[maker][hash]   ─▶ Approved
//! maker has code          ─▶ ERC-1271 isValidSignature ─▶ ContractSignature | ✗
//! ECDSA recover == maker  ─▶ Signature
//! ```
//!
//! Contract makers never fall through to ECDSA. Malformed signatures mean
//! "not authorized", never an error.

use alloy_sol_types::SolCall;
use atomatch_chain::{Chain, WorldState, decode_return};
use atomatch_types::{
    Address, B256, Bytes, Order, Selector,
    abi::IERC1271,
    constants::EIP_1271_MAGIC_VALUE,
    signature::recover_order_signer,
};
use tracing::debug;

use crate::{ApprovalLedger, FillLedger, OrderHasher};

/// How an order was found to be authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationPath {
    /// A previous match already filled part of the order.
    Filled,
    /// The maker is submitting the match.
    Sender,
    /// The maker approved the hash on-chain.
    Approved,
    /// ERC-1271 contract signature.
    ContractSignature,
    /// ECDSA signature (EIP-712 or personal-sign).
    Signature,
}

/// Everything authorization needs to know about the exchange.
#[derive(Debug, Clone)]
pub struct Authorizer {
    exchange: Address,
    hasher: OrderHasher,
}

impl Authorizer {
    #[must_use]
    pub fn new(exchange: Address, hasher: OrderHasher) -> Self {
        Self { exchange, hasher }
    }

    #[must_use]
    pub fn hasher(&self) -> &OrderHasher {
        &self.hasher
    }

    /// Run the cascade. `None` means "not authorized".
    pub fn authorize(
        &self,
        chain: &mut Chain,
        hash: B256,
        maker: Address,
        caller: Address,
        signature: &[u8],
    ) -> Option<AuthorizationPath> {
        let path = self.cheap_path(chain.state(), hash, maker, caller);
        if path.is_some() {
            return path;
        }

        let hash_to_sign = self.hasher.hash_to_sign(&hash);
        if chain.has_code(maker) {
            let valid = self.contract_signature_valid(chain, maker, hash_to_sign, signature);
            debug!(maker = %maker, hash = %hash, valid, "ERC-1271 authorization");
            return valid.then_some(AuthorizationPath::ContractSignature);
        }

        let signed = recover_order_signer(&hash_to_sign, signature) == Some(maker);
        debug!(maker = %maker, hash = %hash, signed, "ECDSA authorization");
        signed.then_some(AuthorizationPath::Signature)
    }

    fn cheap_path(&self, state: &WorldState, hash: B256, maker: Address, caller: Address) -> Option<AuthorizationPath> {
        if !FillLedger::new(self.exchange).get(state, maker, hash).is_zero() {
            Some(AuthorizationPath::Filled)
        } else if maker == caller {
            Some(AuthorizationPath::Sender)
        } else if ApprovalLedger::new(self.exchange).is_approved(state, maker, hash) {
            Some(AuthorizationPath::Approved)
        } else {
            None
        }
    }

    /// A wallet that reverts, returns garbage or returns the wrong magic
    /// value simply does not authorize.
    fn contract_signature_valid(&self, chain: &mut Chain, maker: Address, hash_to_sign: B256, signature: &[u8]) -> bool {
        let input = IERC1271::isValidSignatureCall {
            hash: hash_to_sign,
            signature: Bytes::copy_from_slice(signature),
        }
        .abi_encode();
        chain
            .static_call(self.exchange, maker, &input)
            .and_then(|output| decode_return::<Selector>(&output))
            .is_ok_and(|magic| magic.0 == EIP_1271_MAGIC_VALUE)
    }
}

/// Order parameter checks, given whether the order's registry is known:
/// non-zero static target, inside the listing window, not fully filled.
#[must_use]
pub fn order_parameters_valid(
    state: &WorldState,
    exchange: Address,
    order: &Order,
    hash: B256,
    registry_known: bool,
    now: u64,
) -> bool {
    registry_known
        && !order.static_target.is_zero()
        && order.extra.is_live_at(now)
        && FillLedger::new(exchange).get(state, order.maker, hash) < order.maximum_fill
}
