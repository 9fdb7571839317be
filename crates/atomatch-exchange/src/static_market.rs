//! # StaticMarket
//!
//! Reference predicates for common trades. One deployed [`StaticMarket`]
//! serves every entry point; the order's `staticSelector` picks one and its
//! `staticExtradata` carries the terms.
//!
//! | Selector                    | Extradata                                             | Fill            |
//! |-----------------------------|-------------------------------------------------------|-----------------|
//! | `any`                       | ignored                                               | 1               |
//! | `ERC721ForERC20`            | `(address[2] [nft, erc20], uint256[2] [id, price])`   | 1               |
//! | `ERC20ForERC721`            | `(address[2] [erc20, nft], uint256[2] [id, price])`   | 1               |
//! | `ERC20ForERC20`             | `(address[2] [give, get], uint256[2] [give, get])`    | previous + sent |
//! | `ERC721ForERC20WithPayouts` | `(address[3] [nft, erc20, atomicizer], uint256[2] [id, price], address[] payees, uint256[] amounts)` | 1 |
//!
//! The payouts variant expects the counter call to be an atomicizer
//! delegatecall whose sub-calls pay exactly the listed amounts to the listed
//! payees, summing to the price.

use alloy_sol_types::{SolCall, SolValue};
use atomatch_chain::{OrderPredicate, PredicateContext, WorldState};
use atomatch_types::{
    Address, AtomatchError, Bytes, Call, HowToCall, Result, Selector, U256,
    abi::{IAtomicizer, IERC20, IERC721, IStaticMarket},
};

fn reject(reason: impl Into<String>) -> AtomatchError {
    AtomatchError::PredicateRejected {
        reason: reason.into(),
    }
}

fn require(condition: bool, reason: &str) -> Result<()> {
    if condition { Ok(()) } else { Err(reject(reason)) }
}

fn erc721_transfer(from: Address, to: Address, id: U256) -> Vec<u8> {
    IERC721::transferFromCall {
        from,
        to,
        tokenId: id,
    }
    .abi_encode()
}

fn erc20_transfer(from: Address, to: Address, amount: U256) -> Vec<u8> {
    IERC20::transferFromCall { from, to, amount }.abi_encode()
}

/// A direct call to `target`.
fn direct_call_to(call: &Call, target: Address, what: &str) -> Result<()> {
    require(call.how_to_call == HowToCall::Call, &format!("{what} must be a direct call"))?;
    require(call.target == target, &format!("{what} target must be {target}"))
}

/// The shared reference predicate.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticMarket;

impl StaticMarket {
    fn erc721_for_erc20(ctx: &PredicateContext<'_>) -> Result<U256> {
        let ([nft, erc20], [id, price]) = <([Address; 2], [U256; 2])>::abi_decode_params(ctx.extradata)?;
        require(!price.is_zero(), "ERC721ForERC20: price must be larger than zero")?;
        direct_call_to(ctx.call, nft, "ERC721ForERC20: call")?;
        direct_call_to(ctx.counter_call, erc20, "ERC721ForERC20: countercall")?;
        let (maker, taker) = (ctx.order.maker, ctx.counter_order.maker);
        require(
            ctx.call.data[..] == erc721_transfer(maker, taker, id)[..],
            "ERC721ForERC20: call must transfer the token to the counterparty",
        )?;
        require(
            ctx.counter_call.data[..] == erc20_transfer(taker, maker, price)[..],
            "ERC721ForERC20: countercall must pay the price to the maker",
        )?;
        Ok(U256::from(1))
    }

    fn erc20_for_erc721(ctx: &PredicateContext<'_>) -> Result<U256> {
        let ([erc20, nft], [id, price]) = <([Address; 2], [U256; 2])>::abi_decode_params(ctx.extradata)?;
        require(!price.is_zero(), "ERC20ForERC721: price must be larger than zero")?;
        direct_call_to(ctx.call, erc20, "ERC20ForERC721: call")?;
        direct_call_to(ctx.counter_call, nft, "ERC20ForERC721: countercall")?;
        let (maker, taker) = (ctx.order.maker, ctx.counter_order.maker);
        require(
            ctx.call.data[..] == erc20_transfer(maker, taker, price)[..],
            "ERC20ForERC721: call must pay the price to the counterparty",
        )?;
        require(
            ctx.counter_call.data[..] == erc721_transfer(taker, maker, id)[..],
            "ERC20ForERC721: countercall must transfer the token to the maker",
        )?;
        Ok(U256::from(1))
    }

    /// Partial fills at a fixed ratio. The fill counts units of the given
    /// token; the maker must receive at least `get / give` per unit sent.
    fn erc20_for_erc20(ctx: &PredicateContext<'_>) -> Result<U256> {
        let ([give_token, get_token], [give, get]) =
            <([Address; 2], [U256; 2])>::abi_decode_params(ctx.extradata)?;
        require(!give.is_zero(), "ERC20ForERC20: amount to give must be larger than zero")?;
        require(!get.is_zero(), "ERC20ForERC20: amount to get must be larger than zero")?;
        direct_call_to(ctx.call, give_token, "ERC20ForERC20: call")?;
        direct_call_to(ctx.counter_call, get_token, "ERC20ForERC20: countercall")?;

        let (maker, taker) = (ctx.order.maker, ctx.counter_order.maker);
        let sent = IERC20::transferFromCall::abi_decode(&ctx.call.data)
            .map_err(|_| reject("ERC20ForERC20: call must be transferFrom"))?;
        let received = IERC20::transferFromCall::abi_decode(&ctx.counter_call.data)
            .map_err(|_| reject("ERC20ForERC20: countercall must be transferFrom"))?;
        require(
            sent.from == maker && sent.to == taker,
            "ERC20ForERC20: call must move the maker's tokens to the counterparty",
        )?;
        require(
            received.from == taker && received.to == maker,
            "ERC20ForERC20: countercall must move the counterparty's tokens to the maker",
        )?;
        require(!sent.amount.is_zero(), "ERC20ForERC20: nothing sent")?;

        let owed = sent
            .amount
            .checked_mul(get)
            .ok_or_else(|| reject("ERC20ForERC20: amount overflow"))?;
        let paid = received
            .amount
            .checked_mul(give)
            .ok_or_else(|| reject("ERC20ForERC20: amount overflow"))?;
        require(paid >= owed, "ERC20ForERC20: price below the maker's ratio")?;

        let new_fill = ctx
            .previous_fill
            .checked_add(sent.amount)
            .ok_or_else(|| reject("ERC20ForERC20: fill overflow"))?;
        require(
            new_fill <= ctx.order.maximum_fill,
            "ERC20ForERC20: new fill exceeds maximum fill",
        )?;
        Ok(new_fill)
    }

    fn erc721_for_erc20_with_payouts(ctx: &PredicateContext<'_>) -> Result<U256> {
        let ([nft, erc20, atomicizer], [id, price], payees, amounts) =
            <([Address; 3], [U256; 2], Vec<Address>, Vec<U256>)>::abi_decode_params(ctx.extradata)?;
        require(!price.is_zero(), "ERC721ForERC20WithPayouts: price must be larger than zero")?;
        require(
            !payees.is_empty() && payees.len() == amounts.len(),
            "ERC721ForERC20WithPayouts: payees and amounts must pair up",
        )?;
        let total = amounts
            .iter()
            .try_fold(U256::ZERO, |acc, a| acc.checked_add(*a))
            .ok_or_else(|| reject("ERC721ForERC20WithPayouts: payout overflow"))?;
        require(total == price, "ERC721ForERC20WithPayouts: payouts must sum to the price")?;

        let (maker, taker) = (ctx.order.maker, ctx.counter_order.maker);
        direct_call_to(ctx.call, nft, "ERC721ForERC20WithPayouts: call")?;
        require(
            ctx.call.data[..] == erc721_transfer(maker, taker, id)[..],
            "ERC721ForERC20WithPayouts: call must transfer the token to the counterparty",
        )?;

        require(
            ctx.counter_call.how_to_call == HowToCall::DelegateCall && ctx.counter_call.target == atomicizer,
            "ERC721ForERC20WithPayouts: countercall must delegatecall the atomicizer",
        )?;
        let batch = IAtomicizer::atomicizeCall::abi_decode(&ctx.counter_call.data)
            .map_err(|_| reject("ERC721ForERC20WithPayouts: countercall must be atomicize"))?;
        require(
            batch.targets.len() == payees.len()
                && batch.values.len() == payees.len()
                && batch.calldatas.len() == payees.len(),
            "ERC721ForERC20WithPayouts: one sub-call per payee",
        )?;
        for (i, (payee, amount)) in payees.iter().zip(&amounts).enumerate() {
            require(
                batch.targets[i] == erc20 && batch.values[i].is_zero(),
                "ERC721ForERC20WithPayouts: payouts must be plain ERC-20 calls",
            )?;
            require(
                batch.calldatas[i][..] == erc20_transfer(taker, *payee, *amount)[..],
                "ERC721ForERC20WithPayouts: payout does not match the listing",
            )?;
        }
        Ok(U256::from(1))
    }

    // -----------------------------------------------------------------------
    // Extradata builders
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn erc721_for_erc20_extradata(nft: Address, erc20: Address, id: U256, price: U256) -> Bytes {
        ([nft, erc20], [id, price]).abi_encode_params().into()
    }

    #[must_use]
    pub fn erc20_for_erc721_extradata(erc20: Address, nft: Address, id: U256, price: U256) -> Bytes {
        ([erc20, nft], [id, price]).abi_encode_params().into()
    }

    #[must_use]
    pub fn erc20_for_erc20_extradata(give_token: Address, get_token: Address, give: U256, get: U256) -> Bytes {
        ([give_token, get_token], [give, get]).abi_encode_params().into()
    }

    #[must_use]
    pub fn erc721_for_erc20_with_payouts_extradata(
        nft: Address,
        erc20: Address,
        atomicizer: Address,
        id: U256,
        payouts: &[(Address, U256)],
    ) -> Bytes {
        let price = payouts.iter().fold(U256::ZERO, |acc, (_, a)| acc.saturating_add(*a));
        let payees: Vec<Address> = payouts.iter().map(|(p, _)| *p).collect();
        let amounts: Vec<U256> = payouts.iter().map(|(_, a)| *a).collect();
        ([nft, erc20, atomicizer], [id, price], payees, amounts)
            .abi_encode_params()
            .into()
    }

    // -----------------------------------------------------------------------
    // Selectors
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn any_selector() -> Selector {
        IStaticMarket::anyCall::SELECTOR.into()
    }

    #[must_use]
    pub fn erc721_for_erc20_selector() -> Selector {
        IStaticMarket::ERC721ForERC20Call::SELECTOR.into()
    }

    #[must_use]
    pub fn erc20_for_erc721_selector() -> Selector {
        IStaticMarket::ERC20ForERC721Call::SELECTOR.into()
    }

    #[must_use]
    pub fn erc20_for_erc20_selector() -> Selector {
        IStaticMarket::ERC20ForERC20Call::SELECTOR.into()
    }

    #[must_use]
    pub fn erc721_for_erc20_with_payouts_selector() -> Selector {
        IStaticMarket::ERC721ForERC20WithPayoutsCall::SELECTOR.into()
    }
}

impl OrderPredicate for StaticMarket {
    fn name(&self) -> &'static str {
        "StaticMarket"
    }

    fn evaluate(&self, _state: &WorldState, ctx: &PredicateContext<'_>) -> Result<U256> {
        let selector = ctx.selector;
        if selector == Self::any_selector() {
            Ok(U256::from(1))
        } else if selector == Self::erc721_for_erc20_selector() {
            Self::erc721_for_erc20(ctx)
        } else if selector == Self::erc20_for_erc721_selector() {
            Self::erc20_for_erc721(ctx)
        } else if selector == Self::erc20_for_erc20_selector() {
            Self::erc20_for_erc20(ctx)
        } else if selector == Self::erc721_for_erc20_with_payouts_selector() {
            Self::erc721_for_erc20_with_payouts(ctx)
        } else {
            Err(AtomatchError::FunctionNotFound {
                contract: self.name(),
                selector,
            })
        }
    }
}
