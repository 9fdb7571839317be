//! Shared market fixture: one registry, one exchange, an atomicizer, the
//! reference predicates, an NFT and two ERC-20s, a seller and a buyer with
//! funded, approved proxies.

#![allow(dead_code)]

use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::SolCall;
use atomatch_atomicizer::Atomicizer;
use atomatch_chain::{
    Chain,
    mocks::{TestErc20, TestErc721},
};
use atomatch_exchange::{MatchRequest, MatchSide, OrderHasher, StaticMarket, atomic_match, order};
use atomatch_registry::{authenticate, register_proxy};
use atomatch_types::{
    Address, Bytes, Call, ChainConfig, ExchangeConfig, HowToCall, Order, OrderExtra, Result,
    Selector, U256,
    abi::{IERC20, IERC721, ITestToken},
};

pub const NOW: u64 = 1_000;
pub const NFT_ID: u64 = 10;
pub const PRICE: u64 = 15_000;

pub struct Market {
    pub chain: Chain,
    pub owner: Address,
    pub registry: Address,
    pub exchange: Address,
    pub atomicizer: Address,
    pub static_market: Address,
    pub nft: Address,
    pub erc20: Address,
    pub erc20_b: Address,
    pub seller: PrivateKeySigner,
    pub buyer: PrivateKeySigner,
    pub seller_proxy: Address,
    pub buyer_proxy: Address,
    pub relayer: Address,
}

impl Market {
    pub fn new() -> Self {
        atomatch_types::logging::init_for_tests();
        let mut chain = Chain::new(&ChainConfig {
            chain_id: 1,
            genesis_timestamp: Some(NOW),
        });
        let owner = Address::repeat_byte(0x0a);
        let registry = atomatch_registry::deploy(&mut chain, owner).unwrap();
        let exchange = atomatch_exchange::deploy(&mut chain, owner, ExchangeConfig::default(), registry).unwrap();
        authenticate(&mut chain, registry, owner, exchange).unwrap();
        let atomicizer = chain.deploy_contract(owner, Atomicizer).unwrap();
        let static_market = chain.deploy_predicate(owner, StaticMarket).unwrap();
        let nft = chain.deploy_contract(owner, TestErc721).unwrap();
        let erc20 = chain.deploy_contract(owner, TestErc20).unwrap();
        let erc20_b = chain.deploy_contract(owner, TestErc20).unwrap();

        let seller = PrivateKeySigner::random();
        let buyer = PrivateKeySigner::random();
        let seller_proxy = register_proxy(&mut chain, registry, seller.address()).unwrap();
        let buyer_proxy = register_proxy(&mut chain, registry, buyer.address()).unwrap();

        let mut market = Self {
            chain,
            owner,
            registry,
            exchange,
            atomicizer,
            static_market,
            nft,
            erc20,
            erc20_b,
            seller,
            buyer,
            seller_proxy,
            buyer_proxy,
            relayer: Address::repeat_byte(0x4e),
        };
        let (seller, buyer) = (market.seller(), market.buyer());
        market.mint(nft, seller, U256::from(NFT_ID));
        market.mint(erc20, buyer, U256::from(20_000));
        market.mint(erc20_b, seller, U256::from(1_000));
        market.approve_nft(seller, seller_proxy);
        for token in [erc20, erc20_b] {
            market.approve_erc20(token, seller, seller_proxy);
            market.approve_erc20(token, buyer, buyer_proxy);
        }
        market
    }

    pub fn seller(&self) -> Address {
        self.seller.address()
    }

    pub fn buyer(&self) -> Address {
        self.buyer.address()
    }

    pub fn mint(&mut self, token: Address, to: Address, amount_or_id: U256) {
        self.chain
            .transact_sol(
                self.owner,
                token,
                &ITestToken::mintCall {
                    to,
                    amountOrId: amount_or_id,
                },
            )
            .unwrap();
    }

    pub fn approve_erc20(&mut self, token: Address, holder: Address, spender: Address) {
        self.chain
            .transact_sol(
                holder,
                token,
                &IERC20::approveCall {
                    spender,
                    amount: U256::MAX,
                },
            )
            .unwrap();
    }

    pub fn approve_nft(&mut self, holder: Address, operator: Address) {
        self.chain
            .transact_sol(
                holder,
                self.nft,
                &IERC721::setApprovalForAllCall {
                    operator,
                    approved: true,
                },
            )
            .unwrap();
    }

    // -- orders ------------------------------------------------------------

    pub fn order(&self, maker: Address, selector: Selector, extradata: Bytes, maximum_fill: u64) -> Order {
        order(
            self.registry,
            maker,
            self.static_market,
            selector,
            extradata,
            U256::from(maximum_fill),
            OrderExtra::new(0, u64::MAX, U256::from(rand::random::<u64>())),
        )
    }

    /// Seller lists NFT #10 for `price` of `erc20`.
    pub fn ask(&self, price: u64) -> Order {
        self.order(
            self.seller(),
            StaticMarket::erc721_for_erc20_selector(),
            StaticMarket::erc721_for_erc20_extradata(self.nft, self.erc20, U256::from(NFT_ID), U256::from(price)),
            1,
        )
    }

    /// `maker` bids `price` of `erc20` for NFT #10.
    pub fn bid_from(&self, maker: Address, price: u64) -> Order {
        self.order(
            maker,
            StaticMarket::erc20_for_erc721_selector(),
            StaticMarket::erc20_for_erc721_extradata(self.erc20, self.nft, U256::from(NFT_ID), U256::from(price)),
            1,
        )
    }

    pub fn bid(&self, price: u64) -> Order {
        self.bid_from(self.buyer(), price)
    }

    /// An order that accepts any counterparty.
    pub fn anything(&self, maker: Address) -> Order {
        self.order(maker, StaticMarket::any_selector(), Bytes::new(), 1)
    }

    // -- calls -------------------------------------------------------------

    pub fn nft_transfer(&self, from: Address, to: Address) -> Call {
        Call::new(
            self.nft,
            HowToCall::Call,
            IERC721::transferFromCall {
                from,
                to,
                tokenId: U256::from(NFT_ID),
            }
            .abi_encode(),
        )
    }

    pub fn erc20_transfer(&self, token: Address, from: Address, to: Address, amount: u64) -> Call {
        Call::new(
            token,
            HowToCall::Call,
            IERC20::transferFromCall {
                from,
                to,
                amount: U256::from(amount),
            }
            .abi_encode(),
        )
    }

    // -- signing -----------------------------------------------------------

    pub fn hasher(&self) -> OrderHasher {
        OrderHasher::new(&ExchangeConfig::default(), self.chain.chain_id(), self.exchange)
    }

    /// EIP-712 signature over the order.
    pub fn sign(&self, signer: &PrivateKeySigner, order: &Order) -> Bytes {
        let digest = self.hasher().hash_to_sign(&order.hash());
        signer.sign_hash_sync(&digest).unwrap().as_bytes().to_vec().into()
    }

    /// The standard NFT-for-ERC-20 trade, both sides signed.
    pub fn nft_trade(&self, price: u64) -> MatchRequest {
        let ask = self.ask(price);
        let bid = self.bid(price);
        MatchRequest::new(
            MatchSide::new(
                ask.clone(),
                self.nft_transfer(self.seller(), self.buyer()),
                self.sign(&self.seller, &ask),
            ),
            MatchSide::new(
                bid.clone(),
                self.erc20_transfer(self.erc20, self.buyer(), self.seller(), price),
                self.sign(&self.buyer, &bid),
            ),
        )
    }

    pub fn settle(&mut self, request: &MatchRequest) -> Result<()> {
        atomic_match(&mut self.chain, self.exchange, self.relayer, request)
    }
}
