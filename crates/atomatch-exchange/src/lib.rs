//! # atomatch-exchange
//!
//! The matching engine. Takes two orders plus one settlement call each,
//! authorizes both, asks each order's static predicate whether the pair is
//! acceptable, then executes both calls through the makers' proxies in one
//! all-or-nothing transaction.
//!
//! - [`OrderHasher`]: EIP-712 order hashing bound to one deployment
//! - [`Authorizer`]: fill / sender / approval / ERC-1271 / ECDSA cascade
//! - [`FillLedger`], [`ApprovalLedger`]: per-`(maker, hash)` state
//! - [`Exchange`]: the contract (`atomicMatch`, approvals, fills, registries, executers)
//! - [`MatchRequest`]: structured view of the flat `atomicMatch` arguments
//! - [`StaticMarket`]: reference predicates for NFT and token swaps

pub mod authorization;
pub mod exchange;
pub mod hashing;
pub mod ledger;
pub mod request;
pub mod static_market;

pub use authorization::{AuthorizationPath, Authorizer, order_parameters_valid};
pub use exchange::{Exchange, add_executer, atomic_match, deploy};
pub use hashing::OrderHasher;
pub use ledger::{ApprovalLedger, FillLedger};
pub use request::{MatchRequest, MatchSide, order};
pub use static_market::StaticMarket;
