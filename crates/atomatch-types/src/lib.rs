//! # atomatch-types
//!
//! Shared types, errors, and configuration for **Atomatch**, a
//! proxy-authenticated atomic order-matching protocol.
//!
//! This crate is the leaf dependency of the workspace. It defines:
//!
//! - **Order model**: [`Order`], [`OrderExtra`], [`Call`], [`HowToCall`]
//! - **ABI surfaces**: [`abi`] (`sol!` interfaces of every component, token
//!   standards, ERC-1271)
//! - **Events**: [`Event`], [`Log`]
//! - **Configuration**: [`ChainConfig`], [`ExchangeConfig`], [`GlobalMakerConfig`]
//! - **Errors**: [`AtomatchError`] with `AM_ERR_` prefix codes
//! - **Signatures**: [`signature::recover_order_signer`] (EIP-712 / personal-sign ECDSA)
//! - **Logging**: [`logging::init`]
//! - **Constants**: protocol constants and defaults

pub mod abi;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod logging;
pub mod order;
pub mod signature;

pub use config::*;
pub use error::*;
pub use event::*;
pub use order::*;

// Primitive types every crate in the workspace speaks.
pub use alloy_primitives::{Address, B256, Bytes, Selector, U256, keccak256};

// `abi` and `constants` are accessed by path
// (not re-exported to avoid name collisions with `Order`).
