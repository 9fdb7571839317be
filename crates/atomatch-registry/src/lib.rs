//! # atomatch-registry
//!
//! The authentication layer between users and exchanges.
//!
//! - [`Registry`]: one proxy per user; the set of exchanges allowed to
//!   direct proxies.
//! - [`AuthenticatedProxy`]: forwards calls for its owner or for an
//!   authenticated exchange while not revoked; two-step ownership transfer.
//! - [`GlobalMaker`]: a shared proxy for many makers, guarded by a validated
//!   selector/offset [`DecodeTable`].

pub mod global_maker;
pub mod proxy;
pub mod registry;

pub use global_maker::{DecodeTable, GlobalMaker, MakerField};
pub use proxy::AuthenticatedProxy;
pub use registry::{Registry, authenticate, deploy, is_authenticated, proxy_of, register_proxy};
