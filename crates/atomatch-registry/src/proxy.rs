//! # Authenticated Proxy
//!
//! A per-user execution agent. The owner can always direct it; exchanges
//! authenticated in the issuing registry can direct it until the owner
//! revokes access.
//!
//! Every entry point that forwards a call goes through
//! [`AuthenticatedProxy::ensure_can_execute`]; there is no other path to
//! `execute`.

use atomatch_chain::{Chain, Contract, Frame, Slot, dispatch, returns};
use atomatch_types::{
    Address, AtomatchError, Bytes, Event, HowToCall, Result, U256,
    abi::{IProxy, IRegistry},
};
use tracing::{debug, info};

use crate::registry::{is_authenticated, proxy_of};

fn creator_slot() -> Slot {
    Slot::named("proxy.creator")
}

fn user_slot() -> Slot {
    Slot::named("proxy.user")
}

fn registry_slot() -> Slot {
    Slot::named("proxy.registry")
}

fn revoked_slot() -> Slot {
    Slot::named("proxy.revoked")
}

fn pending_slot() -> Slot {
    Slot::named("proxy.pending_owner")
}

/// Proxy contract code. Deployed by the registry, one instance per user.
#[derive(Debug, Default, Clone, Copy)]
pub struct AuthenticatedProxy;

impl AuthenticatedProxy {
    /// The caller is the owner, or the proxy is not revoked and the
    /// registry authenticates the caller.
    pub fn ensure_can_execute(chain: &mut Chain, proxy: Address, caller: Address) -> Result<()> {
        if chain.load_address(proxy, user_slot()) == caller {
            return Ok(());
        }
        if !chain.load_bool(proxy, revoked_slot()) {
            let registry = chain.load_address(proxy, registry_slot());
            if is_authenticated(chain, proxy, registry, caller)? {
                return Ok(());
            }
        }
        Err(AtomatchError::Unauthorized { caller })
    }

    fn ensure_owner(chain: &Chain, frame: &Frame) -> Result<()> {
        if chain.load_address(frame.address, user_slot()) == frame.caller {
            Ok(())
        } else {
            Err(AtomatchError::Unauthorized {
                caller: frame.caller,
            })
        }
    }

    fn ensure_free_destination(chain: &mut Chain, proxy: Address, destination: Address) -> Result<()> {
        if destination.is_zero() {
            return Err(AtomatchError::ZeroAddress);
        }
        let registry = chain.load_address(proxy, registry_slot());
        if !proxy_of(chain, proxy, registry, destination)?.is_zero() {
            return Err(AtomatchError::ProxyTransferDestinationExists { destination });
        }
        Ok(())
    }
}

impl Contract for AuthenticatedProxy {
    fn name(&self) -> &'static str {
        "AuthenticatedProxy"
    }

    fn construct(&self, chain: &mut Chain, frame: &Frame) -> Result<()> {
        chain.store_address(frame.address, creator_slot(), frame.caller)
    }

    fn execute(&self, chain: &mut Chain, frame: &Frame) -> Result<Bytes> {
        use IProxy::IProxyCalls as Calls;

        let proxy = frame.address;
        match dispatch::<Calls>(self.name(), &frame.input)? {
            Calls::initialize(call) => {
                let creator = chain.load_address(proxy, creator_slot());
                if frame.caller != creator || !chain.load_address(proxy, registry_slot()).is_zero() {
                    return Err(AtomatchError::Unauthorized {
                        caller: frame.caller,
                    });
                }
                chain.store_address(proxy, user_slot(), call.user)?;
                chain.store_address(proxy, registry_slot(), call.registry)?;
                Ok(Bytes::new())
            }
            Calls::execute(call) => {
                Self::ensure_can_execute(chain, proxy, frame.caller)?;
                let how_to_call = HowToCall::try_from(call.howToCall)?;
                debug!(
                    proxy = %proxy,
                    caller = %frame.caller,
                    target = %call.target,
                    how = %how_to_call,
                    "Proxy forwarding call"
                );
                let result = match how_to_call {
                    HowToCall::Call => chain.call(proxy, call.target, U256::ZERO, &call.data)?,
                    HowToCall::DelegateCall => chain.delegate_call(frame, call.target, &call.data)?,
                };
                Ok(returns(&result))
            }
            Calls::setRevoke(call) => {
                Self::ensure_owner(chain, frame)?;
                chain.store_bool(proxy, revoked_slot(), call.revoke)?;
                chain.emit(proxy, Event::Revoked { revoked: call.revoke })?;
                info!(proxy = %proxy, revoked = call.revoke, "Proxy revocation toggled");
                Ok(Bytes::new())
            }
            Calls::transferAccessTo(call) => {
                Self::ensure_owner(chain, frame)?;
                Self::ensure_free_destination(chain, proxy, call.destination)?;
                chain.store_address(proxy, pending_slot(), call.destination)?;
                chain.emit(
                    proxy,
                    Event::ProxyTransferRequested {
                        from: frame.caller,
                        to: call.destination,
                    },
                )?;
                Ok(Bytes::new())
            }
            Calls::acceptAccess(_) => {
                let pending = chain.load_address(proxy, pending_slot());
                if pending.is_zero() || pending != frame.caller {
                    return Err(AtomatchError::Unauthorized {
                        caller: frame.caller,
                    });
                }
                Self::ensure_free_destination(chain, proxy, pending)?;
                let previous = chain.load_address(proxy, user_slot());
                let registry = chain.load_address(proxy, registry_slot());
                chain.call_sol(
                    proxy,
                    registry,
                    &IRegistry::transferAccessToCall {
                        from: previous,
                        to: pending,
                    },
                )?;
                chain.store_address(proxy, user_slot(), pending)?;
                chain.store_address(proxy, pending_slot(), Address::ZERO)?;
                chain.store_bool(proxy, revoked_slot(), false)?;
                chain.emit(
                    proxy,
                    Event::ProxyTransferred {
                        from: previous,
                        to: pending,
                    },
                )?;
                info!(proxy = %proxy, from = %previous, to = %pending, "Proxy ownership transferred");
                Ok(Bytes::new())
            }
            Calls::user(_) => Ok(returns(&chain.load_address(proxy, user_slot()))),
            Calls::registry(_) => Ok(returns(&chain.load_address(proxy, registry_slot()))),
            Calls::revoked(_) => Ok(returns(&chain.load_bool(proxy, revoked_slot()))),
            Calls::pendingOwner(_) => Ok(returns(&chain.load_address(proxy, pending_slot()))),
        }
    }
}
