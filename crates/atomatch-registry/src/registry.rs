//! # Proxy Registry
//!
//! Issues one [`AuthenticatedProxy`](crate::AuthenticatedProxy) per user and
//! keeps the set of exchange contracts allowed to direct any proxy it
//! issued.
//!
//! ## Storage
//!
//! | Slot                          | Meaning                               |
//! |-------------------------------|---------------------------------------|
//! | `registry.owner`              | Owner (grant/revoke authority)        |
//! | `registry.initial_grant`      | Exchange granted through the one-time path |
//! | `registry.proxies[user]`      | The user's proxy, zero if none        |
//! | `registry.contracts[addr]`    | `true` if `addr` may direct proxies   |

use atomatch_chain::{Chain, Contract, Frame, Slot, decode_return, dispatch, returns};
use atomatch_types::{
    Address, AtomatchError, Bytes, Event, Result,
    abi::{IProxy, IRegistry},
};
use tracing::info;

use crate::AuthenticatedProxy;

fn owner_slot() -> Slot {
    Slot::named("registry.owner")
}

fn initial_grant_slot() -> Slot {
    Slot::named("registry.initial_grant")
}

fn proxy_slot(user: Address) -> Slot {
    Slot::named("registry.proxies").at(user.as_slice())
}

fn contract_slot(addr: Address) -> Slot {
    Slot::named("registry.contracts").at(addr.as_slice())
}

/// The registry contract.
#[derive(Debug, Default, Clone, Copy)]
pub struct Registry;

impl Registry {
    fn ensure_owner(chain: &Chain, frame: &Frame) -> Result<()> {
        if chain.load_address(frame.address, owner_slot()) == frame.caller {
            Ok(())
        } else {
            Err(AtomatchError::Unauthorized {
                caller: frame.caller,
            })
        }
    }

    fn register(chain: &mut Chain, frame: &Frame, user: Address) -> Result<Address> {
        if user.is_zero() {
            return Err(AtomatchError::ZeroAddress);
        }
        let registry = frame.address;
        if !chain.load_address(registry, proxy_slot(user)).is_zero() {
            return Err(AtomatchError::UserAlreadyHasProxy { user });
        }
        let proxy = chain.deploy_contract(registry, AuthenticatedProxy)?;
        chain.call_sol(registry, proxy, &IProxy::initializeCall { user, registry })?;
        chain.store_address(registry, proxy_slot(user), proxy)?;
        chain.emit(registry, Event::ProxyRegistered { user, proxy })?;
        info!(registry = %registry, user = %user, proxy = %proxy, "Proxy registered");
        Ok(proxy)
    }

    fn grant(chain: &mut Chain, registry: Address, exchange: Address) -> Result<()> {
        let slot = contract_slot(exchange);
        if chain.load_bool(registry, slot) {
            return Err(AtomatchError::ContractAlreadyAllowed(exchange));
        }
        chain.store_bool(registry, slot, true)?;
        chain.emit(registry, Event::AuthGranted { exchange })?;
        info!(registry = %registry, exchange = %exchange, "Exchange authenticated");
        Ok(())
    }
}

impl Contract for Registry {
    fn name(&self) -> &'static str {
        "Registry"
    }

    fn construct(&self, chain: &mut Chain, frame: &Frame) -> Result<()> {
        chain.store_address(frame.address, owner_slot(), frame.caller)
    }

    fn execute(&self, chain: &mut Chain, frame: &Frame) -> Result<Bytes> {
        use IRegistry::IRegistryCalls as Calls;

        let registry = frame.address;
        match dispatch::<Calls>(self.name(), &frame.input)? {
            Calls::registerProxy(_) => {
                let proxy = Self::register(chain, frame, frame.caller)?;
                Ok(returns(&proxy))
            }
            Calls::registerProxyFor(call) => {
                let proxy = Self::register(chain, frame, call.user)?;
                Ok(returns(&proxy))
            }
            Calls::proxies(call) => Ok(returns(&chain.load_address(registry, proxy_slot(call.user)))),
            Calls::contracts(call) => Ok(returns(&chain.load_bool(registry, contract_slot(call.addr)))),
            Calls::grantInitialAuthentication(call) => {
                Self::ensure_owner(chain, frame)?;
                let previous = chain.load_address(registry, initial_grant_slot());
                if !previous.is_zero() {
                    return Err(AtomatchError::AddressAlreadySet(previous));
                }
                if call.exchange.is_zero() {
                    return Err(AtomatchError::ZeroAddress);
                }
                chain.store_address(registry, initial_grant_slot(), call.exchange)?;
                Self::grant(chain, registry, call.exchange)?;
                Ok(Bytes::new())
            }
            Calls::grantAuthentication(call) => {
                Self::ensure_owner(chain, frame)?;
                Self::grant(chain, registry, call.exchange)?;
                Ok(Bytes::new())
            }
            Calls::revokeAuthentication(call) => {
                Self::ensure_owner(chain, frame)?;
                let slot = contract_slot(call.exchange);
                if !chain.load_bool(registry, slot) {
                    return Err(AtomatchError::ContractNotAllowed(call.exchange));
                }
                chain.store_bool(registry, slot, false)?;
                chain.emit(
                    registry,
                    Event::AuthRevoked {
                        exchange: call.exchange,
                    },
                )?;
                info!(registry = %registry, exchange = %call.exchange, "Exchange authentication revoked");
                Ok(Bytes::new())
            }
            Calls::transferAccessTo(call) => {
                let proxy = chain.load_address(registry, proxy_slot(call.from));
                if proxy.is_zero() || proxy != frame.caller {
                    return Err(AtomatchError::Unauthorized {
                        caller: frame.caller,
                    });
                }
                if call.to.is_zero() {
                    return Err(AtomatchError::ZeroAddress);
                }
                if !chain.load_address(registry, proxy_slot(call.to)).is_zero() {
                    return Err(AtomatchError::ProxyTransferDestinationExists {
                        destination: call.to,
                    });
                }
                chain.store_address(registry, proxy_slot(call.to), proxy)?;
                chain.store_address(registry, proxy_slot(call.from), Address::ZERO)?;
                info!(registry = %registry, from = %call.from, to = %call.to, proxy = %proxy, "Proxy access moved");
                Ok(Bytes::new())
            }
            Calls::owner(_) => Ok(returns(&chain.load_address(registry, owner_slot()))),
            Calls::transferOwnership(call) => {
                Self::ensure_owner(chain, frame)?;
                if call.newOwner.is_zero() {
                    return Err(AtomatchError::ZeroAddress);
                }
                chain.store_address(registry, owner_slot(), call.newOwner)?;
                chain.emit(
                    registry,
                    Event::OwnershipTransferred {
                        previous_owner: frame.caller,
                        new_owner: call.newOwner,
                    },
                )?;
                Ok(Bytes::new())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Reads used by proxies, adapters and the exchange
// ---------------------------------------------------------------------------

/// `registry.proxies(user)`, zero if none.
pub fn proxy_of(chain: &mut Chain, caller: Address, registry: Address, user: Address) -> Result<Address> {
    chain.view(caller, registry, &IRegistry::proxiesCall { user })
}

/// `registry.contracts(addr)`.
pub fn is_authenticated(chain: &mut Chain, caller: Address, registry: Address, addr: Address) -> Result<bool> {
    chain.view(caller, registry, &IRegistry::contractsCall { addr })
}

/// Deploy a registry owned by `owner`.
pub fn deploy(chain: &mut Chain, owner: Address) -> Result<Address> {
    chain.deploy_contract(owner, Registry)
}

/// Register a proxy for `user` and return its address.
pub fn register_proxy(chain: &mut Chain, registry: Address, user: Address) -> Result<Address> {
    let output = chain.transact_sol(user, registry, &IRegistry::registerProxyCall {})?;
    decode_return(&output)
}

/// Grant `exchange` as `owner`, choosing the one-time path if it is unused.
pub fn authenticate(chain: &mut Chain, registry: Address, owner: Address, exchange: Address) -> Result<()> {
    if chain.load_address(registry, initial_grant_slot()).is_zero() {
        chain.transact_sol(owner, registry, &IRegistry::grantInitialAuthenticationCall { exchange })?;
    } else {
        chain.transact_sol(owner, registry, &IRegistry::grantAuthenticationCall { exchange })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use atomatch_types::ChainConfig;

    fn setup() -> (Chain, Address, Address) {
        let mut chain = Chain::new(&ChainConfig {
            chain_id: 1,
            genesis_timestamp: Some(0),
        });
        let owner = Address::repeat_byte(0x0a);
        let registry = deploy(&mut chain, owner).unwrap();
        (chain, owner, registry)
    }

    #[test]
    fn one_proxy_per_user() {
        let (mut chain, _, registry) = setup();
        let alice = Address::repeat_byte(0xa1);
        let proxy = register_proxy(&mut chain, registry, alice).unwrap();
        assert!(chain.has_code(proxy));
        assert_eq!(proxy_of(&mut chain, alice, registry, alice).unwrap(), proxy);
        assert!(matches!(
            register_proxy(&mut chain, registry, alice),
            Err(AtomatchError::UserAlreadyHasProxy { .. })
        ));
        assert!(
            proxy_of(&mut chain, alice, registry, Address::repeat_byte(0xb0))
                .unwrap()
                .is_zero()
        );
    }

    #[test]
    fn register_for_someone_else() {
        let (mut chain, _, registry) = setup();
        let bob = Address::repeat_byte(0xb0);
        let out = chain
            .transact_sol(
                Address::repeat_byte(0x77),
                registry,
                &IRegistry::registerProxyForCall { user: bob },
            )
            .unwrap();
        let proxy: Address = decode_return(&out).unwrap();
        let user: Address = chain.view(bob, proxy, &IProxy::userCall {}).unwrap();
        assert_eq!(user, bob);
    }

    #[test]
    fn initial_grant_is_one_time() {
        let (mut chain, owner, registry) = setup();
        let ex1 = Address::repeat_byte(0xe1);
        let ex2 = Address::repeat_byte(0xe2);
        chain
            .transact_sol(owner, registry, &IRegistry::grantInitialAuthenticationCall { exchange: ex1 })
            .unwrap();
        assert!(is_authenticated(&mut chain, owner, registry, ex1).unwrap());
        assert!(matches!(
            chain.transact_sol(owner, registry, &IRegistry::grantInitialAuthenticationCall { exchange: ex2 }),
            Err(AtomatchError::AddressAlreadySet(addr)) if addr == ex1
        ));
        // Revoking does not reopen the one-time path.
        chain
            .transact_sol(owner, registry, &IRegistry::revokeAuthenticationCall { exchange: ex1 })
            .unwrap();
        assert!(
            chain
                .transact_sol(owner, registry, &IRegistry::grantInitialAuthenticationCall { exchange: ex2 })
                .is_err()
        );
    }

    #[test]
    fn grant_and_revoke_are_owner_only_and_strict() {
        let (mut chain, owner, registry) = setup();
        let exchange = Address::repeat_byte(0xe1);
        let mallory = Address::repeat_byte(0x66);
        assert!(matches!(
            chain.transact_sol(mallory, registry, &IRegistry::grantAuthenticationCall { exchange }),
            Err(AtomatchError::Unauthorized { .. })
        ));
        chain
            .transact_sol(owner, registry, &IRegistry::grantAuthenticationCall { exchange })
            .unwrap();
        assert!(matches!(
            chain.transact_sol(owner, registry, &IRegistry::grantAuthenticationCall { exchange }),
            Err(AtomatchError::ContractAlreadyAllowed(_))
        ));
        chain
            .transact_sol(owner, registry, &IRegistry::revokeAuthenticationCall { exchange })
            .unwrap();
        assert!(matches!(
            chain.transact_sol(owner, registry, &IRegistry::revokeAuthenticationCall { exchange }),
            Err(AtomatchError::ContractNotAllowed(_))
        ));
        let events: Vec<_> = chain.events_from(registry).map(Event::name).collect();
        assert_eq!(events, ["AuthGranted", "AuthRevoked"]);
    }

    #[test]
    fn ownership_transfer_rejects_zero() {
        let (mut chain, owner, registry) = setup();
        assert!(matches!(
            chain.transact_sol(owner, registry, &IRegistry::transferOwnershipCall { newOwner: Address::ZERO }),
            Err(AtomatchError::ZeroAddress)
        ));
        let next = Address::repeat_byte(0x0b);
        chain
            .transact_sol(owner, registry, &IRegistry::transferOwnershipCall { newOwner: next })
            .unwrap();
        let current: Address = chain.view(owner, registry, &IRegistry::ownerCall {}).unwrap();
        assert_eq!(current, next);
        assert!(
            chain
                .transact_sol(owner, registry, &IRegistry::grantAuthenticationCall { exchange: owner })
                .is_err()
        );
    }

    #[test]
    fn only_the_proxy_can_move_its_mapping() {
        let (mut chain, _, registry) = setup();
        let alice = Address::repeat_byte(0xa1);
        register_proxy(&mut chain, registry, alice).unwrap();
        let err = chain
            .transact_sol(
                alice,
                registry,
                &IRegistry::transferAccessToCall {
                    from: alice,
                    to: Address::repeat_byte(0xb0),
                },
            )
            .unwrap_err();
        assert!(matches!(err, AtomatchError::Unauthorized { .. }));
    }
}
