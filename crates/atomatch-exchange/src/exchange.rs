//! # Exchange
//!
//! Order authorization, fill accounting and atomic two-call settlement.
//!
//! ## `atomicMatch` pipeline
//!
//! ```text
//! ┌──────────┐  ┌───────────┐  ┌─────────────┐  ┌─────────┐  ┌──────────┐  ┌──────────┐  ┌────────┐
//! │  guard   │─▶│  decode   │─▶│ registries  │─▶│  auth + │─▶│ proxies  │─▶│predicates│─▶│ calls  │─▶ fills, events
//! │reentrancy│  │flat args  │  │ self-match  │  │  params │  │ targets  │  │ new fills│  │ 1 then 2│
//! └──────────┘  └───────────┘  └─────────────┘  └─────────┘  └──────────┘  └──────────┘  └────────┘
//! ```
//!
//! Everything before the calls is read-only. Once the first call runs, any
//! failure reverts the whole transaction through the substrate's frame
//! checkpoint, so fills are written last and only after both calls return.
//!
//! ## Storage
//!
//! | Slot                       | Meaning                                |
//! |----------------------------|----------------------------------------|
//! | `exchange.owner`           | May add registries and executers       |
//! | `exchange.registries[r]`   | `true` if `r` is trusted               |
//! | `exchange.executers[e]`    | `true` if `e` may settle for makers    |
//! | `exchange.lock`            | Reentrancy guard for `atomicMatch`     |
//! | `exchange.fills[m][h]`     | [`FillLedger`]                         |
//! | `exchange.approved[m][h]`  | [`ApprovalLedger`]                     |

use atomatch_chain::{Chain, Contract, Frame, PredicateContext, Slot, dispatch, returns};
use atomatch_registry::proxy_of;
use atomatch_types::{
    Address, AtomatchError, B256, Bytes, Call, Event, ExchangeConfig, Order, Result, U256,
    abi::{IExchange, IExecuter, IProxy},
};
use tracing::{debug, info, warn};

use crate::{
    ApprovalLedger, Authorizer, FillLedger, MatchRequest, MatchSide, OrderHasher,
    authorization::order_parameters_valid,
};

fn owner_slot() -> Slot {
    Slot::named("exchange.owner")
}

fn registry_slot(registry: Address) -> Slot {
    Slot::named("exchange.registries").at(registry.as_slice())
}

fn executer_slot(executer: Address) -> Slot {
    Slot::named("exchange.executers").at(executer.as_slice())
}

fn lock_slot() -> Slot {
    Slot::named("exchange.lock")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    First,
    Second,
}

impl Position {
    fn unauthorized(self, hash: B256) -> AtomatchError {
        match self {
            Self::First => AtomatchError::FirstOrderFailedAuthorization { hash },
            Self::Second => AtomatchError::SecondOrderFailedAuthorization { hash },
        }
    }

    fn invalid_params(self, hash: B256) -> AtomatchError {
        match self {
            Self::First => AtomatchError::FirstOrderHasInvalidParams { hash },
            Self::Second => AtomatchError::SecondOrderHasInvalidParams { hash },
        }
    }

    fn call_failed(self, source: AtomatchError) -> AtomatchError {
        let source = Box::new(source);
        match self {
            Self::First => AtomatchError::FirstCallFailed { source },
            Self::Second => AtomatchError::SecondCallFailed { source },
        }
    }
}

/// One side after validation, ready to settle.
struct Prepared<'a> {
    side: &'a MatchSide,
    hash: B256,
    previous_fill: U256,
    new_fill: U256,
}

/// The exchange contract. The EIP-712 domain name and version are
/// immutables.
#[derive(Debug, Clone)]
pub struct Exchange {
    config: ExchangeConfig,
}

impl Exchange {
    pub fn new(config: ExchangeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    /// The signing context of the deployment at `exchange`.
    #[must_use]
    pub fn hasher(&self, chain: &Chain, exchange: Address) -> OrderHasher {
        OrderHasher::new(&self.config, chain.chain_id(), exchange)
    }

    fn authorizer(&self, chain: &Chain, exchange: Address) -> Authorizer {
        Authorizer::new(exchange, self.hasher(chain, exchange))
    }

    fn registry_known(chain: &Chain, exchange: Address, registry: Address) -> bool {
        chain.load_bool(exchange, registry_slot(registry))
    }

    /// Whitelisted by the owner and still backed by code.
    fn executer_trusted(chain: &Chain, exchange: Address, executer: Address) -> bool {
        chain.load_bool(exchange, executer_slot(executer)) && chain.has_code(executer)
    }

    fn ensure_owner(chain: &Chain, exchange: Address, caller: Address) -> Result<()> {
        if chain.load_address(exchange, owner_slot()) != caller {
            return Err(AtomatchError::Unauthorized { caller });
        }
        Ok(())
    }

    fn parameters_valid(chain: &Chain, exchange: Address, order: &Order, hash: B256) -> bool {
        order_parameters_valid(
            chain.state(),
            exchange,
            order,
            hash,
            Self::registry_known(chain, exchange, order.registry),
            chain.timestamp(),
        )
    }

    // -----------------------------------------------------------------------
    // Order management
    // -----------------------------------------------------------------------

    fn approve(
        chain: &mut Chain,
        exchange: Address,
        maker: Address,
        hash: B256,
        order: Option<Order>,
        orderbook_inclusion_desired: bool,
    ) -> Result<()> {
        ApprovalLedger::new(exchange).approve(chain, maker, hash)?;
        chain.emit(
            exchange,
            Event::OrderApproved {
                hash,
                maker,
                order: order.map(Box::new),
                orderbook_inclusion_desired,
            },
        )?;
        info!(maker = %maker, hash = %hash, "Order approved");
        Ok(())
    }

    fn set_fill(chain: &mut Chain, exchange: Address, maker: Address, hash: B256, fill: U256) -> Result<()> {
        if FillLedger::new(exchange).raise(chain, maker, hash, fill)? {
            chain.emit(
                exchange,
                Event::OrderFillChanged {
                    hash,
                    maker,
                    new_fill: fill,
                },
            )?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Matching
    // -----------------------------------------------------------------------

    fn atomic_match(&self, chain: &mut Chain, frame: &Frame, call: &IExchange::atomicMatchCall) -> Result<()> {
        let exchange = frame.address;
        if chain.load_bool(exchange, lock_slot()) {
            warn!(exchange = %exchange, caller = %frame.caller, "Reentrant atomicMatch blocked");
            return Err(AtomatchError::Reentrancy);
        }
        chain.store_bool(exchange, lock_slot(), true)?;

        let request = MatchRequest::from_call(call)?;
        let (first, second) = (&request.first, &request.second);
        let first_hash = first.order.hash();
        let second_hash = second.order.hash();

        let registry = self.admit(chain, frame, &request)?;

        let fills = FillLedger::new(exchange);
        let first_prev = fills.get(chain.state(), first.order.maker, first_hash);
        let second_prev = fills.get(chain.state(), second.order.maker, second_hash);
        let first_ready = Prepared {
            side: first,
            hash: first_hash,
            previous_fill: first_prev,
            new_fill: Self::evaluate(chain, frame.caller, first, second, first_prev, second_prev, first_hash)?,
        };
        let second_ready = Prepared {
            side: second,
            hash: second_hash,
            previous_fill: second_prev,
            new_fill: Self::evaluate(chain, frame.caller, second, first, second_prev, first_prev, second_hash)?,
        };

        for (position, ready) in [(Position::First, &first_ready), (Position::Second, &second_ready)] {
            Self::settle(chain, exchange, registry, &ready.side.order, &ready.side.call)
                .map_err(|err| position.call_failed(err))?;
        }

        for ready in [&first_ready, &second_ready] {
            if ready.new_fill != ready.previous_fill {
                Self::set_fill(chain, exchange, ready.side.order.maker, ready.hash, ready.new_fill)?;
            }
        }
        chain.emit(
            exchange,
            Event::OrdersMatched {
                first_hash,
                second_hash,
                first_maker: first.order.maker,
                second_maker: second.order.maker,
                first_fill: first_ready.new_fill,
                second_fill: second_ready.new_fill,
                metadata: request.metadata,
            },
        )?;
        chain.store_bool(exchange, lock_slot(), false)?;

        info!(
            first_hash = %first_hash,
            second_hash = %second_hash,
            first_maker = %first.order.maker,
            second_maker = %second.order.maker,
            first_fill = %first_ready.new_fill,
            second_fill = %second_ready.new_fill,
            matcher = %frame.caller,
            "Orders matched"
        );
        Ok(())
    }

    /// Everything that must hold before any settlement call runs. Returns
    /// the shared registry.
    fn admit(&self, chain: &mut Chain, frame: &Frame, request: &MatchRequest) -> Result<Address> {
        let exchange = frame.address;
        let (first, second) = (&request.first, &request.second);
        let first_hash = first.order.hash();
        let second_hash = second.order.hash();

        if first.order.registry != second.order.registry {
            return Err(AtomatchError::RegistryNotAdded {
                registry: second.order.registry,
            });
        }
        let registry = first.order.registry;
        if !Self::registry_known(chain, exchange, registry) {
            return Err(AtomatchError::RegistryNotAdded { registry });
        }
        if first.order.maker == second.order.maker || first_hash == second_hash {
            return Err(AtomatchError::SelfMatchingIsProhibited {
                maker: first.order.maker,
            });
        }

        let authorizer = self.authorizer(chain, exchange);
        for (position, side, hash) in [
            (Position::First, first, first_hash),
            (Position::Second, second, second_hash),
        ] {
            let path = authorizer.authorize(chain, hash, side.order.maker, frame.caller, &side.signature);
            let Some(path) = path else {
                return Err(position.unauthorized(hash));
            };
            debug!(?position, hash = %hash, ?path, "Order authorized");
            if !Self::parameters_valid(chain, exchange, &side.order, hash) {
                return Err(position.invalid_params(hash));
            }
        }

        for side in [first, second] {
            let (maker, executer) = (side.order.maker, side.order.executer);
            if executer.is_zero() {
                if proxy_of(chain, exchange, registry, maker)?.is_zero() {
                    return Err(AtomatchError::ProxyDoesNotExistForMaker { maker });
                }
            } else if !Self::executer_trusted(chain, exchange, executer) {
                warn!(maker = %maker, executer = %executer, "Untrusted executer refused");
                return Err(AtomatchError::ExecuterNotAllowed { executer });
            }
            if !chain.has_code(side.call.target) {
                return Err(AtomatchError::CallTargetDoesNotExist {
                    target: side.call.target,
                });
            }
        }
        Ok(registry)
    }

    /// Ask the order's predicate for its new fill and bound it to
    /// `[previous, maximumFill]`.
    fn evaluate(
        chain: &Chain,
        matcher: Address,
        side: &MatchSide,
        counter: &MatchSide,
        previous_fill: U256,
        counter_previous_fill: U256,
        hash: B256,
    ) -> Result<U256> {
        let ctx = PredicateContext {
            selector: side.order.static_selector,
            extradata: &side.order.static_extradata,
            order: &side.order,
            call: &side.call,
            counter_order: &counter.order,
            counter_call: &counter.call,
            matcher,
            previous_fill,
            counter_previous_fill,
            timestamp: chain.timestamp(),
        };
        let fill = chain
            .evaluate_predicate(side.order.static_target, &ctx)
            .inspect_err(|err| warn!(hash = %hash, error = %err, "Predicate rejected match"))?;
        if fill > side.order.maximum_fill || fill < previous_fill {
            return Err(AtomatchError::InvalidFill {
                hash,
                previous: previous_fill,
                fill,
                maximum: side.order.maximum_fill,
            });
        }
        Ok(fill)
    }

    /// Run the settlement call through the order's agent: the maker's own
    /// proxy, or an owner-whitelisted executer admitted by [`Self::admit`].
    fn settle(chain: &mut Chain, exchange: Address, registry: Address, order: &Order, call: &Call) -> Result<()> {
        if order.executer.is_zero() {
            let proxy = proxy_of(chain, exchange, registry, order.maker)?;
            chain.call_sol(
                exchange,
                proxy,
                &IProxy::executeCall {
                    target: call.target,
                    howToCall: call.how_to_call.as_u8(),
                    data: call.data.clone(),
                },
            )?;
        } else {
            chain.call_sol(
                exchange,
                order.executer,
                &IExecuter::executeForCall {
                    maker: order.maker,
                    target: call.target,
                    howToCall: call.how_to_call.as_u8(),
                    data: call.data.clone(),
                },
            )?;
        }
        Ok(())
    }
}

impl Contract for Exchange {
    fn name(&self) -> &'static str {
        "Exchange"
    }

    fn construct(&self, chain: &mut Chain, frame: &Frame) -> Result<()> {
        chain.store_address(frame.address, owner_slot(), frame.caller)?;
        info!(
            exchange = %frame.address,
            name = %self.config.name,
            version = %self.config.version,
            chain_id = chain.chain_id(),
            "Exchange deployed"
        );
        Ok(())
    }

    fn execute(&self, chain: &mut Chain, frame: &Frame) -> Result<Bytes> {
        use IExchange::IExchangeCalls as Calls;

        let exchange = frame.address;
        match dispatch::<Calls>(self.name(), &frame.input)? {
            Calls::hashOrder(call) => {
                let order = Order::from_abi(&call.order)?;
                Ok(returns(&order.hash()))
            }
            Calls::hashToSign(call) => Ok(returns(&self.hasher(chain, exchange).hash_to_sign(&call.orderHash))),
            Calls::validateOrderParameters(call) => {
                let order = Order::from_abi(&call.order)?;
                let hash = order.hash();
                Ok(returns(&Self::parameters_valid(chain, exchange, &order, hash)))
            }
            Calls::validateOrderAuthorization(call) => {
                let path = self
                    .authorizer(chain, exchange)
                    .authorize(chain, call.hash, call.maker, frame.caller, &call.signature);
                Ok(returns(&path.is_some()))
            }
            Calls::approveOrderHash(call) => {
                Self::approve(chain, exchange, frame.caller, call.hash, None, false)?;
                Ok(Bytes::new())
            }
            Calls::approveOrder(call) => {
                let order = Order::from_abi(&call.order)?;
                if order.maker != frame.caller {
                    return Err(AtomatchError::Unauthorized {
                        caller: frame.caller,
                    });
                }
                let hash = order.hash();
                Self::approve(
                    chain,
                    exchange,
                    order.maker,
                    hash,
                    Some(order),
                    call.orderbookInclusionDesired,
                )?;
                Ok(Bytes::new())
            }
            Calls::setOrderFill(call) => {
                Self::set_fill(chain, exchange, frame.caller, call.hash, call.fill)?;
                info!(maker = %frame.caller, hash = %call.hash, fill = %call.fill, "Order fill set");
                Ok(Bytes::new())
            }
            Calls::fills(call) => Ok(returns(&FillLedger::new(exchange).get(chain.state(), call.maker, call.hash))),
            Calls::approved(call) => Ok(returns(
                &ApprovalLedger::new(exchange).is_approved(chain.state(), call.maker, call.hash),
            )),
            Calls::registries(call) => Ok(returns(&Self::registry_known(chain, exchange, call.registry))),
            Calls::addRegistry(call) => {
                Self::ensure_owner(chain, exchange, frame.caller)?;
                if call.registry.is_zero() {
                    return Err(AtomatchError::ZeroAddress);
                }
                if Self::registry_known(chain, exchange, call.registry) {
                    return Err(AtomatchError::AddressAlreadySet(call.registry));
                }
                chain.store_bool(exchange, registry_slot(call.registry), true)?;
                info!(exchange = %exchange, registry = %call.registry, "Registry added");
                Ok(Bytes::new())
            }
            Calls::executers(call) => Ok(returns(&Self::executer_trusted(chain, exchange, call.executer))),
            Calls::addExecuter(call) => {
                Self::ensure_owner(chain, exchange, frame.caller)?;
                if call.executer.is_zero() {
                    return Err(AtomatchError::ZeroAddress);
                }
                if !chain.has_code(call.executer) {
                    return Err(AtomatchError::ExecuterNotAllowed {
                        executer: call.executer,
                    });
                }
                if chain.load_bool(exchange, executer_slot(call.executer)) {
                    return Err(AtomatchError::AddressAlreadySet(call.executer));
                }
                chain.store_bool(exchange, executer_slot(call.executer), true)?;
                info!(exchange = %exchange, executer = %call.executer, "Executer added");
                Ok(Bytes::new())
            }
            Calls::atomicMatch(call) => {
                self.atomic_match(chain, frame, &call)?;
                Ok(Bytes::new())
            }
        }
    }
}

/// Deploy an exchange owned by `owner` that trusts `registry`.
pub fn deploy(chain: &mut Chain, owner: Address, config: ExchangeConfig, registry: Address) -> Result<Address> {
    let exchange = chain.deploy_contract(owner, Exchange::new(config)?)?;
    chain.transact_sol(owner, exchange, &IExchange::addRegistryCall { registry })?;
    Ok(exchange)
}

/// Let orders at `exchange` settle through `executer`. Owner only.
pub fn add_executer(chain: &mut Chain, exchange: Address, owner: Address, executer: Address) -> Result<()> {
    chain.transact_sol(owner, exchange, &IExchange::addExecuterCall { executer })?;
    Ok(())
}

/// Submit `request` to `atomicMatch` as `matcher`.
pub fn atomic_match(chain: &mut Chain, exchange: Address, matcher: Address, request: &MatchRequest) -> Result<()> {
    chain.transact(matcher, exchange, U256::ZERO, &request.encode())?;
    Ok(())
}
