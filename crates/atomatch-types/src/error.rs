//! Error types for Atomatch.
//!
//! All errors use the `AM_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by class:
//! - 1xx: Authorization errors (resubmit with a correct signature/approval)
//! - 2xx: Parameter / order-state errors (expired, cancelled, filled)
//! - 3xx: Structural / input errors (caller bug, not retryable as-is)
//! - 4xx: Execution errors (a downstream call failed)
//! - 5xx: Configuration / ownership errors
//! - 9xx: General / internal errors

use alloy_primitives::{Address, B256, Selector, U256};
use thiserror::Error;

/// Central error enum for all Atomatch operations.
#[derive(Debug, Error)]
pub enum AtomatchError {
    // =================================================================
    // Authorization Errors (1xx)
    // =================================================================
    /// The first order is neither signed, approved, sent by its maker, nor
    /// previously filled.
    #[error("AM_ERR_100: First order failed authorization: {hash}")]
    FirstOrderFailedAuthorization { hash: B256 },

    /// Same as [`Self::FirstOrderFailedAuthorization`] for the second order.
    #[error("AM_ERR_101: Second order failed authorization: {hash}")]
    SecondOrderFailedAuthorization { hash: B256 },

    /// `approveOrder` was called twice for the same `(maker, hash)`.
    #[error("AM_ERR_102: Order has already been approved: {hash}")]
    OrderHasAlreadyBeenApproved { hash: B256 },

    // =================================================================
    // Parameter / State Errors (2xx)
    // =================================================================
    /// The first order is expired, not yet listed, cancelled or fully filled.
    #[error("AM_ERR_200: First order has invalid parameters: {hash}")]
    FirstOrderHasInvalidParams { hash: B256 },

    /// Same as [`Self::FirstOrderHasInvalidParams`] for the second order.
    #[error("AM_ERR_201: Second order has invalid parameters: {hash}")]
    SecondOrderHasInvalidParams { hash: B256 },

    /// Fills are monotonic; `setOrderFill` cannot lower one.
    #[error("AM_ERR_202: Order fill cannot decrease: current {current}, requested {requested}")]
    OrderFillCannotDecrease { current: U256, requested: U256 },

    /// A predicate returned a fill outside `[previous, maximumFill]`.
    #[error("AM_ERR_203: Invalid fill {fill} for order {hash} (previous {previous}, maximum {maximum})")]
    InvalidFill {
        hash: B256,
        previous: U256,
        fill: U256,
        maximum: U256,
    },

    // =================================================================
    // Structural / Input Errors (3xx)
    // =================================================================
    /// Parallel input arrays have different lengths.
    #[error("AM_ERR_300: Lengths mismatch: {targets} targets, {values} values, {calldatas} calldatas")]
    LengthsMismatch {
        targets: usize,
        values: usize,
        calldatas: usize,
    },

    /// The orders name different registries, or a registry the exchange
    /// does not know.
    #[error("AM_ERR_301: Registry not added: {registry}")]
    RegistryNotAdded { registry: Address },

    /// Both orders share a maker (or are the same order).
    #[error("AM_ERR_302: Self-matching is prohibited for maker {maker}")]
    SelfMatchingIsProhibited { maker: Address },

    /// The executing agent of an order has no registered proxy.
    #[error("AM_ERR_303: Proxy does not exist for maker {maker}")]
    ProxyDoesNotExistForMaker { maker: Address },

    /// A settlement call targets an account without code.
    #[error("AM_ERR_304: Call target does not exist: {target}")]
    CallTargetDoesNotExist { target: Address },

    /// A wire `howToCall` value outside `{0, 1}`.
    #[error("AM_ERR_305: Invalid howToCall value {0}")]
    InvalidHowToCall(u8),

    /// The GlobalMaker decode table has no entry for this selector.
    #[error("AM_ERR_306: Unknown selector {selector}")]
    UnknownSelector { selector: Selector },

    /// Calldata too short, or a field that should be an address is dirty.
    #[error("AM_ERR_307: Malformed calldata: {reason}")]
    MalformedCalldata { reason: String },

    /// The maker decoded from forwarded calldata is not the order maker.
    #[error("AM_ERR_308: Maker mismatch: expected {expected}, calldata names {found}")]
    MakerMismatch { expected: Address, found: Address },

    /// A call mode the component refuses (e.g. delegatecall to an
    /// arbitrary target through a shared proxy).
    #[error("AM_ERR_309: Unsupported call mode: {reason}")]
    UnsupportedCallMode { reason: String },

    /// The callee has no function with this selector.
    #[error("AM_ERR_310: Function not found: {contract} has no selector {selector}")]
    FunctionNotFound {
        contract: &'static str,
        selector: Selector,
    },

    /// An order's static target holds no predicate.
    #[error("AM_ERR_311: Predicate not found at {target}")]
    PredicateNotFound { target: Address },

    /// A guarded entry point was re-entered.
    #[error("AM_ERR_312: Reentrant call blocked")]
    Reentrancy,

    /// An order names an executer the exchange does not trust.
    #[error("AM_ERR_313: Executer not allowed: {executer}")]
    ExecuterNotAllowed { executer: Address },

    // =================================================================
    // Execution Errors (4xx)
    // =================================================================
    /// An atomicized sub-call failed; the whole batch reverted.
    #[error("AM_ERR_400: Subcall {index} failed: {source}")]
    SubcallFailed {
        index: usize,
        #[source]
        source: Box<AtomatchError>,
    },

    /// The first settlement call failed.
    #[error("AM_ERR_401: First call failed: {source}")]
    FirstCallFailed {
        #[source]
        source: Box<AtomatchError>,
    },

    /// The second settlement call failed; the first call was rolled back.
    #[error("AM_ERR_402: Second call failed: {source}")]
    SecondCallFailed {
        #[source]
        source: Box<AtomatchError>,
    },

    /// A static predicate declared the two orders incompatible.
    #[error("AM_ERR_403: Predicate rejected the match: {reason}")]
    PredicateRejected { reason: String },

    /// A contract reverted with a reason string.
    #[error("AM_ERR_404: Reverted: {reason}")]
    Reverted { reason: String },

    /// Not enough native balance to carry a call's value.
    #[error("AM_ERR_405: Insufficient native balance: need {needed}, have {available}")]
    InsufficientNativeBalance { needed: U256, available: U256 },

    /// A state write or value transfer inside a static call.
    #[error("AM_ERR_406: State modification inside a static call")]
    StaticCallViolation,

    /// Nested frames exceeded the depth limit.
    #[error("AM_ERR_407: Call depth exceeded ({0})")]
    CallDepthExceeded(usize),

    // =================================================================
    // Configuration / Ownership Errors (5xx)
    // =================================================================
    /// The caller is not allowed to perform this operation.
    #[error("AM_ERR_500: Unauthorized caller {caller}")]
    Unauthorized { caller: Address },

    /// A one-time setting was already made.
    #[error("AM_ERR_501: Address already set: {0}")]
    AddressAlreadySet(Address),

    /// The user already owns a proxy.
    #[error("AM_ERR_502: User already has proxy: {user}")]
    UserAlreadyHasProxy { user: Address },

    /// Proxy ownership cannot move to an account that already owns one.
    #[error("AM_ERR_503: Proxy transfer destination already has a proxy: {destination}")]
    ProxyTransferDestinationExists { destination: Address },

    /// Exchange already authenticated in the registry.
    #[error("AM_ERR_504: Contract already allowed: {0}")]
    ContractAlreadyAllowed(Address),

    /// Exchange not authenticated in the registry.
    #[error("AM_ERR_505: Contract not allowed: {0}")]
    ContractNotAllowed(Address),

    /// The zero address is not acceptable here.
    #[error("AM_ERR_506: Zero address not allowed")]
    ZeroAddress,

    /// Invalid configuration (decode table, domain, etc.).
    #[error("AM_ERR_507: Invalid configuration: {0}")]
    InvalidConfiguration(String),

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// ABI encoding / decoding failure.
    #[error("AM_ERR_900: ABI error: {0}")]
    Abi(String),

    /// Serialization / deserialization error.
    #[error("AM_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Unrecoverable internal error.
    #[error("AM_ERR_902: Internal error: {0}")]
    Internal(String),
}

impl AtomatchError {
    /// Shorthand for a contract revert with a reason string.
    pub fn revert(reason: impl Into<String>) -> Self {
        Self::Reverted {
            reason: reason.into(),
        }
    }

    /// Walk boxed sources down to the innermost failure.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::SubcallFailed { source, .. }
            | Self::FirstCallFailed { source }
            | Self::SecondCallFailed { source } => source.root_cause(),
            other => other,
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, AtomatchError>;

impl From<alloy_sol_types::Error> for AtomatchError {
    fn from(err: alloy_sol_types::Error) -> Self {
        Self::Abi(err.to_string())
    }
}

impl From<serde_json::Error> for AtomatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
