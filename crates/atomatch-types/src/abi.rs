//! Solidity ABI surfaces of every component.
//!
//! Components talk to each other with ABI calldata, so selectors and byte
//! offsets are the real ones a deployed counterpart would see.

#![allow(clippy::too_many_arguments)]

use alloy_primitives::Selector;
use alloy_sol_types::sol;

use crate::{AtomatchError, Result};

sol! {
    /// EIP-712 / ABI view of an order. `extraData` is
    /// `abi.encode(listingTime, expirationTime, salt)`.
    #[derive(Debug, PartialEq, Eq)]
    struct Order {
        address registry;
        address maker;
        address executer;
        address staticTarget;
        bytes4 staticSelector;
        bytes staticExtradata;
        uint256 maximumFill;
        bytes extraData;
    }

    interface IProxy {
        function initialize(address user, address registry) external;
        function execute(address target, uint8 howToCall, bytes data) external returns (bytes result);
        function setRevoke(bool revoke) external;
        function transferAccessTo(address destination) external;
        function acceptAccess() external;
        function user() external view returns (address);
        function registry() external view returns (address);
        function revoked() external view returns (bool);
        function pendingOwner() external view returns (address);
    }

    interface IRegistry {
        function registerProxy() external returns (address proxy);
        function registerProxyFor(address user) external returns (address proxy);
        function proxies(address user) external view returns (address proxy);
        function contracts(address addr) external view returns (bool allowed);
        function grantInitialAuthentication(address exchange) external;
        function grantAuthentication(address exchange) external;
        function revokeAuthentication(address exchange) external;
        function transferAccessTo(address from, address to) external;
        function owner() external view returns (address);
        function transferOwnership(address newOwner) external;
    }

    interface IAtomicizer {
        function atomicize(address[] targets, uint256[] values, bytes[] calldatas) external;
    }

    interface IExecuter {
        function executeFor(address maker, address target, uint8 howToCall, bytes data) external returns (bytes result);
    }

    interface IGlobalMaker {
        function executeFor(address maker, address target, uint8 howToCall, bytes data) external returns (bytes result);
        function proxy() external view returns (address);
        function makerOffset(bytes4 selector) external view returns (uint256);
    }

    interface IExchange {
        function hashOrder(Order order) external view returns (bytes32);
        function hashToSign(bytes32 orderHash) external view returns (bytes32);
        function validateOrderParameters(Order order) external view returns (bool);
        function validateOrderAuthorization(bytes32 hash, address maker, bytes signature) external view returns (bool);
        function approveOrderHash(bytes32 hash) external;
        function approveOrder(Order order, bool orderbookInclusionDesired) external;
        function setOrderFill(bytes32 hash, uint256 fill) external;
        function fills(address maker, bytes32 hash) external view returns (uint256);
        function approved(address maker, bytes32 hash) external view returns (bool);
        function registries(address registry) external view returns (bool);
        function addRegistry(address registry) external;
        function executers(address executer) external view returns (bool);
        function addExecuter(address executer) external;
        function atomicMatch(
            address[10] addrs,
            uint256[8] uints,
            bytes4[2] staticSelectors,
            bytes firstExtradata,
            bytes firstCalldata,
            bytes secondExtradata,
            bytes secondCalldata,
            uint8[2] howToCalls,
            bytes32 metadata,
            bytes signatures
        ) external;
    }

    interface IERC20 {
        function transfer(address to, uint256 amount) external returns (bool);
        function transferFrom(address from, address to, uint256 amount) external returns (bool);
        function approve(address spender, uint256 amount) external returns (bool);
        function balanceOf(address owner) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
    }

    interface IERC721 {
        function transferFrom(address from, address to, uint256 tokenId) external;
        function safeTransferFrom(address from, address to, uint256 tokenId) external;
        function safeTransferFrom(address from, address to, uint256 tokenId, bytes data) external;
        function approve(address to, uint256 tokenId) external;
        function setApprovalForAll(address operator, bool approved) external;
        function ownerOf(uint256 tokenId) external view returns (address);
        function isApprovedForAll(address owner, address operator) external view returns (bool);
    }

    interface IERC1155 {
        function safeTransferFrom(address from, address to, uint256 id, uint256 amount, bytes data) external;
    }

    interface IERC1271 {
        function isValidSignature(bytes32 hash, bytes signature) external view returns (bytes4 magicValue);
    }

    interface IStaticMarket {
        function any(bytes extra) external view returns (uint256);
        function ERC721ForERC20(bytes extra) external view returns (uint256);
        function ERC20ForERC721(bytes extra) external view returns (uint256);
        function ERC20ForERC20(bytes extra) external view returns (uint256);
        function ERC721ForERC20WithPayouts(bytes extra) external view returns (uint256);
    }

    interface ITestToken {
        function mint(address to, uint256 amountOrId) external;
    }

    interface IWallet {
        function execute(address target, bytes data) external returns (bytes result);
        function owner() external view returns (address);
    }
}

/// The 4-byte function selector at the head of `calldata`.
pub fn selector_of(calldata: &[u8]) -> Result<Selector> {
    calldata
        .get(..4)
        .map(Selector::from_slice)
        .ok_or_else(|| AtomatchError::MalformedCalldata {
            reason: format!("calldata of {} bytes has no selector", calldata.len()),
        })
}
