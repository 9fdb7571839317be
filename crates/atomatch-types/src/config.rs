//! Configuration types for the chain substrate, the exchange and the
//! GlobalMaker adapter.

use std::collections::HashSet;

use alloy_primitives::Selector;
use alloy_sol_types::SolCall;
use serde::{Deserialize, Serialize};

use crate::{AtomatchError, Result, abi, constants};

/// Execution substrate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain id bound into every EIP-712 domain.
    pub chain_id: u64,
    /// Block timestamp at genesis. `None` means "now".
    #[serde(default)]
    pub genesis_timestamp: Option<u64>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: constants::DEFAULT_CHAIN_ID,
            genesis_timestamp: None,
        }
    }
}

/// Exchange configuration: the EIP-712 domain name and version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub name: String,
    pub version: String,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            name: constants::DEFAULT_DOMAIN_NAME.to_string(),
            version: constants::DEFAULT_DOMAIN_VERSION.to_string(),
        }
    }
}

impl ExchangeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AtomatchError::InvalidConfiguration(
                "exchange domain name is empty".into(),
            ));
        }
        if self.version.trim().is_empty() {
            return Err(AtomatchError::InvalidConfiguration(
                "exchange domain version is empty".into(),
            ));
        }
        Ok(())
    }
}

/// Message kinds the GlobalMaker knows how to attribute to a maker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// ERC-20 / ERC-721 `transferFrom(address,address,uint256)`.
    TransferFrom,
    /// ERC-721 `safeTransferFrom(address,address,uint256)`.
    Erc721SafeTransferFrom,
    /// ERC-721 `safeTransferFrom(address,address,uint256,bytes)`.
    Erc721SafeTransferFromWithData,
    /// ERC-1155 `safeTransferFrom(address,address,uint256,uint256,bytes)`.
    Erc1155SafeTransferFrom,
    /// Any other whitelisted function.
    Custom,
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TransferFrom => write!(f, "TRANSFER_FROM"),
            Self::Erc721SafeTransferFrom => write!(f, "ERC721_SAFE_TRANSFER_FROM"),
            Self::Erc721SafeTransferFromWithData => {
                write!(f, "ERC721_SAFE_TRANSFER_FROM_WITH_DATA")
            }
            Self::Erc1155SafeTransferFrom => write!(f, "ERC1155_SAFE_TRANSFER_FROM"),
            Self::Custom => write!(f, "CUSTOM"),
        }
    }
}

/// One row of the GlobalMaker decode table: the maker address is the ABI
/// word starting at `offset` in calldata beginning with `selector`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakerFieldConfig {
    pub kind: MessageKind,
    pub selector: Selector,
    pub offset: usize,
}

/// GlobalMaker deployment configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalMakerConfig {
    pub entries: Vec<MakerFieldConfig>,
}

impl Default for GlobalMakerConfig {
    /// The standard token transfer functions, each naming the maker in its
    /// first argument.
    fn default() -> Self {
        let first = constants::FIRST_ARGUMENT_OFFSET;
        Self {
            entries: vec![
                MakerFieldConfig {
                    kind: MessageKind::TransferFrom,
                    selector: abi::IERC20::transferFromCall::SELECTOR.into(),
                    offset: first,
                },
                MakerFieldConfig {
                    kind: MessageKind::Erc721SafeTransferFrom,
                    selector: abi::IERC721::safeTransferFrom_0Call::SELECTOR.into(),
                    offset: first,
                },
                MakerFieldConfig {
                    kind: MessageKind::Erc721SafeTransferFromWithData,
                    selector: abi::IERC721::safeTransferFrom_1Call::SELECTOR.into(),
                    offset: first,
                },
                MakerFieldConfig {
                    kind: MessageKind::Erc1155SafeTransferFrom,
                    selector: abi::IERC1155::safeTransferFromCall::SELECTOR.into(),
                    offset: first,
                },
            ],
        }
    }
}

impl GlobalMakerConfig {
    /// Parse a JSON document and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject tables the adapter could misread at call time.
    pub fn validate(&self) -> Result<()> {
        if self.entries.is_empty() {
            return Err(AtomatchError::InvalidConfiguration(
                "global maker decode table is empty".into(),
            ));
        }
        let mut seen = HashSet::with_capacity(self.entries.len());
        for entry in &self.entries {
            if !seen.insert(entry.selector) {
                return Err(AtomatchError::InvalidConfiguration(format!(
                    "duplicate selector {} in decode table",
                    entry.selector
                )));
            }
            if entry.offset < constants::FIRST_ARGUMENT_OFFSET
                || (entry.offset - constants::FIRST_ARGUMENT_OFFSET) % constants::ABI_WORD != 0
            {
                return Err(AtomatchError::InvalidConfiguration(format!(
                    "offset {} for selector {} ({}) is not an argument word boundary",
                    entry.offset, entry.selector, entry.kind
                )));
            }
        }
        Ok(())
    }
}
