//! System-wide constants for Atomatch.

/// ERC-1271 `isValidSignature(bytes32,bytes)` magic return value.
pub const EIP_1271_MAGIC_VALUE: [u8; 4] = [0x16, 0x26, 0xba, 0x7e];

/// Suffix byte marking a signature made over the personal-sign
/// (`"\x19Ethereum Signed Message:\n32"`) digest instead of the raw
/// EIP-712 digest.
pub const PERSONAL_SIGN_SUFFIX: u8 = 0x03;

/// Length of an `r || s || v` ECDSA signature.
pub const ECDSA_SIGNATURE_LEN: usize = 65;

/// Maximum nesting of call frames.
pub const MAX_CALL_DEPTH: usize = 1024;

/// Default chain id used in the EIP-712 domain.
pub const DEFAULT_CHAIN_ID: u64 = 1;

/// Default EIP-712 domain name of the exchange.
pub const DEFAULT_DOMAIN_NAME: &str = "Atomatch Exchange";

/// Default EIP-712 domain version of the exchange.
pub const DEFAULT_DOMAIN_VERSION: &str = "1.0";

/// Byte offset of the first argument word in ABI calldata.
pub const FIRST_ARGUMENT_OFFSET: usize = 4;

/// Size of one ABI word.
pub const ABI_WORD: usize = 32;

/// Package version, reported when logging starts.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name, reported when logging starts.
pub const ENGINE_NAME: &str = "Atomatch";
