//! ECDSA primitives shared by the exchange, contract wallets, and any
//! subsystem that authenticates makers the same way.

use alloy_primitives::{Address, B256, Signature, keccak256};

use crate::constants::{ECDSA_SIGNATURE_LEN, PERSONAL_SIGN_SUFFIX};

/// `keccak256("\x19Ethereum Signed Message:\n32" || hash)`.
#[must_use]
pub fn personal_sign_hash(hash: &B256) -> B256 {
    let mut buf = Vec::with_capacity(28 + 32);
    buf.extend_from_slice(b"\x19Ethereum Signed Message:\n32");
    buf.extend_from_slice(hash.as_slice());
    keccak256(buf)
}

/// Recover the signer of `prehash` from an `r || s || v` signature.
///
/// Returns `None` for malformed signatures. The zero address is never
/// returned.
#[must_use]
pub fn recover_signer(prehash: &B256, signature: &[u8]) -> Option<Address> {
    let raw = signature.get(..ECDSA_SIGNATURE_LEN)?;
    let sig = Signature::from_raw(raw).ok()?;
    let signer = sig.recover_address_from_prehash(prehash).ok()?;
    (!signer.is_zero()).then_some(signer)
}

/// Recover the signer of an EIP-712 digest, honouring the personal-sign
/// suffix: a signature longer than 65 bytes whose last byte is
/// [`PERSONAL_SIGN_SUFFIX`] was made over [`personal_sign_hash`] of the
/// digest.
#[must_use]
pub fn recover_order_signer(hash_to_sign: &B256, signature: &[u8]) -> Option<Address> {
    let prehash = if signature.len() > ECDSA_SIGNATURE_LEN
        && signature.last() == Some(&PERSONAL_SIGN_SUFFIX)
    {
        personal_sign_hash(hash_to_sign)
    } else {
        *hash_to_sign
    };
    recover_signer(&prehash, signature)
}
