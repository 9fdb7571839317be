//! Test contracts: minimal tokens, a contract wallet and two hostile
//! targets.
//!
//! The tokens implement just enough of ERC-20 / ERC-721 for settlement
//! calls to move real balances. Anyone may mint.

use alloy_sol_types::SolCall;
use atomatch_types::{
    Address, AtomatchError, Bytes, Result, Selector, U256,
    abi::{IERC20, IERC721, IERC1271, ITestToken, IWallet},
    constants::EIP_1271_MAGIC_VALUE,
    signature::recover_signer,
};

use crate::{Chain, Contract, Frame, Slot, dispatch, returns};

fn word(value: U256) -> [u8; 32] {
    value.to_be_bytes::<32>()
}

fn add(chain: &mut Chain, address: Address, slot: Slot, amount: U256) -> Result<()> {
    let current = chain.load_u256(address, slot);
    chain.store_u256(address, slot, current + amount)
}

fn sub(chain: &mut Chain, address: Address, slot: Slot, amount: U256, reason: &str) -> Result<()> {
    let current = chain.load_u256(address, slot);
    let next = current
        .checked_sub(amount)
        .ok_or_else(|| AtomatchError::revert(reason))?;
    chain.store_u256(address, slot, next)
}

// ---------------------------------------------------------------------------
// TestErc20
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy)]
pub struct TestErc20;

impl TestErc20 {
    fn balance_slot(owner: Address) -> Slot {
        Slot::named("erc20.balances").at(owner.as_slice())
    }

    fn allowance_slot(owner: Address, spender: Address) -> Slot {
        Slot::named("erc20.allowances")
            .at(owner.as_slice())
            .at(spender.as_slice())
    }

    fn transfer(chain: &mut Chain, token: Address, from: Address, to: Address, amount: U256) -> Result<()> {
        if to.is_zero() {
            return Err(AtomatchError::revert("ERC20: transfer to the zero address"));
        }
        sub(
            chain,
            token,
            Self::balance_slot(from),
            amount,
            "ERC20: transfer amount exceeds balance",
        )?;
        add(chain, token, Self::balance_slot(to), amount)
    }
}

impl Contract for TestErc20 {
    fn name(&self) -> &'static str {
        "TestErc20"
    }

    fn execute(&self, chain: &mut Chain, frame: &Frame) -> Result<Bytes> {
        let token = frame.address;
        if frame.selector()? == Selector::from(ITestToken::mintCall::SELECTOR) {
            let call: ITestToken::mintCall = frame.decode()?;
            add(chain, token, Self::balance_slot(call.to), call.amountOrId)?;
            return Ok(Bytes::new());
        }
        match dispatch::<IERC20::IERC20Calls>(self.name(), &frame.input)? {
            IERC20::IERC20Calls::transfer(call) => {
                Self::transfer(chain, token, frame.caller, call.to, call.amount)?;
                Ok(returns(&true))
            }
            IERC20::IERC20Calls::transferFrom(call) => {
                if frame.caller != call.from {
                    let slot = Self::allowance_slot(call.from, frame.caller);
                    if chain.load_u256(token, slot) != U256::MAX {
                        sub(chain, token, slot, call.amount, "ERC20: insufficient allowance")?;
                    }
                }
                Self::transfer(chain, token, call.from, call.to, call.amount)?;
                Ok(returns(&true))
            }
            IERC20::IERC20Calls::approve(call) => {
                chain.store_u256(token, Self::allowance_slot(frame.caller, call.spender), call.amount)?;
                Ok(returns(&true))
            }
            IERC20::IERC20Calls::balanceOf(call) => {
                Ok(returns(&chain.load_u256(token, Self::balance_slot(call.owner))))
            }
            IERC20::IERC20Calls::allowance(call) => Ok(returns(
                &chain.load_u256(token, Self::allowance_slot(call.owner, call.spender)),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// TestErc721
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy)]
pub struct TestErc721;

impl TestErc721 {
    fn owner_slot(id: U256) -> Slot {
        Slot::named("erc721.owners").at(&word(id))
    }

    fn approval_slot(id: U256) -> Slot {
        Slot::named("erc721.approvals").at(&word(id))
    }

    fn operator_slot(owner: Address, operator: Address) -> Slot {
        Slot::named("erc721.operators")
            .at(owner.as_slice())
            .at(operator.as_slice())
    }

    fn balance_slot(owner: Address) -> Slot {
        Slot::named("erc721.balances").at(owner.as_slice())
    }

    fn transfer(
        chain: &mut Chain,
        token: Address,
        caller: Address,
        from: Address,
        to: Address,
        id: U256,
    ) -> Result<()> {
        let owner = chain.load_address(token, Self::owner_slot(id));
        if owner.is_zero() {
            return Err(AtomatchError::revert("ERC721: invalid token ID"));
        }
        if owner != from {
            return Err(AtomatchError::revert("ERC721: transfer from incorrect owner"));
        }
        if to.is_zero() {
            return Err(AtomatchError::revert("ERC721: transfer to the zero address"));
        }
        let approved = chain.load_address(token, Self::approval_slot(id)) == caller;
        let operator = chain.load_bool(token, Self::operator_slot(owner, caller));
        if caller != owner && !approved && !operator {
            return Err(AtomatchError::revert(
                "ERC721: caller is not token owner or approved",
            ));
        }
        chain.store_address(token, Self::approval_slot(id), Address::ZERO)?;
        chain.store_address(token, Self::owner_slot(id), to)?;
        sub(chain, token, Self::balance_slot(from), U256::from(1), "ERC721: balance underflow")?;
        add(chain, token, Self::balance_slot(to), U256::from(1))
    }
}

impl Contract for TestErc721 {
    fn name(&self) -> &'static str {
        "TestErc721"
    }

    fn execute(&self, chain: &mut Chain, frame: &Frame) -> Result<Bytes> {
        use IERC721::IERC721Calls as Calls;

        let token = frame.address;
        if frame.selector()? == Selector::from(ITestToken::mintCall::SELECTOR) {
            let call: ITestToken::mintCall = frame.decode()?;
            let slot = Self::owner_slot(call.amountOrId);
            if !chain.load_address(token, slot).is_zero() {
                return Err(AtomatchError::revert("ERC721: token already minted"));
            }
            chain.store_address(token, slot, call.to)?;
            add(chain, token, Self::balance_slot(call.to), U256::from(1))?;
            return Ok(Bytes::new());
        }
        match dispatch::<Calls>(self.name(), &frame.input)? {
            Calls::transferFrom(call) => {
                Self::transfer(chain, token, frame.caller, call.from, call.to, call.tokenId)?;
                Ok(Bytes::new())
            }
            // Receiver hooks are not modelled; the safe variants behave
            // like `transferFrom`.
            Calls::safeTransferFrom_0(call) => {
                Self::transfer(chain, token, frame.caller, call.from, call.to, call.tokenId)?;
                Ok(Bytes::new())
            }
            Calls::safeTransferFrom_1(call) => {
                Self::transfer(chain, token, frame.caller, call.from, call.to, call.tokenId)?;
                Ok(Bytes::new())
            }
            Calls::approve(call) => {
                let owner = chain.load_address(token, Self::owner_slot(call.tokenId));
                if frame.caller != owner
                    && !chain.load_bool(token, Self::operator_slot(owner, frame.caller))
                {
                    return Err(AtomatchError::revert(
                        "ERC721: approve caller is not token owner or approved for all",
                    ));
                }
                chain.store_address(token, Self::approval_slot(call.tokenId), call.to)?;
                Ok(Bytes::new())
            }
            Calls::setApprovalForAll(call) => {
                chain.store_bool(
                    token,
                    Self::operator_slot(frame.caller, call.operator),
                    call.approved,
                )?;
                Ok(Bytes::new())
            }
            Calls::ownerOf(call) => {
                let owner = chain.load_address(token, Self::owner_slot(call.tokenId));
                if owner.is_zero() {
                    return Err(AtomatchError::revert("ERC721: invalid token ID"));
                }
                Ok(returns(&owner))
            }
            Calls::isApprovedForAll(call) => Ok(returns(
                &chain.load_bool(token, Self::operator_slot(call.owner, call.operator)),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Erc1271Wallet
// ---------------------------------------------------------------------------

/// A contract account controlled by one EOA. Accepts ERC-1271 signatures
/// made by that EOA over the raw hash.
#[derive(Debug, Clone, Copy)]
pub struct Erc1271Wallet {
    pub owner: Address,
}

impl Contract for Erc1271Wallet {
    fn name(&self) -> &'static str {
        "Erc1271Wallet"
    }

    fn execute(&self, chain: &mut Chain, frame: &Frame) -> Result<Bytes> {
        if frame.selector()? == Selector::from(IERC1271::isValidSignatureCall::SELECTOR) {
            let call: IERC1271::isValidSignatureCall = frame.decode()?;
            let valid = recover_signer(&call.hash, &call.signature) == Some(self.owner);
            let magic = if valid {
                EIP_1271_MAGIC_VALUE
            } else {
                [0xff; 4]
            };
            return Ok(returns(&alloy_primitives::FixedBytes::<4>(magic)));
        }
        match dispatch::<IWallet::IWalletCalls>(self.name(), &frame.input)? {
            IWallet::IWalletCalls::execute(call) => {
                if frame.caller != self.owner {
                    return Err(AtomatchError::Unauthorized {
                        caller: frame.caller,
                    });
                }
                let result = chain.call(frame.address, call.target, U256::ZERO, &call.data)?;
                Ok(returns(&result))
            }
            IWallet::IWalletCalls::owner(_) => Ok(returns(&self.owner)),
        }
    }
}

// ---------------------------------------------------------------------------
// Hostile targets
// ---------------------------------------------------------------------------

/// Fails every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct Reverter;

impl Contract for Reverter {
    fn name(&self) -> &'static str {
        "Reverter"
    }

    fn execute(&self, _chain: &mut Chain, _frame: &Frame) -> Result<Bytes> {
        Err(AtomatchError::revert("Reverter: always reverts"))
    }
}

/// Calls `target` with `payload` whenever it is called.
#[derive(Debug, Clone)]
pub struct Reenterer {
    pub target: Address,
    pub payload: Bytes,
}

impl Contract for Reenterer {
    fn name(&self) -> &'static str {
        "Reenterer"
    }

    fn execute(&self, chain: &mut Chain, frame: &Frame) -> Result<Bytes> {
        chain.call(frame.address, self.target, U256::ZERO, &self.payload)
    }
}

// ---------------------------------------------------------------------------
// Convenience reads
// ---------------------------------------------------------------------------

pub fn erc20_balance(chain: &mut Chain, token: Address, owner: Address) -> Result<U256> {
    chain.view(owner, token, &IERC20::balanceOfCall { owner })
}

pub fn erc721_owner(chain: &mut Chain, token: Address, id: U256) -> Result<Address> {
    chain.view(Address::ZERO, token, &IERC721::ownerOfCall { tokenId: id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_signer::SignerSync;
    use atomatch_types::B256;
    use alloy_signer_local::PrivateKeySigner;

    fn chain() -> Chain {
        Chain::new(&atomatch_types::ChainConfig {
            chain_id: 1,
            genesis_timestamp: Some(0),
        })
    }

    #[test]
    fn erc20_transfer_from_respects_allowance() {
        let mut chain = chain();
        let alice = Address::repeat_byte(0xa1);
        let bob = Address::repeat_byte(0xb0);
        let token = chain.deploy_contract(alice, TestErc20).unwrap();
        chain
            .transact_sol(alice, token, &ITestToken::mintCall { to: alice, amountOrId: U256::from(100) })
            .unwrap();

        let pull = IERC20::transferFromCall {
            from: alice,
            to: bob,
            amount: U256::from(30),
        };
        assert!(chain.transact_sol(bob, token, &pull).is_err());

        chain
            .transact_sol(alice, token, &IERC20::approveCall { spender: bob, amount: U256::from(50) })
            .unwrap();
        chain.transact_sol(bob, token, &pull).unwrap();
        assert_eq!(erc20_balance(&mut chain, token, alice).unwrap(), U256::from(70));
        assert_eq!(erc20_balance(&mut chain, token, bob).unwrap(), U256::from(30));

        let allowance: U256 = chain
            .view(bob, token, &IERC20::allowanceCall { owner: alice, spender: bob })
            .unwrap();
        assert_eq!(allowance, U256::from(20));
    }

    #[test]
    fn erc721_operator_can_move_token() {
        let mut chain = chain();
        let alice = Address::repeat_byte(0xa1);
        let operator = Address::repeat_byte(0x0f);
        let bob = Address::repeat_byte(0xb0);
        let nft = chain.deploy_contract(alice, TestErc721).unwrap();
        let id = U256::from(10);
        chain
            .transact_sol(alice, nft, &ITestToken::mintCall { to: alice, amountOrId: id })
            .unwrap();

        let xfer = IERC721::transferFromCall {
            from: alice,
            to: bob,
            tokenId: id,
        };
        assert!(chain.transact_sol(operator, nft, &xfer).is_err());
        chain
            .transact_sol(
                alice,
                nft,
                &IERC721::setApprovalForAllCall { operator, approved: true },
            )
            .unwrap();
        chain.transact_sol(operator, nft, &xfer).unwrap();
        assert_eq!(erc721_owner(&mut chain, nft, id).unwrap(), bob);
    }

    #[test]
    fn wallet_checks_owner_signature() {
        let mut chain = chain();
        let signer = PrivateKeySigner::random();
        let owner = signer.address();
        let wallet = chain
            .deploy_contract(owner, Erc1271Wallet { owner })
            .unwrap();

        let hash = B256::repeat_byte(0x5a);
        let sig = signer.sign_hash_sync(&hash).unwrap().as_bytes();
        let magic: alloy_primitives::FixedBytes<4> = chain
            .view(
                owner,
                wallet,
                &IERC1271::isValidSignatureCall {
                    hash,
                    signature: Bytes::from(sig.to_vec()),
                },
            )
            .unwrap();
        assert_eq!(magic.0, EIP_1271_MAGIC_VALUE);

        let stranger = PrivateKeySigner::random();
        let sig = stranger.sign_hash_sync(&hash).unwrap().as_bytes();
        let magic: alloy_primitives::FixedBytes<4> = chain
            .view(
                owner,
                wallet,
                &IERC1271::isValidSignatureCall {
                    hash,
                    signature: Bytes::from(sig.to_vec()),
                },
            )
            .unwrap();
        assert_ne!(magic.0, EIP_1271_MAGIC_VALUE);
    }

    #[test]
    fn wallet_execute_is_owner_only() {
        let mut chain = chain();
        let owner = Address::repeat_byte(0x01);
        let wallet = chain.deploy_contract(owner, Erc1271Wallet { owner }).unwrap();
        let call = IWallet::executeCall {
            target: Address::repeat_byte(0x99),
            data: Bytes::new(),
        };
        assert!(matches!(
            chain.transact_sol(Address::repeat_byte(0x02), wallet, &call),
            Err(AtomatchError::Unauthorized { .. })
        ));
        chain.transact_sol(owner, wallet, &call).unwrap();
    }

    #[test]
    fn unknown_function_is_reported() {
        let mut chain = chain();
        let token = chain.deploy_contract(Address::ZERO, TestErc20).unwrap();
        let err = chain
            .transact(Address::ZERO, token, U256::ZERO, &[0xde, 0xad, 0xbe, 0xef])
            .unwrap_err();
        assert!(matches!(err, AtomatchError::FunctionNotFound { .. }));
    }
}
