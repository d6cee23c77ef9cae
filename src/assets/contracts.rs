//! ABI bindings for the two asset contracts and call-data helpers.

use alloy::primitives::{Address, Bytes};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::assets::types::TokenParams;
use crate::authorization::{AuthorizationMessage, MintAuthorization};
use crate::blockchain::rpc::ChainRpc;
use crate::blockchain::types::{BlockchainError, BlockchainResult};

sol! {
    /// Multi-token contract whose mints carry an administrator permit.
    interface IAdminMintableERC1155 {
        function nonces(address owner) external view returns (uint256);
        function balanceOf(address account, uint256 id) external view returns (uint256);
        function token_name(uint256 id) external view returns (string);
        function mintWithPermit(address to, uint256 id, uint256 amount, uint256 nonce, bytes signature) external;
        function burn(address from, uint256 id, uint256 amount) external;
    }

    /// Fungible token whose mints carry an administrator signature.
    interface IAdminMintableERC20 {
        function name() external view returns (string);
        function nonces(address owner) external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function mintWithSignature(uint256 amount, uint256 nonce, uint256 deadline, bytes signature) external;
        function burn(uint256 amount) external;
    }
}

/// Run a view call and decode its single return value.
pub async fn call_view<R, C>(rpc: &R, contract: Address, call: C) -> BlockchainResult<C::Return>
where
    R: ChainRpc,
    C: SolCall + Send,
{
    let data = Bytes::from(call.abi_encode());
    let raw = rpc.call(contract, data).await?;
    C::abi_decode_returns(&raw).map_err(|e| {
        BlockchainError::Rpc(format!("Could not decode {} result: {}", C::SIGNATURE, e))
    })
}

/// Call data that redeems `auth` on its contract.
pub fn encode_mint(auth: &MintAuthorization) -> Bytes {
    let signature = auth.signature_bytes();
    let encoded = match &auth.message {
        AuthorizationMessage::MultiToken(request) => IAdminMintableERC1155::mintWithPermitCall {
            to: request.to,
            id: request.id,
            amount: request.amount,
            nonce: request.nonce,
            signature,
        }
        .abi_encode(),
        AuthorizationMessage::Fungible(mint) => IAdminMintableERC20::mintWithSignatureCall {
            amount: mint.amount,
            nonce: mint.nonce,
            deadline: mint.deadline,
            signature,
        }
        .abi_encode(),
    };
    Bytes::from(encoded)
}

/// Call data that burns `params` held by `owner`.
///
/// The fungible `burn` always burns from the sender; the multi-token one
/// names the holder explicitly.
pub fn encode_burn(owner: Address, params: &TokenParams) -> Bytes {
    let encoded = match *params {
        TokenParams::MultiToken { id, amount } => IAdminMintableERC1155::burnCall {
            from: owner,
            id,
            amount,
        }
        .abi_encode(),
        TokenParams::Fungible { amount } => IAdminMintableERC20::burnCall { amount }.abi_encode(),
    };
    Bytes::from(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;

    #[test]
    fn test_selectors_match_contract_abi() {
        assert_eq!(IAdminMintableERC20::nameCall::SIGNATURE, "name()");
        assert_eq!(IAdminMintableERC20::noncesCall::SIGNATURE, "nonces(address)");
        assert_eq!(
            IAdminMintableERC1155::mintWithPermitCall::SIGNATURE,
            "mintWithPermit(address,uint256,uint256,uint256,bytes)"
        );
        assert_eq!(
            IAdminMintableERC20::mintWithSignatureCall::SIGNATURE,
            "mintWithSignature(uint256,uint256,uint256,bytes)"
        );
        assert_eq!(
            IAdminMintableERC1155::burnCall::SIGNATURE,
            "burn(address,uint256,uint256)"
        );
        assert_eq!(IAdminMintableERC20::burnCall::SIGNATURE, "burn(uint256)");
    }

    #[test]
    fn test_encode_burn_picks_contract_shape() {
        let owner = Address::repeat_byte(0x11);

        let nft = encode_burn(owner, &TokenParams::multi_token(2, 3));
        let decoded = IAdminMintableERC1155::burnCall::abi_decode(&nft).unwrap();
        assert_eq!(decoded.from, owner);
        assert_eq!(decoded.id, U256::from(2));
        assert_eq!(decoded.amount, U256::from(3));

        let token = encode_burn(owner, &TokenParams::fungible(U256::from(7)));
        assert_eq!(&token[..4], IAdminMintableERC20::burnCall::SELECTOR.as_slice());
        assert_eq!(token.len(), 4 + 32);
    }
}
