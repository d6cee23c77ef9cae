//! EIP-712 schemas and the signed authorization record.

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::signers::Signature;
use alloy::sol;
use alloy::sol_types::{Eip712Domain, SolStruct};
use thiserror::Error;

sol! {
    /// Multi-token permit: mint `amount` of token `id` to `to`.
    #[derive(Debug, PartialEq, Eq)]
    struct MintRequest {
        address to;
        uint256 id;
        uint256 amount;
        uint256 nonce;
    }

    /// Fungible permit: mint `amount` to `to`, valid until `deadline`.
    #[derive(Debug, PartialEq, Eq)]
    struct Mint {
        address to;
        uint256 amount;
        uint256 nonce;
        uint256 deadline;
    }
}

/// Ordered (name, type) pairs of the multi-token schema.
pub const MINT_REQUEST_FIELDS: &[(&str, &str)] = &[
    ("to", "address"),
    ("id", "uint256"),
    ("amount", "uint256"),
    ("nonce", "uint256"),
];

/// Ordered (name, type) pairs of the fungible schema.
pub const MINT_FIELDS: &[(&str, &str)] = &[
    ("to", "address"),
    ("amount", "uint256"),
    ("nonce", "uint256"),
    ("deadline", "uint256"),
];

/// Which authorization format a contract expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthorizationRole {
    /// Fungible `Mint` schema.
    Mint,
    /// Multi-token `MintRequest` schema.
    MintNft,
}

impl AuthorizationRole {
    pub fn primary_type(&self) -> &'static str {
        match self {
            AuthorizationRole::Mint => "Mint",
            AuthorizationRole::MintNft => "MintRequest",
        }
    }

    pub fn fields(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            AuthorizationRole::Mint => MINT_FIELDS,
            AuthorizationRole::MintNft => MINT_REQUEST_FIELDS,
        }
    }
}

/// Concrete message values for one of the two schemas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationMessage {
    Fungible(Mint),
    MultiToken(MintRequest),
}

impl AuthorizationMessage {
    pub fn role(&self) -> AuthorizationRole {
        match self {
            AuthorizationMessage::Fungible(_) => AuthorizationRole::Mint,
            AuthorizationMessage::MultiToken(_) => AuthorizationRole::MintNft,
        }
    }

    pub fn recipient(&self) -> Address {
        match self {
            AuthorizationMessage::Fungible(m) => m.to,
            AuthorizationMessage::MultiToken(m) => m.to,
        }
    }

    pub fn nonce(&self) -> U256 {
        match self {
            AuthorizationMessage::Fungible(m) => m.nonce,
            AuthorizationMessage::MultiToken(m) => m.nonce,
        }
    }

    /// EIP-712 digest of this message under `domain`.
    pub fn signing_hash(&self, domain: &Eip712Domain) -> B256 {
        match self {
            AuthorizationMessage::Fungible(m) => m.eip712_signing_hash(domain),
            AuthorizationMessage::MultiToken(m) => m.eip712_signing_hash(domain),
        }
    }
}

/// An administrator-countersigned mint permit. Single use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintAuthorization {
    pub domain: Eip712Domain,
    pub fields: &'static [(&'static str, &'static str)],
    pub message: AuthorizationMessage,
    pub signature: Signature,
}

impl MintAuthorization {
    pub fn role(&self) -> AuthorizationRole {
        self.message.role()
    }

    pub fn nonce(&self) -> U256 {
        self.message.nonce()
    }

    pub fn recipient(&self) -> Address {
        self.message.recipient()
    }

    /// Chain the domain is bound to.
    pub fn chain_id(&self) -> Option<u64> {
        self.domain
            .chain_id
            .and_then(|id| u64::try_from(id).ok())
    }

    pub fn verifying_contract(&self) -> Option<Address> {
        self.domain.verifying_contract
    }

    pub fn signing_hash(&self) -> B256 {
        self.message.signing_hash(&self.domain)
    }

    /// Address whose key produced the signature.
    pub fn recover_signer(&self) -> AuthorizationResult<Address> {
        self.signature
            .recover_address_from_prehash(&self.signing_hash())
            .map_err(|e| {
                AuthorizationError::SigningFailed(format!("Unrecoverable signature: {}", e))
            })
    }

    /// 65-byte r || s || v encoding expected by the contracts.
    pub fn signature_bytes(&self) -> Bytes {
        Bytes::from(self.signature.as_bytes().to_vec())
    }
}

/// Errors that can occur while producing an authorization.
#[derive(Debug, Error)]
pub enum AuthorizationError {
    #[error("Nonce query failed: {0}")]
    NonceQueryFailed(String),

    #[error("Chain query failed: {0}")]
    ChainQueryFailed(String),

    #[error("Contract query failed: {0}")]
    ContractQueryFailed(String),

    #[error("Authorization signing failed: {0}")]
    SigningFailed(String),

    /// The administrator key may not countersign its own request.
    #[error("Administrator {0} cannot authorize its own mint")]
    SelfAuthorization(Address),
}

/// Result type for authorization operations.
pub type AuthorizationResult<T> = Result<T, AuthorizationError>;

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::signers::local::PrivateKeySigner;
    use alloy::signers::SignerSync;

    fn encode_type(name: &str, fields: &[(&str, &str)]) -> String {
        let members: Vec<String> = fields
            .iter()
            .map(|(field, ty)| format!("{} {}", ty, field))
            .collect();
        format!("{}({})", name, members.join(","))
    }

    #[test]
    fn test_field_lists_match_struct_types() {
        assert_eq!(
            MintRequest::eip712_encode_type(),
            encode_type("MintRequest", MINT_REQUEST_FIELDS)
        );
        assert_eq!(Mint::eip712_encode_type(), encode_type("Mint", MINT_FIELDS));
        assert_eq!(
            MintRequest::eip712_encode_type(),
            "MintRequest(address to,uint256 id,uint256 amount,uint256 nonce)"
        );
    }

    #[test]
    fn test_roles() {
        assert_eq!(AuthorizationRole::MintNft.primary_type(), "MintRequest");
        assert_eq!(AuthorizationRole::Mint.fields(), MINT_FIELDS);
    }

    #[test]
    fn test_recover_signer_returns_signing_key() {
        let admin = PrivateKeySigner::random();
        let requester = Address::repeat_byte(0x42);

        let domain = Eip712Domain::new(
            Some("AdminMintableERC1155".into()),
            Some("1".into()),
            Some(U256::from(31337)),
            Some(Address::repeat_byte(0x99)),
            None,
        );
        let message = AuthorizationMessage::MultiToken(MintRequest {
            to: requester,
            id: U256::from(2),
            amount: U256::from(3),
            nonce: U256::ZERO,
        });
        let signature = admin
            .sign_hash_sync(&message.signing_hash(&domain))
            .unwrap();

        let auth = MintAuthorization {
            domain,
            fields: MINT_REQUEST_FIELDS,
            message,
            signature,
        };

        assert_eq!(auth.recover_signer().unwrap(), admin.address());
        assert_ne!(auth.recover_signer().unwrap(), requester);
        assert_eq!(auth.chain_id(), Some(31337));
        assert_eq!(auth.signature_bytes().len(), 65);
    }

    #[test]
    fn test_domain_binds_the_digest() {
        let message = AuthorizationMessage::Fungible(Mint {
            to: Address::repeat_byte(1),
            amount: U256::from(10),
            nonce: U256::from(4),
            deadline: U256::ZERO,
        });
        let on = |chain: u64| {
            Eip712Domain::new(
                Some("Token".into()),
                Some("1".into()),
                Some(U256::from(chain)),
                Some(Address::repeat_byte(2)),
                None,
            )
        };

        assert_ne!(message.signing_hash(&on(1)), message.signing_hash(&on(8453)));
    }
}
