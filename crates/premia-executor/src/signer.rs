//! EIP-712 quote signing.
//!
//! A quote is signed as the typed struct `FillQuoteOB` under the domain
//! `{name: "Premia", version: "1", chainId, verifyingContract: pool}`.
//! The signing digest doubles as the quote id, which is also the hash the
//! pool contract uses to cancel the quote.

use std::path::PathBuf;
use std::sync::Arc;

use alloy::primitives::{keccak256, Address, PrimitiveSignature, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer as AlloySigner;
use alloy::sol;
use alloy::sol_types::{eip712_domain, Eip712Domain, SolStruct};
use premia_core::{to_wad, CoreError, PoolKey, QuoteRequest, SignedQuote, SplitSignature};
use premia_registry::BoxFuture;
use serde_json::json;
use thiserror::Error;
use tracing::debug;
use zeroize::Zeroizing;

use crate::salt::{Clock, SaltGenerator};

// =============================================================================
// Key loading
// =============================================================================

/// Source of the maker private key.
#[derive(Debug, Clone)]
pub enum KeySource {
    /// Load from environment variable (development).
    EnvVar { var_name: String },
    /// Load from file (production, recommend 0600 permissions).
    File { path: PathBuf },
}

/// Holds the maker key loaded at startup.
///
/// Never log private key material.
pub struct KeyManager {
    signer: PrivateKeySigner,
}

impl KeyManager {
    /// Load the key and optionally verify the derived address.
    ///
    /// # Errors
    /// Returns `KeyError` if the variable or file is missing, the hex is
    /// malformed, the key is invalid or the address does not match.
    pub fn load(source: &KeySource, expected_address: Option<Address>) -> Result<Self, KeyError> {
        let secret_bytes: Zeroizing<Vec<u8>> = match source {
            KeySource::EnvVar { var_name } => {
                let hex = Zeroizing::new(
                    std::env::var(var_name)
                        .map_err(|_| KeyError::EnvVarNotFound(var_name.clone()))?,
                );
                parse_hex_key(&hex)?
            }
            KeySource::File { path } => {
                let content = Zeroizing::new(std::fs::read_to_string(path)?);
                parse_hex_key(&content)?
            }
        };

        Self::from_bytes(&secret_bytes, expected_address)
    }

    /// Build from raw key bytes.
    pub fn from_bytes(
        secret_bytes: &[u8],
        expected_address: Option<Address>,
    ) -> Result<Self, KeyError> {
        let signer = PrivateKeySigner::from_slice(secret_bytes)
            .map_err(|e| KeyError::InvalidKey(e.to_string()))?;

        let actual = AlloySigner::address(&signer);
        if let Some(expected) = expected_address {
            if actual != expected {
                return Err(KeyError::AddressMismatch { expected, actual });
            }
        }

        Ok(Self { signer })
    }

    pub fn address(&self) -> Address {
        AlloySigner::address(&self.signer)
    }

    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }

    pub fn into_signer(self) -> PrivateKeySigner {
        self.signer
    }
}

/// Accepts an optional `0x` prefix and surrounding whitespace.
fn parse_hex_key(hex_str: &str) -> Result<Zeroizing<Vec<u8>>, KeyError> {
    let trimmed = hex_str.trim().trim_start_matches("0x");
    Ok(Zeroizing::new(hex::decode(trimmed)?))
}

/// Key management errors.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Failed to decode hex: {0}")]
    HexDecode(#[from] hex::FromHexError),

    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("Address mismatch: expected {expected}, got {actual}")]
    AddressMismatch { expected: Address, actual: Address },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Typed message
// =============================================================================

pub const EIP712_DOMAIN_NAME: &str = "Premia";
pub const EIP712_DOMAIN_VERSION: &str = "1";
pub const PRIMARY_TYPE: &str = "FillQuoteOB";

sol! {
    #[derive(Debug, PartialEq, Eq)]
    struct FillQuoteOB {
        address provider;
        address taker;
        uint256 price;
        uint256 size;
        bool isBuy;
        uint256 deadline;
        uint256 salt;
    }
}

/// A quote ready to be hashed or signed, bound to one pool contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedMessage {
    pub chain_id: u64,
    pub verifying_contract: Address,
    pub quote: FillQuoteOB,
}

impl TypedMessage {
    pub fn domain(&self) -> Eip712Domain {
        let chain_id = self.chain_id;
        let verifying_contract = self.verifying_contract;
        eip712_domain! {
            name: EIP712_DOMAIN_NAME,
            version: EIP712_DOMAIN_VERSION,
            chain_id: chain_id,
            verifying_contract: verifying_contract,
        }
    }

    /// Standard `{types, primaryType, domain, message}` JSON.
    ///
    /// Integers in the message are decimal strings.
    pub fn to_json(&self) -> serde_json::Value {
        let q = &self.quote;
        json!({
            "types": {
                "EIP712Domain": [
                    {"name": "name", "type": "string"},
                    {"name": "version", "type": "string"},
                    {"name": "chainId", "type": "uint256"},
                    {"name": "verifyingContract", "type": "address"},
                ],
                "FillQuoteOB": [
                    {"name": "provider", "type": "address"},
                    {"name": "taker", "type": "address"},
                    {"name": "price", "type": "uint256"},
                    {"name": "size", "type": "uint256"},
                    {"name": "isBuy", "type": "bool"},
                    {"name": "deadline", "type": "uint256"},
                    {"name": "salt", "type": "uint256"},
                ],
            },
            "primaryType": PRIMARY_TYPE,
            "domain": {
                "name": EIP712_DOMAIN_NAME,
                "version": EIP712_DOMAIN_VERSION,
                "chainId": self.chain_id,
                "verifyingContract": self.verifying_contract.to_string(),
            },
            "message": {
                "provider": q.provider.to_string(),
                "taker": q.taker.to_string(),
                "price": q.price.to_string(),
                "size": q.size.to_string(),
                "isBuy": q.isBuy,
                "deadline": q.deadline.to_string(),
                "salt": q.salt.to_string(),
            },
        })
    }
}

/// `hashStruct(FillQuoteOB)`.
pub fn compute_struct_hash(message: &TypedMessage) -> B256 {
    message.quote.eip712_hash_struct()
}

/// `keccak256("\x19\x01" || domainSeparator || structHash)`.
pub fn compute_digest(message: &TypedMessage) -> B256 {
    let mut data = Vec::with_capacity(66);
    data.extend_from_slice(&[0x19, 0x01]);
    data.extend_from_slice(message.domain().hash_struct().as_slice());
    data.extend_from_slice(compute_struct_hash(message).as_slice());
    keccak256(&data)
}

/// Split a signature into `r`, `s` and `v` as 27/28.
pub fn split_signature(signature: &PrimitiveSignature) -> SplitSignature {
    SplitSignature {
        r: B256::from(signature.r().to_be_bytes::<32>()),
        s: B256::from(signature.s().to_be_bytes::<32>()),
        v: 27 + u8::from(signature.v()),
    }
}

/// Recover the signing address of `digest`. Accepts `v` as 0/1 or 27/28.
pub fn recover_signer(digest: &B256, signature: &SplitSignature) -> Result<Address, SignerError> {
    let parity = match signature.v {
        0 | 27 => false,
        1 | 28 => true,
        v => return Err(SignerError::Recovery(format!("invalid recovery id {v}"))),
    };
    let signature = PrimitiveSignature::new(
        U256::from_be_bytes(signature.r.0),
        U256::from_be_bytes(signature.s.0),
        parity,
    );
    signature
        .recover_address_from_prehash(digest)
        .map_err(|e| SignerError::Recovery(e.to_string()))
}

/// Whether `signature` over `message` was produced by `expected`.
pub fn verify(message: &TypedMessage, signature: &SplitSignature, expected: Address) -> bool {
    recover_signer(&compute_digest(message), signature).is_ok_and(|a| a == expected)
}

// =============================================================================
// Signers
// =============================================================================

/// Signing errors.
#[derive(Debug, Error)]
pub enum SignerError {
    #[error("Signing failed: {0}")]
    SigningFailed(#[from] alloy::signers::Error),

    #[error("Signature recovery failed: {0}")]
    Recovery(String),

    #[error(transparent)]
    Amount(#[from] CoreError),
}

/// Anything that can sign EIP-712 typed data.
pub trait TypedDataSigner: Send + Sync {
    fn address(&self) -> Address;

    fn sign_typed_data<'a>(
        &'a self,
        message: &'a TypedMessage,
    ) -> BoxFuture<'a, Result<PrimitiveSignature, SignerError>>;
}

impl TypedDataSigner for PrivateKeySigner {
    fn address(&self) -> Address {
        AlloySigner::address(self)
    }

    fn sign_typed_data<'a>(
        &'a self,
        message: &'a TypedMessage,
    ) -> BoxFuture<'a, Result<PrimitiveSignature, SignerError>> {
        Box::pin(async move {
            let digest = message.quote.eip712_signing_hash(&message.domain());
            Ok(self.sign_hash(&digest).await?)
        })
    }
}

/// Builds, signs and identifies quotes for the maker key.
pub struct QuoteSigner {
    signer: Arc<dyn TypedDataSigner>,
    chain_id: u64,
    salts: SaltGenerator,
}

impl QuoteSigner {
    pub fn new(signer: Arc<dyn TypedDataSigner>, chain_id: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            signer,
            chain_id,
            salts: SaltGenerator::new(clock),
        }
    }

    /// Maker address that provides every issued quote.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn build_message(&self, pool: Address, quote: FillQuoteOB) -> TypedMessage {
        TypedMessage {
            chain_id: self.chain_id,
            verifying_contract: pool,
            quote,
        }
    }

    pub async fn sign(&self, message: &TypedMessage) -> Result<SplitSignature, SignerError> {
        // NOTE: Do not log signatures.
        let signature = self.signer.sign_typed_data(message).await?;
        Ok(split_signature(&signature))
    }

    /// Sign a validated request for the given pool.
    ///
    /// The deadline becomes absolute and a fresh salt is drawn.
    pub async fn issue(
        &self,
        request: &QuoteRequest,
        pool_key: PoolKey,
        pool_address: Address,
    ) -> Result<SignedQuote, SignerError> {
        let salt = self.salts.next();
        let deadline = self.salts.clock().now_secs() + request.deadline;
        let price = to_wad(request.price)?;
        let size = to_wad(request.size)?;
        let taker = request.taker.unwrap_or(Address::ZERO);
        let is_buy = request.side.is_buy();

        let message = self.build_message(
            pool_address,
            FillQuoteOB {
                provider: self.address(),
                taker,
                price,
                size,
                isBuy: is_buy,
                deadline: U256::from(deadline),
                salt: U256::from(salt),
            },
        );
        let quote_id = compute_digest(&message);
        let signature = self.sign(&message).await?;

        debug!(pool = %pool_address, %quote_id, deadline, salt, "Signed quote");

        Ok(SignedQuote {
            pool_key,
            pool_address,
            chain_id: self.chain_id,
            provider: self.address(),
            taker,
            price,
            size,
            is_buy,
            deadline,
            salt,
            signature,
            quote_id,
        })
    }
}

/// Message for a quote that has already been issued.
pub fn message_for(quote: &SignedQuote) -> TypedMessage {
    TypedMessage {
        chain_id: quote.chain_id,
        verifying_contract: quote.pool_address,
        quote: FillQuoteOB {
            provider: quote.provider,
            taker: quote.taker,
            price: quote.price,
            size: quote.size,
            isBuy: quote.is_buy,
            deadline: U256::from(quote.deadline),
            salt: U256::from(quote.salt),
        },
    }
}
