//! Wire format of the transactions this CLI signs

use base64::Engine;
use borsh::BorshSerialize;
use sha2::{Digest, Sha256};
use std::io::Write;

use crate::crypto::{KeyPair, PublicKey, Signature};
use crate::error::{NearCliError, Result};

pub type CryptoHash = [u8; 32];

#[derive(BorshSerialize, Debug, Clone, PartialEq)]
pub struct FunctionCallPermission {
    pub allowance: Option<u128>,
    pub receiver_id: String,
    pub method_names: Vec<String>,
}

#[derive(BorshSerialize, Debug, Clone, PartialEq)]
pub enum AccessKeyPermission {
    FunctionCall(FunctionCallPermission),
    FullAccess,
}

#[derive(BorshSerialize, Debug, Clone, PartialEq)]
pub struct AccessKey {
    pub nonce: u64,
    pub permission: AccessKeyPermission,
}

impl AccessKey {
    pub fn full_access() -> Self {
        Self { nonce: 0, permission: AccessKeyPermission::FullAccess }
    }
}

/// The subset of actions needed to open an account.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    CreateAccount,
    Transfer { deposit: u128 },
    AddKey { public_key: PublicKey, access_key: AccessKey },
}

impl Action {
    /// Variant index in the full protocol action enum
    fn tag(&self) -> u8 {
        match self {
            Action::CreateAccount => 0,
            Action::Transfer { .. } => 3,
            Action::AddKey { .. } => 5,
        }
    }
}

impl BorshSerialize for Action {
    fn serialize<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        self.tag().serialize(writer)?;
        match self {
            Action::CreateAccount => Ok(()),
            Action::Transfer { deposit } => deposit.serialize(writer),
            Action::AddKey { public_key, access_key } => {
                public_key.serialize(writer)?;
                access_key.serialize(writer)
            }
        }
    }
}

#[derive(BorshSerialize, Debug, Clone, PartialEq)]
pub struct Transaction {
    pub signer_id: String,
    pub public_key: PublicKey,
    pub nonce: u64,
    pub receiver_id: String,
    pub block_hash: CryptoHash,
    pub actions: Vec<Action>,
}

impl Transaction {
    /// CreateAccount + Transfer + AddKey(full access), as one batch.
    pub fn create_account(
        signer_id: &str,
        signer_key: PublicKey,
        nonce: u64,
        new_account_id: &str,
        new_public_key: PublicKey,
        initial_balance: u128,
        block_hash: CryptoHash,
    ) -> Self {
        Self {
            signer_id: signer_id.to_string(),
            public_key: signer_key,
            nonce,
            receiver_id: new_account_id.to_string(),
            block_hash,
            actions: vec![
                Action::CreateAccount,
                Action::Transfer { deposit: initial_balance },
                Action::AddKey { public_key: new_public_key, access_key: AccessKey::full_access() },
            ],
        }
    }

    pub fn get_hash(&self) -> Result<CryptoHash> {
        let bytes = borsh::to_vec(self).map_err(|e| NearCliError::Serialization(e.to_string()))?;
        Ok(Sha256::digest(&bytes).into())
    }

    pub fn sign(self, signer: &KeyPair) -> Result<SignedTransaction> {
        let hash = self.get_hash()?;
        let signature = signer.sign(&hash);
        Ok(SignedTransaction { transaction: self, signature })
    }
}

#[derive(BorshSerialize, Debug, Clone)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signature: Signature,
}

impl SignedTransaction {
    /// Base64 of the borsh encoding, as `broadcast_tx_commit` expects
    pub fn to_base64(&self) -> Result<String> {
        let bytes = borsh::to_vec(self).map_err(|e| NearCliError::Serialization(e.to_string()))?;
        Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
    }
}

pub fn decode_block_hash(hash: &str) -> Result<CryptoHash> {
    let bytes = bs58::decode(hash)
        .into_vec()
        .map_err(|e| NearCliError::Rpc(format!("Invalid block hash '{}': {}", hash, e)))?;
    bytes
        .try_into()
        .map_err(|_| NearCliError::Rpc(format!("Block hash '{}' is not 32 bytes", hash)))
}
