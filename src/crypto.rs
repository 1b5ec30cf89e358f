use borsh::BorshSerialize;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use std::fmt;
use std::str::FromStr;

use crate::error::{NearCliError, Result};

const ED25519_PREFIX: &str = "ed25519";

/// Curve tag; variant order is the on-chain encoding.
#[derive(BorshSerialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    Ed25519,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyType::Ed25519 => write!(f, "{}", ED25519_PREFIX),
        }
    }
}

impl FromStr for KeyType {
    type Err = NearCliError;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            ED25519_PREFIX => Ok(KeyType::Ed25519),
            other => Err(NearCliError::InvalidKey(format!("Unknown key type: {}", other))),
        }
    }
}

/// Splits `curve:data`; a bare string defaults to ed25519.
fn split_key_string(s: &str) -> Result<(KeyType, &str)> {
    match s.split_once(':') {
        Some((curve, data)) => Ok((curve.parse()?, data)),
        None => Ok((KeyType::Ed25519, s)),
    }
}

fn decode_base58(data: &str) -> Result<Vec<u8>> {
    bs58::decode(data)
        .into_vec()
        .map_err(|e| NearCliError::InvalidKey(format!("Invalid base58: {}", e)))
}

#[derive(BorshSerialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey {
    key_type: KeyType,
    data: [u8; 32],
}

impl PublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let data: [u8; 32] = bytes.try_into().map_err(|_| {
            NearCliError::InvalidKey(format!("Expected 32 byte ed25519 key, got {} bytes", bytes.len()))
        })?;
        VerifyingKey::from_bytes(&data)
            .map_err(|e| NearCliError::InvalidKey(e.to_string()))?;
        Ok(Self { key_type: KeyType::Ed25519, data })
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.data
    }

    /// Verify a signature made by the matching secret key
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        match VerifyingKey::from_bytes(&self.data) {
            Ok(key) => key
                .verify(message, &ed25519_dalek::Signature::from_bytes(&signature.data))
                .is_ok(),
            Err(_) => false,
        }
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key_type, bs58::encode(self.data).into_string())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self)
    }
}

impl FromStr for PublicKey {
    type Err = NearCliError;
    fn from_str(s: &str) -> Result<Self> {
        let (_, data) = split_key_string(s.trim())?;
        Self::from_bytes(&decode_base58(data)?)
    }
}

#[derive(BorshSerialize, Clone, PartialEq, Eq)]
pub struct Signature {
    key_type: KeyType,
    data: [u8; 64],
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key_type, bs58::encode(self.data).into_string())
    }
}

/// An ed25519 key pair. Only the public half is ever printed.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a new Ed25519 keypair
    pub fn from_random() -> Self {
        let mut csprng = OsRng;
        KeyPair { signing_key: SigningKey::generate(&mut csprng) }
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        KeyPair { signing_key: SigningKey::from_bytes(seed) }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            key_type: KeyType::Ed25519,
            data: self.signing_key.verifying_key().to_bytes(),
        }
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature {
            key_type: KeyType::Ed25519,
            data: self.signing_key.sign(message).to_bytes(),
        }
    }

    /// `ed25519:<base58(seed || public)>`, the credential file format
    pub fn secret_key_string(&self) -> String {
        format!(
            "{}:{}",
            KeyType::Ed25519,
            bs58::encode(self.signing_key.to_keypair_bytes()).into_string()
        )
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair").field("public_key", &self.public_key()).finish()
    }
}

impl PartialEq for KeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.signing_key.to_bytes() == other.signing_key.to_bytes()
    }
}

impl FromStr for KeyPair {
    type Err = NearCliError;
    fn from_str(s: &str) -> Result<Self> {
        let (_, data) = split_key_string(s.trim())?;
        let bytes = decode_base58(data)?;
        match bytes.len() {
            64 => {
                let mut keypair_bytes = [0u8; 64];
                keypair_bytes.copy_from_slice(&bytes);
                let signing_key = SigningKey::from_keypair_bytes(&keypair_bytes)
                    .map_err(|e| NearCliError::InvalidKey(e.to_string()))?;
                Ok(KeyPair { signing_key })
            }
            32 => {
                let mut seed = [0u8; 32];
                seed.copy_from_slice(&bytes);
                Ok(KeyPair::from_seed(&seed))
            }
            n => Err(NearCliError::InvalidKey(format!("Expected 32 or 64 byte secret key, got {} bytes", n))),
        }
    }
}
