//! Local registry of key pairs per (network, account)

use async_trait::async_trait;

use crate::crypto::KeyPair;
use crate::error::Result;

pub mod file;
pub mod memory;

pub use file::UnencryptedFileSystemKeyStore;
pub use memory::InMemoryKeyStore;

#[async_trait]
pub trait KeyStore: Send + Sync {
    async fn set_key(&self, network_id: &str, account_id: &str, key_pair: &KeyPair) -> Result<()>;

    async fn get_key(&self, network_id: &str, account_id: &str) -> Result<Option<KeyPair>>;

    /// Removing a key that does not exist is not an error.
    async fn remove_key(&self, network_id: &str, account_id: &str) -> Result<()>;

    async fn get_accounts(&self, network_id: &str) -> Result<Vec<String>>;
}
