use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::KeyStore;
use crate::crypto::KeyPair;
use crate::error::{NearCliError, Result};

/// Process-local key store, keyed by (network, account).
#[derive(Default)]
pub struct InMemoryKeyStore {
    keys: Mutex<HashMap<(String, String), KeyPair>>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<(String, String), KeyPair>>> {
        self.keys
            .lock()
            .map_err(|e| NearCliError::KeyStore(format!("Mutex poisoned: {}", e)))
    }
}

#[async_trait]
impl KeyStore for InMemoryKeyStore {
    async fn set_key(&self, network_id: &str, account_id: &str, key_pair: &KeyPair) -> Result<()> {
        self.lock()?
            .insert((network_id.to_string(), account_id.to_string()), key_pair.clone());
        Ok(())
    }

    async fn get_key(&self, network_id: &str, account_id: &str) -> Result<Option<KeyPair>> {
        Ok(self
            .lock()?
            .get(&(network_id.to_string(), account_id.to_string()))
            .cloned())
    }

    async fn remove_key(&self, network_id: &str, account_id: &str) -> Result<()> {
        self.lock()?
            .remove(&(network_id.to_string(), account_id.to_string()));
        Ok(())
    }

    async fn get_accounts(&self, network_id: &str) -> Result<Vec<String>> {
        let mut accounts: Vec<String> = self
            .lock()?
            .keys()
            .filter(|(net, _)| net == network_id)
            .map(|(_, acc)| acc.clone())
            .collect();
        accounts.sort();
        Ok(accounts)
    }
}
