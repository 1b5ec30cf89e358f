//! Connection factory: wires the key store, RPC client and account creator
//! for one command invocation.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::client::RpcClient;
use crate::config::ResolvedConfig;
use crate::crypto::PublicKey;
use crate::error::{NearCliError, Result};
use crate::keystore::{KeyStore, UnencryptedFileSystemKeyStore};
use crate::transaction::{decode_block_hash, Transaction};
use crate::units::parse_near_amount;

/// Something that can open a new on-chain account.
#[async_trait]
pub trait AccountCreator: Send + Sync {
    async fn create_account(&self, account_id: &str, public_key: &PublicKey) -> Result<()>;
}

/// Funds the new account from a master account whose key is in the key store.
/// `initial_balance` is a NEAR amount, parsed when the account is created.
pub struct LocalAccountCreator {
    master_account: String,
    initial_balance: String,
    network_id: String,
    rpc: Arc<RpcClient>,
    key_store: Arc<dyn KeyStore>,
}

impl LocalAccountCreator {
    pub fn new(
        master_account: String,
        initial_balance: String,
        network_id: String,
        rpc: Arc<RpcClient>,
        key_store: Arc<dyn KeyStore>,
    ) -> Self {
        Self { master_account, initial_balance, network_id, rpc, key_store }
    }
}

#[async_trait]
impl AccountCreator for LocalAccountCreator {
    async fn create_account(&self, account_id: &str, public_key: &PublicKey) -> Result<()> {
        let initial_balance = parse_near_amount(&self.initial_balance)?;
        let signer = self
            .key_store
            .get_key(&self.network_id, &self.master_account)
            .await?
            .ok_or_else(|| NearCliError::MissingKey {
                network_id: self.network_id.clone(),
                account_id: self.master_account.clone(),
            })?;

        let access_key = self.rpc.view_access_key(&self.master_account, &signer.public_key()).await?;
        let block_hash = decode_block_hash(&access_key.block_hash)?;

        let signed = Transaction::create_account(
            &self.master_account,
            signer.public_key(),
            access_key.nonce + 1,
            account_id,
            *public_key,
            initial_balance,
            block_hash,
        )
        .sign(&signer)?;

        let tx_hash = self.rpc.broadcast_tx_commit(&signed).await?;
        info!("Account {} created by {} in transaction {}", account_id, self.master_account, tx_hash);
        Ok(())
    }
}

/// Settings `connect` reads from the command's options.
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    pub master_account: Option<String>,
    pub initial_balance: Option<String>,
}

/// Handle for one invocation; not reused across commands.
pub struct Near {
    pub network_id: String,
    pub rpc: Arc<RpcClient>,
    pub key_store: Arc<dyn KeyStore>,
    pub account_creator: Option<Arc<dyn AccountCreator>>,
}

impl Near {
    pub fn account_creator(&self) -> Result<Arc<dyn AccountCreator>> {
        self.account_creator
            .clone()
            .ok_or_else(|| NearCliError::Config("Must specify account creator via masterAccount".to_string()))
    }
}

pub fn connect(config: &ResolvedConfig, options: &ConnectOptions) -> Result<Near> {
    let timeout = Duration::from_secs(config.rpc_timeout_secs);
    let network_id = config.network.network_id.clone();
    let rpc = Arc::new(RpcClient::new(config.network.node_url.clone(), timeout)?);
    let key_store: Arc<dyn KeyStore> = Arc::new(UnencryptedFileSystemKeyStore::new(&config.key_path));

    let account_creator: Option<Arc<dyn AccountCreator>> = match &options.master_account {
        Some(master) => {
            let initial_balance = options.initial_balance.clone().unwrap_or_else(|| "0".to_string());
            debug!("Using master account {} with initial balance {}", master, initial_balance);
            let creator: Arc<dyn AccountCreator> = Arc::new(LocalAccountCreator::new(
                master.clone(),
                initial_balance,
                network_id.clone(),
                rpc.clone(),
                key_store.clone(),
            ));
            Some(creator)
        }
        None => None,
    };

    Ok(Near { network_id, rpc, key_store, account_creator })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NetworkConfig, TelemetryConfig};
    use crate::crypto::KeyPair;
    use crate::keystore::InMemoryKeyStore;

    fn config() -> ResolvedConfig {
        ResolvedConfig {
            network: NetworkConfig {
                network_id: "testnet".into(),
                node_url: "http://127.0.0.1:1".into(),
            },
            key_path: std::env::temp_dir().join("near-cli-connect-test"),
            rpc_timeout_secs: 1,
            telemetry: TelemetryConfig::default(),
        }
    }

    #[test]
    fn test_master_account_selects_local_creator() {
        let near = connect(
            &config(),
            &ConnectOptions { master_account: Some("master.testnet".into()), initial_balance: Some("100".into()) },
        )
        .unwrap();
        assert_eq!(near.network_id, "testnet");
        assert!(near.account_creator().is_ok());
    }

    #[test]
    fn test_no_master_account_means_no_creator() {
        let near = connect(&config(), &ConnectOptions::default()).unwrap();
        assert!(near.account_creator().is_err());
    }

    #[tokio::test]
    async fn test_bad_initial_balance_rejected_at_creation() {
        let near = connect(
            &config(),
            &ConnectOptions { master_account: Some("m.testnet".into()), initial_balance: Some("lots".into()) },
        )
        .unwrap();
        let key = KeyPair::from_random().public_key();
        let err = near.account_creator().unwrap().create_account("new.testnet", &key).await.unwrap_err();
        assert!(matches!(err, NearCliError::InvalidAmount(_)));
    }

    #[tokio::test]
    async fn test_local_creator_requires_master_key() {
        let rpc = Arc::new(RpcClient::new("http://127.0.0.1:1".into(), Duration::from_secs(1)).unwrap());
        let creator = LocalAccountCreator::new(
            "master.testnet".into(),
            "1".into(),
            "testnet".into(),
            rpc,
            Arc::new(InMemoryKeyStore::new()),
        );
        let key = KeyPair::from_random().public_key();
        let err = creator.create_account("new.testnet", &key).await.unwrap_err();
        assert!(matches!(err, NearCliError::MissingKey { .. }));
    }
}
