use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use super::KeyStore;
use crate::crypto::KeyPair;
use crate::error::{NearCliError, Result};

/// On-disk credential file, `<root>/<network>/<account>.json`
#[derive(Serialize, Deserialize, Debug)]
struct AccountKeyFile {
    account_id: String,
    public_key: String,
    private_key: String,
}

/// Stores keys as plain JSON files under a root directory
/// (by default `~/.near-credentials`).
pub struct UnencryptedFileSystemKeyStore {
    root: PathBuf,
}

impl UnencryptedFileSystemKeyStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn key_file_path(&self, network_id: &str, account_id: &str) -> PathBuf {
        self.root.join(network_id).join(format!("{}.json", account_id))
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[async_trait]
impl KeyStore for UnencryptedFileSystemKeyStore {
    async fn set_key(&self, network_id: &str, account_id: &str, key_pair: &KeyPair) -> Result<()> {
        let path = self.key_file_path(network_id, account_id);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await?;
        }
        if fs::metadata(&path).await.is_ok() {
            warn!("Overwriting existing key file {}", path.display());
        }

        let content = AccountKeyFile {
            account_id: account_id.to_string(),
            public_key: key_pair.public_key().to_string(),
            private_key: key_pair.secret_key_string(),
        };
        let json = serde_json::to_string(&content)?;
        fs::write(&path, json).await?;
        restrict_permissions(&path).await?;

        debug!("Saved key for {} to {}", account_id, path.display());
        Ok(())
    }

    async fn get_key(&self, network_id: &str, account_id: &str) -> Result<Option<KeyPair>> {
        let path = self.key_file_path(network_id, account_id);
        let json = match fs::read_to_string(&path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let content: AccountKeyFile = serde_json::from_str(&json)
            .map_err(|e| NearCliError::KeyStore(format!("{}: {}", path.display(), e)))?;
        let key_pair: KeyPair = content.private_key.parse()?;
        Ok(Some(key_pair))
    }

    async fn remove_key(&self, network_id: &str, account_id: &str) -> Result<()> {
        let path = self.key_file_path(network_id, account_id);
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed key file {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_accounts(&self, network_id: &str) -> Result<Vec<String>> {
        let dir = self.root.join(network_id);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        let mut accounts = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(account) = name.strip_suffix(".json") {
                accounts.push(account.to_string());
            }
        }
        accounts.sort();
        Ok(accounts)
    }
}
