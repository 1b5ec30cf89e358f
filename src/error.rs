use thiserror::Error;

#[derive(Error, Debug)]
pub enum NearCliError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Invalid key: {0}")]
    InvalidKey(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid HD key path: {0}")]
    InvalidHdPath(String),
    #[error("Key store error: {0}")]
    KeyStore(String),
    #[error("No key found for account {account_id} on network {network_id}")]
    MissingKey { network_id: String, account_id: String },
    #[error("RPC error: {0}")]
    Rpc(String),
    #[error("Timeout: {0}")]
    Timeout(String),
    #[error("Account creation failed: {0}")]
    AccountCreation(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NearCliError {
    /// Whether the failure leaves the remote state unknown.
    pub fn is_timeout(&self) -> bool {
        matches!(self, NearCliError::Timeout(_)) || self.to_string().contains("Timeout")
    }
}

impl From<reqwest::Error> for NearCliError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NearCliError::Timeout(err.to_string())
        } else {
            NearCliError::Rpc(err.to_string())
        }
    }
}

impl From<serde_json::Error> for NearCliError {
    fn from(err: serde_json::Error) -> Self {
        NearCliError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NearCliError>;
