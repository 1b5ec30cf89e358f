use clap::{ArgGroup, Args};
use serde_json::json;
use std::io::Write;
use tracing::{debug, error, info, warn};

use crate::connect::AccountCreator;
use crate::crypto::{KeyPair, PublicKey};
use crate::error::{NearCliError, Result};
use crate::eventtracking::{EventTracker, EVENT_ID_CREATE_ACCOUNT_END, EVENT_ID_CREATE_ACCOUNT_START};
use crate::hd_path::{HdPath, DEFAULT_LEDGER_PATH};
use crate::keystore::KeyStore;

/// create a new developer account
#[derive(Args, Debug, Clone)]
#[command(group(ArgGroup::new("account").required(true).multiple(true).args(["account_id", "account_id_flag"])))]
pub struct CreateAccountArgs {
    /// Unique identifier for the newly created account
    #[arg(value_name = "accountId")]
    pub account_id: Option<String>,

    /// Unique identifier for the newly created account
    #[arg(long = "accountId", value_name = "accountId")]
    pub account_id_flag: Option<String>,

    /// Account used to create requested account.
    #[arg(long = "masterAccount")]
    pub master_account: String,

    /// Public key to initialize the account with
    #[arg(long = "publicKey")]
    pub public_key: Option<PublicKey>,

    /// HD key path to use with Ledger. Used to generate public key if not specified directly
    #[arg(long = "newLedgerKey", default_value = DEFAULT_LEDGER_PATH)]
    pub new_ledger_key: HdPath,

    /// Number of tokens to transfer to newly created account
    #[arg(long = "initialBalance", default_value = "100")]
    pub initial_balance: String,
}

/// Everything the handler reads; fixed for the whole invocation.
#[derive(Debug, Clone)]
pub struct CreateAccountOptions {
    pub account_id: String,
    pub master_account: String,
    pub public_key: Option<PublicKey>,
    pub new_ledger_key: HdPath,
    pub initial_balance: String,
    pub network_id: String,
    pub node_url: String,
}

impl CreateAccountArgs {
    pub fn into_options(self, network_id: String, node_url: String) -> Result<CreateAccountOptions> {
        let account_id = match (self.account_id, self.account_id_flag) {
            (Some(positional), Some(flag)) if positional != flag => {
                return Err(NearCliError::Config(format!(
                    "Conflicting account ids: '{}' and --accountId '{}'",
                    positional, flag
                )))
            }
            (Some(id), _) | (None, Some(id)) => id,
            (None, None) => return Err(NearCliError::Config("accountId is required".to_string())),
        };

        Ok(CreateAccountOptions {
            account_id,
            master_account: self.master_account,
            public_key: self.public_key,
            new_ledger_key: self.new_ledger_key,
            initial_balance: self.initial_balance,
            network_id,
            node_url,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationOutcome {
    /// The network confirmed the account.
    Created,
    /// The request timed out; the account may or may not exist.
    Unconfirmed,
}

pub struct CreateAccountCommand<'a> {
    pub key_store: &'a dyn KeyStore,
    pub account_creator: &'a dyn AccountCreator,
    pub tracker: &'a dyn EventTracker,
}

impl CreateAccountCommand<'_> {
    /// Creates the account, rolling back the account's stored key if the
    /// network definitely rejected it.
    pub async fn execute(
        &self,
        options: &CreateAccountOptions,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> Result<CreationOutcome> {
        self.tracker
            .track(EVENT_ID_CREATE_ACCOUNT_START, json!({ "nodeUrl": options.node_url }))
            .await;

        let (public_key, key_pair) = match options.public_key {
            Some(key) => (key, None),
            None => {
                let key_pair = KeyPair::from_random();
                (key_pair.public_key(), Some(key_pair))
            }
        };
        debug!(
            "Creating {} with key {} (ledger path {})",
            options.account_id, public_key, options.new_ledger_key
        );

        // Saved first so the key survives an indeterminate failure
        if let Some(key_pair) = &key_pair {
            self.key_store
                .set_key(&options.network_id, &options.account_id, key_pair)
                .await?;
            info!("Saved key for {} on {}", options.account_id, options.network_id);
        }

        let outcome = match self.account_creator.create_account(&options.account_id, &public_key).await {
            Ok(()) => Ok(CreationOutcome::Created),
            Err(e) if e.is_timeout() => {
                warn!("Timed out creating {}: {}", options.account_id, e);
                writeln!(err, "Received a timeout when creating account, please run:")?;
                writeln!(err, "near state {}", options.account_id)?;
                if key_pair.is_some() {
                    writeln!(err, "to confirm creation. Keyfile for this account has been saved.")?;
                } else {
                    writeln!(err, "to confirm creation.")?;
                }
                Ok(CreationOutcome::Unconfirmed)
            }
            Err(e) => {
                if let Err(remove_err) = self
                    .key_store
                    .remove_key(&options.network_id, &options.account_id)
                    .await
                {
                    error!("Failed to remove key for {}: {}", options.account_id, remove_err);
                }
                Err(e)
            }
        };

        if outcome.is_ok() {
            writeln!(
                out,
                "Account {} for network \"{}\" was created.",
                options.account_id, options.network_id
            )?;
        }

        let success = matches!(outcome, Ok(CreationOutcome::Created));
        self.tracker
            .track(EVENT_ID_CREATE_ACCOUNT_END, json!({ "node": options.node_url, "success": success }))
            .await;

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::InMemoryKeyStore;
    use async_trait::async_trait;
    use clap::Parser;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Counts calls and forwards to an in-memory store.
    #[derive(Default)]
    struct RecordingKeyStore {
        inner: InMemoryKeyStore,
        set_calls: AtomicUsize,
        remove_calls: AtomicUsize,
        fail_remove: bool,
    }

    #[async_trait]
    impl KeyStore for RecordingKeyStore {
        async fn set_key(&self, network_id: &str, account_id: &str, key_pair: &KeyPair) -> Result<()> {
            self.set_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.set_key(network_id, account_id, key_pair).await
        }

        async fn get_key(&self, network_id: &str, account_id: &str) -> Result<Option<KeyPair>> {
            self.inner.get_key(network_id, account_id).await
        }

        async fn remove_key(&self, network_id: &str, account_id: &str) -> Result<()> {
            self.remove_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_remove {
                return Err(NearCliError::KeyStore("disk full".into()));
            }
            self.inner.remove_key(network_id, account_id).await
        }

        async fn get_accounts(&self, network_id: &str) -> Result<Vec<String>> {
            self.inner.get_accounts(network_id).await
        }
    }

    /// Fails with the given message, or succeeds when `None`.
    struct FakeCreator {
        failure: Option<&'static str>,
        key_store: Arc<RecordingKeyStore>,
        key_present_at_call: Mutex<Option<bool>>,
        received_key: Mutex<Option<PublicKey>>,
    }

    impl FakeCreator {
        fn new(failure: Option<&'static str>, key_store: Arc<RecordingKeyStore>) -> Self {
            Self {
                failure,
                key_store,
                key_present_at_call: Mutex::new(None),
                received_key: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl AccountCreator for FakeCreator {
        async fn create_account(&self, account_id: &str, public_key: &PublicKey) -> Result<()> {
            let present = self.key_store.get_key("testnet", account_id).await?.is_some();
            *self.key_present_at_call.lock().unwrap() = Some(present);
            *self.received_key.lock().unwrap() = Some(*public_key);
            match self.failure {
                Some(message) => Err(NearCliError::Rpc(message.to_string())),
                None => Ok(()),
            }
        }
    }

    #[derive(Default)]
    struct RecordingTracker {
        events: Mutex<Vec<(String, Value)>>,
    }

    #[async_trait]
    impl EventTracker for RecordingTracker {
        async fn track(&self, event_id: &str, payload: Value) {
            self.events.lock().unwrap().push((event_id.to_string(), payload));
        }
    }

    fn options(public_key: Option<PublicKey>) -> CreateAccountOptions {
        CreateAccountOptions {
            account_id: "new.testnet".into(),
            master_account: "master.testnet".into(),
            public_key,
            new_ledger_key: HdPath::default(),
            initial_balance: "100".into(),
            network_id: "testnet".into(),
            node_url: "https://rpc.testnet.near.org".into(),
        }
    }

    struct Run {
        result: Result<CreationOutcome>,
        stdout: String,
        stderr: String,
        store: Arc<RecordingKeyStore>,
        creator: FakeCreator,
        tracker: RecordingTracker,
    }

    async fn run(public_key: Option<PublicKey>, failure: Option<&'static str>, fail_remove: bool) -> Run {
        let store = Arc::new(RecordingKeyStore { fail_remove, ..Default::default() });
        let creator = FakeCreator::new(failure, store.clone());
        let tracker = RecordingTracker::default();
        let (mut out, mut err) = (Vec::new(), Vec::new());

        let command = CreateAccountCommand {
            key_store: store.as_ref(),
            account_creator: &creator,
            tracker: &tracker,
        };
        let result = command.execute(&options(public_key), &mut out, &mut err).await;

        Run {
            result,
            stdout: String::from_utf8(out).unwrap(),
            stderr: String::from_utf8(err).unwrap(),
            store,
            creator,
            tracker,
        }
    }

    const CONFIRMATION: &str = "Account new.testnet for network \"testnet\" was created.\n";

    #[tokio::test]
    async fn test_supplied_public_key_skips_key_store() {
        let key = KeyPair::from_random().public_key();
        let run = run(Some(key), None, false).await;

        assert_eq!(run.result.unwrap(), CreationOutcome::Created);
        assert_eq!(run.stdout, CONFIRMATION);
        assert_eq!(run.store.set_calls.load(Ordering::SeqCst), 0);
        assert_eq!(run.store.remove_calls.load(Ordering::SeqCst), 0);
        assert_eq!(*run.creator.received_key.lock().unwrap(), Some(key));
    }

    #[tokio::test]
    async fn test_generated_key_stored_before_creation() {
        let run = run(None, None, false).await;

        assert_eq!(run.result.unwrap(), CreationOutcome::Created);
        assert_eq!(run.stdout, CONFIRMATION);
        assert_eq!(run.store.set_calls.load(Ordering::SeqCst), 1);
        assert_eq!(*run.creator.key_present_at_call.lock().unwrap(), Some(true));

        // The key sent to the network is the one that was stored
        let stored = run.store.get_key("testnet", "new.testnet").await.unwrap().unwrap();
        assert_eq!(*run.creator.received_key.lock().unwrap(), Some(stored.public_key()));
    }

    #[tokio::test]
    async fn test_timeout_keeps_key_and_reports() {
        let run = run(None, Some("Timeout exceeded"), false).await;

        assert_eq!(run.result.unwrap(), CreationOutcome::Unconfirmed);
        assert_eq!(run.store.set_calls.load(Ordering::SeqCst), 1);
        assert_eq!(run.store.remove_calls.load(Ordering::SeqCst), 0);
        assert!(run.store.get_key("testnet", "new.testnet").await.unwrap().is_some());

        let lines: Vec<&str> = run.stderr.lines().collect();
        assert_eq!(lines[0], "Received a timeout when creating account, please run:");
        assert_eq!(lines[1], "near state new.testnet");
        assert!(lines[2].contains("Keyfile for this account has been saved"));
        assert_eq!(run.stdout, CONFIRMATION);
    }

    #[tokio::test]
    async fn test_definite_failure_rolls_back_key() {
        let run = run(None, Some("invalid nonce"), false).await;

        let err = run.result.unwrap_err();
        assert!(err.to_string().contains("invalid nonce"));
        assert_eq!(run.store.set_calls.load(Ordering::SeqCst), 1);
        assert_eq!(run.store.remove_calls.load(Ordering::SeqCst), 1);
        assert!(run.store.get_key("testnet", "new.testnet").await.unwrap().is_none());
        assert!(run.stdout.is_empty());
        assert!(run.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_failed_rollback_keeps_creation_error() {
        let run = run(None, Some("invalid nonce"), true).await;

        let err = run.result.unwrap_err();
        assert!(err.to_string().contains("invalid nonce"));
        assert_eq!(run.store.remove_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_supplied_key_failure_still_removes_key() {
        let key = KeyPair::from_random().public_key();
        let run = run(Some(key), Some("invalid nonce"), false).await;

        assert!(run.result.unwrap_err().to_string().contains("invalid nonce"));
        assert_eq!(run.store.set_calls.load(Ordering::SeqCst), 0);
        assert_eq!(run.store.remove_calls.load(Ordering::SeqCst), 1);
        assert!(run.stdout.is_empty());
    }

    #[tokio::test]
    async fn test_telemetry_reflects_outcome() {
        let ok = run(None, None, false).await;
        let events = ok.tracker.events.lock().unwrap().clone();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].0, EVENT_ID_CREATE_ACCOUNT_START);
        assert_eq!(events[0].1["nodeUrl"], "https://rpc.testnet.near.org");
        assert_eq!(events[1].0, EVENT_ID_CREATE_ACCOUNT_END);
        assert_eq!(events[1].1["node"], "https://rpc.testnet.near.org");
        assert_eq!(events[1].1["success"], true);

        let timeout = run(None, Some("Timeout exceeded"), false).await;
        assert_eq!(timeout.tracker.events.lock().unwrap()[1].1["success"], false);

        let failed = run(None, Some("invalid nonce"), false).await;
        assert_eq!(failed.tracker.events.lock().unwrap()[1].1["success"], false);
    }

    #[tokio::test]
    async fn test_bad_initial_balance_reported_after_start_event() {
        use crate::client::RpcClient;
        use crate::connect::LocalAccountCreator;
        use std::time::Duration;

        let store = Arc::new(RecordingKeyStore::default());
        let rpc = Arc::new(RpcClient::new("http://127.0.0.1:1".into(), Duration::from_secs(1)).unwrap());
        let creator = LocalAccountCreator::new(
            "master.testnet".into(),
            "lots".into(),
            "testnet".into(),
            rpc,
            store.clone(),
        );
        let tracker = RecordingTracker::default();
        let command = CreateAccountCommand {
            key_store: store.as_ref(),
            account_creator: &creator,
            tracker: &tracker,
        };

        let result = command.execute(&options(None), &mut Vec::new(), &mut Vec::new()).await;
        assert!(matches!(result, Err(NearCliError::InvalidAmount(_))));

        let events = tracker.events.lock().unwrap().clone();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].0, EVENT_ID_CREATE_ACCOUNT_START);
        assert_eq!(events[1].1["success"], false);
        assert_eq!(store.remove_calls.load(Ordering::SeqCst), 1);
    }

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        args: CreateAccountArgs,
    }

    #[test]
    fn test_args_defaults() {
        let cli = TestCli::try_parse_from(["near", "new.testnet", "--masterAccount", "master.testnet"]).unwrap();
        let options = cli.args.into_options("testnet".into(), "http://node".into()).unwrap();
        assert_eq!(options.account_id, "new.testnet");
        assert_eq!(options.initial_balance, "100");
        assert_eq!(options.new_ledger_key.to_string(), DEFAULT_LEDGER_PATH);
        assert!(options.public_key.is_none());
    }

    #[test]
    fn test_args_validation() {
        // masterAccount is required
        assert!(TestCli::try_parse_from(["near", "new.testnet"]).is_err());
        // so is an account id
        assert!(TestCli::try_parse_from(["near", "--masterAccount", "m.testnet"]).is_err());
        // malformed keys are rejected at parse time
        assert!(TestCli::try_parse_from([
            "near", "new.testnet", "--masterAccount", "m.testnet", "--publicKey", "ed25519:nope0"
        ])
        .is_err());

        let cli = TestCli::try_parse_from([
            "near", "--accountId", "flag.testnet", "--masterAccount", "m.testnet",
        ])
        .unwrap();
        let options = cli.args.into_options("testnet".into(), "http://node".into()).unwrap();
        assert_eq!(options.account_id, "flag.testnet");

        let cli = TestCli::try_parse_from([
            "near", "a.testnet", "--accountId", "b.testnet", "--masterAccount", "m.testnet",
        ])
        .unwrap();
        assert!(cli.args.into_options("testnet".into(), "http://node".into()).is_err());
    }

    #[test]
    fn test_same_account_id_given_twice() {
        let cli = TestCli::try_parse_from([
            "near", "x.testnet", "--accountId", "x.testnet", "--masterAccount", "m.testnet",
        ])
        .unwrap();
        let options = cli.args.into_options("testnet".into(), "http://node".into()).unwrap();
        assert_eq!(options.account_id, "x.testnet");
    }
}
