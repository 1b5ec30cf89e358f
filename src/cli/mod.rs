pub mod create_account;
pub mod state;

use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use tracing::debug;

use crate::config::{self, CliConfig, Overrides, ResolvedConfig, CONFIG_DIR};
use crate::connect::{connect, ConnectOptions};
use crate::error::Result;
use crate::eventtracking::{EventTracker, HttpEventTracker, NoopTracker, TrackingSettings};
use create_account::{CreateAccountArgs, CreateAccountCommand};
use state::StateArgs;

#[derive(Parser, Debug)]
#[command(name = "near")]
#[command(about = "NEAR account CLI", long_about = None)]
pub struct Cli {
    /// Network to use (mainnet, testnet, betanet, local or one from the config file)
    #[arg(long = "networkId", env = "NEAR_ENV", global = true)]
    pub network_id: Option<String>,

    /// RPC endpoint, overrides the network default
    #[arg(long = "nodeUrl", global = true)]
    pub node_url: Option<String>,

    /// Directory holding credential files
    #[arg(long = "keyPath", global = true)]
    pub key_path: Option<PathBuf>,

    /// Config file (default ~/.near-config/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// create a new developer account
    #[command(name = "create_account", alias = "create-account")]
    CreateAccount(CreateAccountArgs),
    /// View account state
    State(StateArgs),
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            network_id: self.network_id.clone(),
            node_url: self.node_url.clone(),
            key_path: self.key_path.clone(),
        }
    }

    fn config_path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => config::default_config_path(),
        }
    }
}

fn event_tracker(resolved: &ResolvedConfig) -> Result<Box<dyn EventTracker>> {
    if !resolved.telemetry.enabled {
        return Ok(Box::new(NoopTracker));
    }
    let settings_path = config::home_dir()?.join(CONFIG_DIR).join("settings.json");
    let settings = TrackingSettings::load_or_create(&settings_path);
    Ok(Box::new(HttpEventTracker::new(
        resolved.telemetry.endpoint.clone(),
        settings.tracking_session_id,
    )))
}

pub async fn run(cli: Cli) -> Result<()> {
    let file_config = CliConfig::load(&cli.config_path()?)?;
    let resolved = ResolvedConfig::resolve(&file_config, cli.overrides())?;
    debug!("Resolved config: {:?}", resolved);

    match cli.command {
        Commands::CreateAccount(args) => {
            let near = connect(
                &resolved,
                &ConnectOptions {
                    master_account: Some(args.master_account.clone()),
                    initial_balance: Some(args.initial_balance.clone()),
                },
            )?;
            let options = args.into_options(near.network_id.clone(), resolved.network.node_url.clone())?;
            let tracker = event_tracker(&resolved)?;
            let account_creator = near.account_creator()?;

            let command = CreateAccountCommand {
                key_store: near.key_store.as_ref(),
                account_creator: account_creator.as_ref(),
                tracker: tracker.as_ref(),
            };
            command.execute(&options, &mut io::stdout(), &mut io::stderr()).await?;
        }
        Commands::State(args) => {
            let near = connect(&resolved, &ConnectOptions::default())?;
            state::handle_state_command(&near.rpc, &args, &mut io::stdout()).await?;
        }
    }
    Ok(())
}
