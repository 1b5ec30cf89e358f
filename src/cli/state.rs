use clap::Args;
use serde_json::json;
use std::io::Write;

use crate::client::{AccountView, RpcClient};
use crate::error::Result;
use crate::units::format_near_amount;

#[derive(Args, Debug, Clone)]
pub struct StateArgs {
    /// Account to view
    #[arg(value_name = "accountId")]
    pub account_id: String,
}

pub async fn handle_state_command(rpc: &RpcClient, args: &StateArgs, out: &mut dyn Write) -> Result<()> {
    let view = rpc.view_account(&args.account_id).await?;
    write_state(&args.account_id, &view, out)
}

fn write_state(account_id: &str, view: &AccountView, out: &mut dyn Write) -> Result<()> {
    let formatted = match view.amount.parse::<u128>() {
        Ok(yocto) => format_near_amount(yocto),
        Err(_) => view.amount.clone(),
    };
    let mut state = serde_json::to_value(view)?;
    state["formattedAmount"] = json!(formatted);

    writeln!(out, "Account {}", account_id)?;
    writeln!(out, "{}", serde_json::to_string_pretty(&state)?)?;
    Ok(())
}
