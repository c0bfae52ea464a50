use crate::cli::OutputType;
use crate::commands::{CommandContext, SubCommand};
use crate::error::Result;
use async_trait::async_trait;
use log::debug;

pub struct DevicesCommand;

#[async_trait]
impl SubCommand for DevicesCommand {
    type Args = ();

    async fn run(&self, ctx: &CommandContext, _args: ()) -> Result<()> {
        let devices = ctx.client.device_list().await?;
        debug!("Listing {} devices", devices.len());
        ctx.output.list(&devices)
    }
}

pub struct StateCommand;

#[derive(Debug, Clone)]
pub struct StateArgs {
    pub serial: String,
}

#[async_trait]
impl SubCommand for StateCommand {
    type Args = StateArgs;

    async fn run(&self, ctx: &CommandContext, args: StateArgs) -> Result<()> {
        let state = ctx.client.device(args.serial.as_str()).state().await?;
        match ctx.output.format() {
            OutputType::Table => println!("{}", state),
            OutputType::Json => ctx.output.json(&serde_json::json!({
                "serial": args.serial,
                "state": state,
            }))?,
        }
        Ok(())
    }
}
