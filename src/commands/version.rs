use crate::cli::OutputType;
use crate::commands::{CommandContext, SubCommand};
use crate::error::Result;
use async_trait::async_trait;

pub struct VersionCommand;

#[async_trait]
impl SubCommand for VersionCommand {
    type Args = ();

    async fn run(&self, ctx: &CommandContext, _args: ()) -> Result<()> {
        let version = ctx.client.server_version().await?;
        match ctx.output.format() {
            OutputType::Table => println!("Server Version: {}", version),
            OutputType::Json => ctx.output.json(&serde_json::json!({ "version": version }))?,
        }
        Ok(())
    }
}
