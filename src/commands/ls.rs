use crate::commands::{CommandContext, SubCommand};
use crate::error::Result;
use async_trait::async_trait;
use log::debug;

pub struct LsCommand;

#[derive(Debug, Clone)]
pub struct LsArgs {
    pub serial: String,
    pub path: String,
}

#[async_trait]
impl SubCommand for LsCommand {
    type Args = LsArgs;

    async fn run(&self, ctx: &CommandContext, args: LsArgs) -> Result<()> {
        let device = ctx.client.device(args.serial.as_str());
        let mut entries = device.list(&args.path).await?;
        // adbd lists "." and ".." too.
        entries.retain(|entry| entry.name != "." && entry.name != "..");
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        debug!("{} entries in {}", entries.len(), args.path);
        ctx.output.list(&entries)
    }
}
