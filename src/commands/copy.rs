use crate::commands::{CommandContext, SubCommand};
use crate::error::Result;
use crate::output::file::human_size;
use async_trait::async_trait;
use std::path::PathBuf;

pub struct PushCommand;

#[derive(Debug, Clone)]
pub struct PushArgs {
    pub serial: String,
    pub local: PathBuf,
    pub remote: String,
}

#[async_trait]
impl SubCommand for PushCommand {
    type Args = PushArgs;

    async fn run(&self, ctx: &CommandContext, args: PushArgs) -> Result<()> {
        let device = ctx.client.device(args.serial.as_str());
        let bytes = device.push_file(&args.local, &args.remote).await?;
        ctx.output.success(&format!(
            "{}: pushed {} to {}",
            args.local.display(),
            human_size(bytes),
            args.remote
        ));
        Ok(())
    }
}

pub struct PullCommand;

#[derive(Debug, Clone)]
pub struct PullArgs {
    pub serial: String,
    pub remote: String,
    pub local: PathBuf,
}

#[async_trait]
impl SubCommand for PullCommand {
    type Args = PullArgs;

    async fn run(&self, ctx: &CommandContext, args: PullArgs) -> Result<()> {
        let device = ctx.client.device(args.serial.as_str());
        let bytes = device.pull_file(&args.remote, &args.local).await?;
        ctx.output.success(&format!(
            "{}: pulled {} to {}",
            args.remote,
            human_size(bytes),
            args.local.display()
        ));
        Ok(())
    }
}
