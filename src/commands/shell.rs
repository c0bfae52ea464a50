use crate::commands::{CommandContext, SubCommand};
use crate::error::{AdbError, Result};
use async_trait::async_trait;
use log::debug;

pub struct ShellCommand;

#[derive(Debug, Clone)]
pub struct ShellArgs {
    pub serial: String,
    pub command: Vec<String>,
    pub forward_stdin: bool,
}

#[async_trait]
impl SubCommand for ShellCommand {
    type Args = ShellArgs;

    /// A nonzero remote exit surfaces as [`AdbError::Exit`].
    async fn run(&self, ctx: &CommandContext, args: ShellArgs) -> Result<()> {
        let command = args.command.join(" ");
        if command.trim().is_empty() {
            return Err(AdbError::EmptyCommand);
        }

        let device = ctx.client.device(args.serial.as_str());
        let mut session = device.new_session().await?;
        session.set_stdout(tokio::io::stdout())?;
        session.set_stderr(tokio::io::stderr())?;
        if args.forward_stdin {
            session.set_stdin(tokio::io::stdin())?;
        }

        debug!("Running on {}: {}", args.serial, command);
        session.run(&command).await
    }
}
