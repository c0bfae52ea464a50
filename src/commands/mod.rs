use crate::client::Client;
use crate::error::Result;
use crate::output::OutputFormatter;
use async_trait::async_trait;

pub mod copy;
pub mod devices;
pub mod forward;
pub mod ls;
pub mod runner;
pub mod shell;
pub mod version;


/// What every subcommand gets: a client for the configured server and the
/// selected output format.
pub struct CommandContext {
    pub client: Client,
    pub output: OutputFormatter,
}

impl CommandContext {
    pub fn new(client: Client, output: OutputFormatter) -> Self {
        Self { client, output }
    }
}

/// Base trait for all subcommands
#[async_trait]
pub trait SubCommand {
    type Args: Send;

    async fn run(&self, ctx: &CommandContext, args: Self::Args) -> Result<()>;
}
