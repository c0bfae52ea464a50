use crate::commands::{CommandContext, SubCommand};
use crate::error::Result;
use async_trait::async_trait;

pub struct ForwardListCommand;

#[async_trait]
impl SubCommand for ForwardListCommand {
    type Args = ();

    async fn run(&self, ctx: &CommandContext, _args: ()) -> Result<()> {
        let forwards = ctx.client.forward_list().await?;
        ctx.output.list(&forwards)
    }
}
