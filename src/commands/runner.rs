use crate::cli::{Cli, Commands};
use crate::client::Client;
use crate::commands::{
    copy::{PullArgs, PullCommand, PushArgs, PushCommand},
    devices::{DevicesCommand, StateArgs, StateCommand},
    forward::ForwardListCommand,
    ls::{LsArgs, LsCommand},
    shell::{ShellArgs, ShellCommand},
    version::VersionCommand,
    CommandContext, SubCommand,
};
use crate::config::ClientConfig;
use crate::error::{AdbError, Result};
use crate::output::OutputFormatter;
use log::debug;
use std::time::Duration;

/// Routes a parsed command line to its subcommand.
pub struct CommandRunner {
    ctx: CommandContext,
}

impl CommandRunner {
    pub fn new(cli: &Cli) -> Result<Self> {
        let config = apply_overrides(ClientConfig::load()?, cli)?;
        debug!("Using ADB server at {}", config.address());
        Ok(Self::with_config(config, cli))
    }

    pub fn with_config(config: ClientConfig, cli: &Cli) -> Self {
        Self {
            ctx: CommandContext::new(Client::new(config), OutputFormatter::new(cli.output)),
        }
    }

    pub async fn run(&self, command: Commands) -> Result<()> {
        debug!("CommandRunner::run() called with command: {:?}", command);
        let ctx = &self.ctx;

        match command {
            Commands::Devices => DevicesCommand.run(ctx, ()).await,
            Commands::Version => VersionCommand.run(ctx, ()).await,
            Commands::State { serial } => StateCommand.run(ctx, StateArgs { serial }).await,
            Commands::Shell {
                serial,
                stdin,
                command,
            } => {
                let args = ShellArgs {
                    serial,
                    command,
                    forward_stdin: stdin,
                };
                ShellCommand.run(ctx, args).await
            }
            Commands::Ls { serial, path } => LsCommand.run(ctx, LsArgs { serial, path }).await,
            Commands::Push {
                serial,
                local,
                remote,
            } => {
                let args = PushArgs {
                    serial,
                    local,
                    remote,
                };
                PushCommand.run(ctx, args).await
            }
            Commands::Pull {
                serial,
                remote,
                local,
            } => {
                let args = PullArgs {
                    serial,
                    remote,
                    local,
                };
                PullCommand.run(ctx, args).await
            }
            Commands::ForwardList => ForwardListCommand.run(ctx, ()).await,
        }
    }

    pub fn output(&self) -> &OutputFormatter {
        &self.ctx.output
    }
}

/// Command-line flags win over the config file.
pub fn apply_overrides(mut config: ClientConfig, cli: &Cli) -> Result<ClientConfig> {
    if let Some(host) = &cli.host {
        config = config.with_host(host.clone());
    }
    if let Some(port) = cli.port {
        config = config.with_port(port);
    }
    if let Some(secs) = cli.timeout {
        if !secs.is_finite() || secs <= 0.0 {
            return Err(AdbError::Config(format!(
                "timeout must be a positive number of seconds, got {}",
                secs
            )));
        }
        config = config.with_read_timeout(Duration::from_secs_f64(secs));
    }
    if cli.trace_wire {
        config = config.with_trace_wire(true);
    }
    Ok(config)
}
