use adbwire::cli::Cli;
use adbwire::commands::runner::CommandRunner;
use adbwire::output::OutputFormatter;
use clap::Parser;
use log::debug;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .init();

    let runner = match CommandRunner::new(&cli) {
        Ok(runner) => runner,
        Err(e) => {
            OutputFormatter::new(cli.output).error(&e.to_string());
            std::process::exit(1);
        }
    };

    let code = match runner.run(cli.command()).await {
        Ok(()) => 0,
        // The remote command already wrote its own output; just pass its code on.
        Err(e) => match e.exit_status() {
            Some(status) => status.code(),
            None => {
                runner.output().error(&e.to_string());
                1
            }
        },
    };

    debug!("Exiting with code {}", code);
    // Exit explicitly so a pending stdin read cannot hold the runtime open.
    std::process::exit(code);
}
