use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputType {
    Table,
    Json,
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[command(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Option<Commands>,

    /// ADB server hostname (overrides the config file)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// ADB server port (overrides the config file)
    #[arg(long, short = 'p', global = true)]
    pub port: Option<u16>,

    /// Read timeout in seconds (overrides the config file)
    #[arg(long, short = 't', global = true)]
    pub timeout: Option<f64>,

    /// Log every wire frame at trace level
    #[arg(long, global = true)]
    pub trace_wire: bool,

    /// Output format (table or json)
    #[arg(long, short = 'o', global = true, default_value = "table")]
    pub output: OutputType,
}

#[derive(Subcommand, Clone, Debug, PartialEq)]
pub enum Commands {
    /// Lists attached devices
    Devices,

    /// Gets the server version
    Version,

    /// Gets a device's state
    State {
        /// Device serial
        serial: String,
    },

    /// Runs a command on a device and exits with its exit code
    Shell {
        /// Device serial
        serial: String,
        /// Forward local stdin to the command
        #[arg(short = 'i', long = "stdin")]
        stdin: bool,
        /// Command and arguments
        #[arg(required = true, allow_hyphen_values = true, trailing_var_arg = true)]
        command: Vec<String>,
    },

    /// Lists a directory on a device
    Ls {
        /// Device serial
        serial: String,
        /// Remote directory
        #[arg(default_value = "/sdcard")]
        path: String,
    },

    /// Copies a local file to a device
    Push {
        /// Device serial
        serial: String,
        /// Local file
        local: PathBuf,
        /// Remote destination path
        remote: String,
    },

    /// Copies a file from a device
    Pull {
        /// Device serial
        serial: String,
        /// Remote file
        remote: String,
        /// Local destination path
        local: PathBuf,
    },

    /// Lists port forwards
    ForwardList,
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Devices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_devices() {
        let cli = Cli::try_parse_from(["adbwire"]).unwrap();
        assert_eq!(cli.command(), Commands::Devices);
        assert_eq!(cli.output, OutputType::Table);
        assert!(cli.host.is_none());
    }

    #[test]
    fn test_shell_keeps_command_flags() {
        let cli = Cli::try_parse_from([
            "adbwire", "--port", "5038", "shell", "emulator-5554", "ls", "-la", "/sdcard",
        ])
        .unwrap();
        assert_eq!(cli.port, Some(5038));
        assert_eq!(
            cli.command(),
            Commands::Shell {
                serial: "emulator-5554".to_string(),
                stdin: false,
                command: vec!["ls".into(), "-la".into(), "/sdcard".into()],
            }
        );
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from(["adbwire", "ls", "abc", "/data", "-o", "json", "-t", "2.5"])
            .unwrap();
        assert_eq!(cli.output, OutputType::Json);
        assert_eq!(cli.timeout, Some(2.5));
    }

    #[test]
    fn test_shell_requires_command() {
        assert!(Cli::try_parse_from(["adbwire", "shell", "abc"]).is_err());
    }
}
