//! Binary entrypoint for DeckPilot.
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use config::{Settings, load_or_default};
use deck_protocol::{DEFAULT_COMMAND_HOST, DEFAULT_COMMAND_PORT};
use deck_server::Client;
use logging::{self as logshared, LogArgs};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*};

/// Typed CLI failures and exit codes.
mod error;
/// Read-only subcommands.
mod inspect;
/// Command channel client subcommands.
mod shell;
/// The long-running engine.
mod start;

use crate::error::{Error, Result};

#[derive(Parser, Debug)]
#[command(name = "deckpilot", about = "Panel engine for grid key controllers", version)]
/// Command-line interface for the `deckpilot` binary.
struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,

    /// Logging controls
    #[command(flatten)]
    log: LogArgs,

    /// Optional path to the config file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
/// Top-level CLI subcommands.
enum Command {
    /// Open the configured deck and run until interrupted.
    Start {
        /// Root panel directory.
        #[arg(long, default_value = "config/root")]
        root: PathBuf,
    },
    /// List the decks the device manager can see.
    Devices,
    /// List plugins found in a plugin directory.
    Plugins {
        /// Directory to scan; defaults to `[plugins] directory`.
        #[arg(long, short)]
        path: Option<PathBuf>,
    },
    /// Print the panel tree `start` would build.
    Show {
        /// Root panel directory.
        #[arg(long, default_value = "config/root")]
        root: PathBuf,
    },
    /// Send commands to a running instance.
    Shell {
        /// Which command to send.
        #[command(subcommand)]
        command: ShellCommand,
        /// Connection target.
        #[command(flatten)]
        target: Target,
    },
    /// Inspect the configuration.
    Config {
        /// What to inspect.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Where the command channel listens.
#[derive(Args, Debug)]
struct Target {
    /// Command channel host.
    #[arg(long, global = true, default_value = DEFAULT_COMMAND_HOST)]
    host: String,
    /// Command channel port.
    #[arg(long, global = true, default_value_t = DEFAULT_COMMAND_PORT)]
    port: u16,
}

#[derive(Subcommand, Debug)]
/// `deckpilot shell` subcommands.
enum ShellCommand {
    /// Ask the server to echo a message.
    Echo {
        /// Text to echo.
        #[arg(default_value = "PING")]
        message: String,
    },
    /// Simulate pressing a key.
    Push {
        /// Key index to press.
        #[arg(allow_negative_numbers = true)]
        key: i64,
        /// Seconds to hold the key before releasing.
        #[arg(long, short, default_value_t = 2.0)]
        duration: f64,
    },
}

#[derive(Subcommand, Debug)]
/// `deckpilot config` subcommands.
enum ConfigCommand {
    /// Print the value at a dotted key, e.g. `streamdeck.brightness`.
    Get {
        /// Dotted key.
        key: String,
    },
}

/// Install the global subscriber: crate-scoped level filter on everything,
/// `--log-match` rules on the terminal output.
fn init_logging(args: &LogArgs) -> Result<()> {
    let spec = args.spec();
    let matches = args.match_filter()?;
    tracing_subscriber::registry()
        .with(logshared::env_filter_from_spec(&spec))
        .with(fmt::layer().without_time().with_filter(matches))
        .try_init()
        .ok();
    debug!(%spec, "logging initialised");
    Ok(())
}

/// Load the configuration named on the command line, or the default one.
fn settings(path: Option<&Path>) -> Result<Settings> {
    Ok(load_or_default(path)?)
}

/// Dispatch one parsed command line.
async fn run(cli: Cli) -> Result<()> {
    init_logging(&cli.log)?;
    let config = cli.config.as_deref();
    match cli.command {
        Command::Start { root } => start::run(&settings(config)?, &root).await,
        Command::Devices => {
            print!("{}", inspect::devices(&settings(config)?)?);
            Ok(())
        }
        Command::Plugins { path } => {
            let dir = match path {
                Some(p) => p,
                None => settings(config)?.plugins.directory,
            };
            print!("{}", inspect::plugins(&dir)?);
            Ok(())
        }
        Command::Show { root } => {
            print!("{}", inspect::show(&settings(config)?, &root)?);
            Ok(())
        }
        Command::Shell { command, target } => {
            let client = Client::new(target.host, target.port);
            let reply = match command {
                ShellCommand::Echo { message } => shell::echo(&client, message).await?,
                ShellCommand::Push { key, duration } => shell::push(&client, key, duration).await?,
            };
            println!("{}", shell::render(&reply));
            match shell::failure(&reply) {
                Some(reason) => Err(Error::Rejected(reason)),
                None => Ok(()),
            }
        }
        Command::Config {
            command: ConfigCommand::Get { key },
        } => {
            println!("{}", inspect::config_get(&settings(config)?, &key)?);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run(Cli::parse()).await {
        e.exit();
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn shell_push_defaults() {
        let cli = Cli::parse_from(["deckpilot", "shell", "push", "3"]);
        match cli.command {
            Command::Shell {
                command: ShellCommand::Push { key, duration },
                target,
            } => {
                assert_eq!(key, 3);
                assert!((duration - 2.0).abs() < f64::EPSILON);
                assert_eq!(target.host, "127.0.0.1");
                assert_eq!(target.port, DEFAULT_COMMAND_PORT);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::parse_from([
            "deckpilot",
            "shell",
            "echo",
            "hi",
            "--port",
            "4000",
            "--config",
            "/tmp/deck.toml",
        ]);
        assert_eq!(cli.config.as_deref(), Some(Path::new("/tmp/deck.toml")));
        match cli.command {
            Command::Shell {
                command: ShellCommand::Echo { message },
                target,
            } => {
                assert_eq!(message, "hi");
                assert_eq!(target.port, 4000);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn start_root_defaults() {
        let cli = Cli::parse_from(["deckpilot", "--debug", "start"]);
        assert!(cli.log.debug);
        match cli.command {
            Command::Start { root } => assert_eq!(root, PathBuf::from("config/root")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
