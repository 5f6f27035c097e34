//! Application orchestration and command routing.
//!
//! Handles command-line argument parsing and delegates to the command handlers.

use crate::commands;
use crate::config;
use crate::logging;
use crate::setup;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::process;

/// Record or pick an audio clip and find out which emotion it carries
#[derive(Parser)]
#[command(name = "emovox")]
#[command(version)]
#[command(about = "Record or pick an audio clip and find out which emotion it carries")]
#[command(long_about = "Record or pick an audio clip, upload it to a speech emotion recognition\nserver, and view the predicted emotion.\n\nDEFAULT COMMAND:\n    If no command is specified, 'record' is used by default.\n\nEXAMPLES:\n    # Open the recording session\n    $ emovox\n\n    # Predict the emotion of an existing file\n    $ emovox predict memo.wav\n\n    # Use another server for one run\n    $ emovox --server http://10.0.0.5:5000 predict memo.wav\n\n    # Create an account, then log in\n    $ emovox signup\n\n    # View past predictions\n    $ emovox history")]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/emovox/emovox.toml\n    History:            ~/.local/share/emovox/predictions.db\n    Logs:               ~/.local/state/emovox/emovox.log.*"
)]
struct Cli {
    /// Server base URL, overriding `server.base_url` from the config file
    #[arg(long, value_name = "URL", global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record or choose audio and predict its emotion (default)
    ///
    /// Keys: r start, s stop, f choose file, u upload, p play, q/Esc quit.
    /// Send SIGUSR1 to toggle recording from another program.
    #[command(visible_alias = "r")]
    Record,

    /// Predict the emotion of an audio file
    ///
    /// Prints the result to stdout. Exits with status 1 if the server
    /// cannot be reached or answers with something other than JSON.
    #[command(visible_alias = "p")]
    Predict {
        /// Path to the audio file to upload
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Create an account, then continue to login
    Signup,

    /// Log in, then open the recording session
    Login,

    /// List past predictions, most recent first
    #[command(visible_alias = "h")]
    History,

    /// Open the configuration file in your editor
    #[command(visible_alias = "c")]
    Config,

    /// List available audio input devices
    ///
    /// Use the ID or name shown as `audio.device` in the configuration file.
    ListDevices,

    /// Show recent log entries
    ///
    /// Display the last 50 lines of the most recent log file.
    Logs,

    /// Generate shell completion script
    ///
    /// Examples:
    ///   emovox completions bash > emovox.bash
    ///   emovox completions zsh > _emovox
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the application based on command-line arguments.
///
/// # Errors
/// - If logging initialization or config setup fails
/// - If command execution fails
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Commands that need neither logging nor config setup
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "emovox", &mut io::stdout());
            return Ok(());
        }
        Some(Commands::ListDevices) => return exit_on_error(commands::handle_list_devices()),
        Some(Commands::Logs) => return exit_on_error(commands::handle_logs()),
        _ => {}
    }

    logging::init_logging()?;
    setup::ensure_config(&config::config_path()?)?;

    let server = cli.server;
    let outcome = match cli.command {
        None | Some(Commands::Record) => commands::handle_record(server).await,
        Some(Commands::Predict { file }) => commands::handle_predict(file, server).await,
        Some(Commands::Signup) => commands::handle_signup(server).await,
        Some(Commands::Login) => commands::handle_login(server).await,
        Some(Commands::History) => commands::handle_history().await,
        Some(Commands::Config) => commands::handle_config(),
        Some(Commands::Completions { .. }) | Some(Commands::ListDevices) | Some(Commands::Logs) => {
            unreachable!("These commands are handled earlier")
        }
    };

    if let Err(e) = outcome {
        // cliclack already printed its own cancellation notice
        let message = e.to_string();
        if message.contains("cancelled") || message.contains("interrupted") {
            process::exit(0);
        }
        return Err(e);
    }

    Ok(())
}

fn exit_on_error(result: Result<(), anyhow::Error>) -> Result<(), anyhow::Error> {
    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
    Ok(())
}
