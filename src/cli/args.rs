//! Clap argument types.

use clap::Parser;
use std::path::PathBuf;

/// Personal automation toolkit: rain forecasts, inbox monitoring, chat
/// notifications.
#[derive(Parser, Debug)]
#[command(
    name = "raincheck",
    version = raincheck::constants::VERSION,
    about = "Personal automation toolkit: rain forecasts, inbox monitoring, chat notifications",
)]
pub struct Cli {
    /// Path to the credential file (overrides config and default).
    #[arg(long, global = true, value_name = "PATH")]
    pub secrets_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Preload credentials and run all jobs in parallel.
    Run(RunArgs),

    /// Check rain forecasts and push a notification if warranted.
    Rain,

    /// Poll the inbox and print message summaries.
    Mail(MailArgs),

    /// Send a message to the chat webhook.
    Notify(NotifyArgs),

    /// Inspect the credential store.
    Secrets {
        #[command(subcommand)]
        action: SecretsAction,
    },

    /// Print version and build information.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Message the notify job sends as its self-test.
    #[arg(long, default_value = "raincheck: jobs started")]
    pub message: String,
}

/// Arguments for the `mail` subcommand.
#[derive(Parser, Debug)]
pub struct MailArgs {
    /// Folder to search (defaults to the configured folder).
    #[arg(long)]
    pub folder: Option<String>,

    /// IMAP search criteria (defaults to the configured criteria).
    #[arg(long)]
    pub criteria: Option<String>,
}

/// Arguments for the `notify` subcommand.
#[derive(Parser, Debug)]
pub struct NotifyArgs {
    /// Message content to send.
    pub message: String,

    /// Phone numbers to @-mention, comma-separated.
    #[arg(long)]
    pub at_mobiles: Option<String>,

    /// User IDs to @-mention, comma-separated.
    #[arg(long)]
    pub at_userids: Option<String>,

    /// @-mention everyone.
    #[arg(long, default_value_t = false)]
    pub at_all: bool,
}

/// Credential store subcommands.
#[derive(clap::Subcommand, Debug)]
pub enum SecretsAction {
    /// List loaded entries with truncated value previews.
    List,
    /// Print the resolved credential file path.
    Path,
}
