//! Command-line interface parsing and handling
//!
//! This module parses command-line arguments and executes the matching
//! command. The chat loop is the default when no subcommand is given.

pub mod account;
pub mod chat;
pub mod history_list;

use std::error::Error;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kilnchat")]
#[command(about = "A terminal chat client for cement plant engineering questions")]
#[command(
    long_about = "Kilnchat is a terminal chat client that answers cement plant engineering \
questions through a remote AI API, tailoring its advice to a selected expertise role.\n\n\
Authentication:\n\
  Use 'kilnchat auth' to store the model API key securely in your system keyring.\n\n\
Environment Variables (fallback if no key is stored):\n\
  KILNCHAT_API_KEY    Your model API key\n\
  KILNCHAT_BASE_URL   Custom API base URL (optional, defaults to https://api.openai.com/v1)\n\n\
Accounts:\n\
  'kilnchat register' and 'kilnchat login' create and restore a local account\n\
  (with a demo one-time code step). Signed-in users get the General AI role\n\
  and saved conversations; guests can still chat in the expert roles.\n\n\
Chat commands:\n\
  /role [name]      Show or switch the expertise role\n\
  /new              Start a fresh conversation\n\
  /history          List saved conversations\n\
  /load <id>        Continue a saved conversation\n\
  /dismiss          Clear the current error and allow sending again\n\
  /quit             Leave the chat"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to use for chat
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Expertise role to start the session with
    #[arg(short = 'r', long, global = true, value_name = "ROLE")]
    pub role: Option<String>,

    /// Resolve the API key from the environment only (skip the keyring)
    #[arg(long, global = true)]
    pub env_only: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store the model API key in the system keyring
    Auth,
    /// Remove the stored model API key
    Deauth,
    /// Start the chat interface (default)
    Chat,
    /// Create an account (name, email, mobile, password + one-time code)
    Register,
    /// Sign in with email or mobile
    Login,
    /// Clear the current session
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Manage saved conversations
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
}

#[derive(Subcommand)]
pub enum HistoryCommands {
    /// List saved conversations
    List,
    /// Print one saved conversation
    Show { id: String },
    /// Delete one saved conversation
    Delete { id: String },
    /// Delete every saved conversation
    Clear,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Auth => account::run_auth(),
        Commands::Deauth => account::run_deauth(),
        Commands::Register => account::run_register(),
        Commands::Login => account::run_login(),
        Commands::Logout => account::run_logout(),
        Commands::Whoami => account::run_whoami(),
        Commands::History { command } => history_list::run(command),
        Commands::Chat => chat::run_chat(args.model, args.role, args.env_only).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn argument_surface_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn bare_invocation_defaults_to_chat() {
        let args = Args::parse_from(["kilnchat"]);
        assert!(args.command.is_none());
        assert!(!args.env_only);
    }

    #[test]
    fn global_flags_reach_subcommands() {
        let args = Args::parse_from(["kilnchat", "chat", "-m", "gpt-4o", "-r", "procurement"]);
        assert_eq!(args.model.as_deref(), Some("gpt-4o"));
        assert_eq!(args.role.as_deref(), Some("procurement"));
    }
}
