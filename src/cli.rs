use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "leapchat")]
#[command(about = "Terminal chat client for the NextLeap course assistant")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Backend base URL (overrides the configuration file)
    #[arg(long)]
    pub api_base: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Start the interactive chat interface
    Chat,

    /// Send a single message and print the reply
    Ask {
        /// Message text; multiple words are joined with spaces
        #[arg(required = true)]
        message: Vec<String>,
    },

    /// Check whether the backend is reachable
    Health,
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Chat)
    }
}
