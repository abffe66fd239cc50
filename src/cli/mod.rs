//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod say;
pub mod sessions;
pub mod settings;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::debug;

use crate::cli::say::run_say;
use crate::cli::sessions::{delete_session, list_sessions};
use crate::cli::settings::{run_set, run_unset};
use crate::core::client::{AiClient, Credential};
use crate::core::config::Config;
use crate::core::controller::ConversationController;
use crate::core::store::{FileStorage, SessionStore};
use crate::ui::app::App;
use crate::ui::chat_loop::run_chat;
use crate::utils::logging::{init_tracing, LogTarget};

#[derive(Parser, Debug)]
#[command(name = "nexchat", version)]
#[command(about = "A terminal chat client for the Gemini API")]
#[command(
    long_about = "Nexchat is a full-screen terminal chat client for the Gemini API. \
Conversations are kept on disk and listed in a sidebar.\n\n\
Authentication:\n\
  GEMINI_API_KEY    API key for the Gemini API (API_KEY is also accepted)\n\
  Without a key, prompts are answered by a public relay instead.\n\n\
Controls:\n\
  Enter             Send the message\n\
  Alt+Enter         Insert a new line\n\
  F1-F4             Send a suggested prompt (empty conversation)\n\
  Ctrl+N            Start a new chat\n\
  Ctrl+X            Delete the current chat\n\
  Ctrl+K / Ctrl+J   Previous / next chat\n\
  PageUp/PageDown   Scroll the conversation\n\
  Ctrl+C or Esc     Quit"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to use instead of the configured one
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Stream answers as they arrive
    #[arg(long, global = true, conflicts_with = "no_stream")]
    pub stream: bool,

    /// Wait for complete answers
    #[arg(long, global = true)]
    pub no_stream: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat {
        /// Write debug logs to this file
        #[arg(short = 'l', long, value_name = "FILE")]
        log: Option<PathBuf>,
        /// Keep sessions in memory only
        #[arg(long)]
        ephemeral: bool,
    },
    /// Answer a single prompt and print it
    Say {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        prompt: Vec<String>,
    },
    /// List stored chat sessions
    Sessions,
    /// Delete a stored chat session
    Delete {
        /// Session id, as shown by `nexchat sessions`
        id: String,
    },
    /// Set a configuration value
    Set {
        /// Configuration key to set
        key: String,
        /// Value to set for the key
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset a configuration value
    Unset {
        /// Configuration key to unset
        key: String,
    },
    /// Print the current configuration
    Config,
}

impl Args {
    /// The streaming choice from the flags, if any was given.
    pub fn stream_override(&self) -> Option<bool> {
        match (self.stream, self.no_stream) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }

    /// Fold command-line overrides into the loaded configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.model = Some(model.clone());
        }
        if let Some(stream) = self.stream_override() {
            config.stream = Some(stream);
        }
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let command = args.command.clone().unwrap_or(Commands::Chat {
        log: None,
        ephemeral: false,
    });

    let log_target = match &command {
        Commands::Chat { log: Some(path), .. } => LogTarget::File(path.as_path()),
        Commands::Chat { log: None, .. } => LogTarget::Off,
        _ => LogTarget::Stderr,
    };
    init_tracing(log_target)?;

    let mut config = Config::load()?;
    args.apply_overrides(&mut config);

    match command {
        Commands::Chat { ephemeral, .. } => {
            let client = Arc::new(build_client(&config)?);
            let store = open_store(&config, ephemeral);
            let controller = ConversationController::new(store, client);
            let app = App::new(
                controller,
                config.model().to_string(),
                config.stream_enabled(),
            );
            run_chat(app).await
        }
        Commands::Say { prompt } => {
            let client = Arc::new(build_client(&config)?);
            run_say(client, prompt, config.stream_enabled()).await
        }
        Commands::Sessions => list_sessions(&open_store(&config, false)),
        Commands::Delete { id } => delete_session(&open_store(&config, false), &id),
        Commands::Set { key, value } => run_set(&key, &value.join(" ")),
        Commands::Unset { key } => run_unset(&key),
        Commands::Config => {
            Config::load()?.print_all();
            Ok(())
        }
    }
}

/// The single client instance shared by everything that talks to the model.
pub fn build_client(config: &Config) -> Result<AiClient, Box<dyn Error>> {
    let credential = Credential::from_env();
    if !credential.is_configured() {
        debug!("No API key in the environment; answers come from the relay");
    }
    Ok(AiClient::from_config(config, credential)?)
}

pub fn open_store(config: &Config, ephemeral: bool) -> SessionStore {
    if ephemeral {
        SessionStore::in_memory()
    } else {
        SessionStore::new(Box::new(FileStorage::new(config.data_dir())))
    }
}
