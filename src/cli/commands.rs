use clap::{Parser, Subcommand};

use crate::storage::filesystem::WIDGET_STORAGE_KEY;

#[derive(Parser)]
#[command(name = "pixy")]
#[command(author, version, about = "Pixel Studio mascot relay", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP relay
    Serve {
        /// Listening port (overrides configuration)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat with Pixy from the terminal, persisting messages like the widget does
    Chat {
        /// Directory holding the persisted messages
        #[arg(long, default_value = "./.pixy")]
        storage_dir: String,

        /// Storage key for the persisted messages
        #[arg(long, default_value = WIDGET_STORAGE_KEY)]
        key: String,

        /// Forget persisted messages before starting
        #[arg(long)]
        reset: bool,
    },
}
