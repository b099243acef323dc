//! CLI definitions for xblock.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// xblock CLI.
#[derive(Parser)]
#[command(name = "xblock")]
#[command(about = "One-click block and mute controls for the X timeline")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (default: ~/.xblock/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Perform an action against the platform with the configured session
    Action {
        /// block, unblock, mute or unmute
        verb: String,

        /// Target account identifier
        id: String,
    },

    /// Report whether the session account follows `id`
    Check {
        /// Target account identifier
        id: String,
    },

    /// Run one annotation pass over a saved page snapshot
    Annotate {
        /// JSON page snapshot
        snapshot: PathBuf,

        /// Print the annotated tree instead of the anchor list
        #[arg(long)]
        tree: bool,
    },

    /// Show the action counters
    Stats {
        /// Zero the counters
        #[arg(long)]
        reset: bool,
    },

    /// Show or change the stored settings
    Settings {
        #[arg(long)]
        show_block: Option<bool>,

        #[arg(long)]
        show_mute: Option<bool>,

        #[arg(long)]
        confirm_block_following: Option<bool>,
    },

    /// Clear the store, learned icons included, and reinstall defaults
    Reset,
}
