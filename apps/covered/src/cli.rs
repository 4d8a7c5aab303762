//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "covered", version, about = "Steam cover art catalog")]
pub struct Cli {
    /// Configuration file (defaults to `$XDG_CONFIG_HOME/covered/config.toml`).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Runs the cover sync loop until interrupted.
    Run,

    /// Runs a single cover sync tick and prints its report.
    SyncOnce,

    /// Loads a user's Steam games into the catalog.
    Import {
        /// Steam id, vanity name or community profile URL.
        #[arg(long)]
        user: String,

        /// Steam access token; imports the family-shared library instead.
        #[arg(long)]
        family_token: Option<String>,
    },

    /// Adds a single Steam app to the catalog.
    LoadGame {
        #[arg(long)]
        app_id: u64,

        /// Looked up in the Steam app list when omitted.
        #[arg(long, default_value = "")]
        name: String,

        #[arg(long, default_value = "")]
        capsule: String,
    },

    /// Lists catalog games.
    Games {
        /// Case-insensitive name filter.
        #[arg(long)]
        search: Option<String>,
    },

    /// Lists the covers of one game.
    Covers {
        /// Catalog game id.
        #[arg(long)]
        game: String,
    },

    /// Writes the images of the given covers into a zip file.
    Export {
        #[arg(long)]
        out: PathBuf,

        #[arg(required = true)]
        cover_ids: Vec<String>,
    },

    /// Manages imported Steam users.
    Users {
        #[command(subcommand)]
        action: UsersCommand,
    },
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum UsersCommand {
    /// Imports a user's owned games and records the user.
    Add {
        /// Steam id, vanity name or community profile URL.
        user: String,

        /// Display name; defaults to the stored one or the Steam id.
        #[arg(long, default_value = "")]
        name: String,
    },

    /// Lists recorded users.
    List,

    /// Shows a user and their games.
    Show {
        /// Catalog user id.
        id: String,
    },

    /// Deletes a user record. Their games stay in the catalog.
    Rm {
        /// Catalog user id.
        id: String,
    },
}
