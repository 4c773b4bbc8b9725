use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "localgoods")]
#[command(about = "Favorite and revisit Local Goods listings from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage favorite listings
    #[command(alias = "fav")]
    Favorite {
        #[command(subcommand)]
        command: FavoriteCommands,
    },
    /// Manage recently viewed listings
    View {
        #[command(subcommand)]
        command: ViewCommands,
    },
    /// Reconcile saved items with your account
    Sync,
    /// Show sign-in and sync status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete every saved item stored on this device
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
    /// Configure the Supabase backend
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Authenticate with Supabase
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

/// Listing details captured alongside a saved item
#[derive(Args, Debug, Default, Clone)]
pub struct SnapshotArgs {
    /// Listing title
    #[arg(long)]
    pub title: Option<String>,
    /// Price in cents
    #[arg(long, value_name = "CENTS")]
    pub price_cents: Option<i64>,
    /// Listing image URL
    #[arg(long, value_name = "URL")]
    pub image_url: Option<String>,
    /// Seller display name
    #[arg(long, value_name = "NAME")]
    pub seller: Option<String>,
}

#[derive(Subcommand)]
pub enum FavoriteCommands {
    /// Favorite a listing (or move it to the top)
    Add {
        /// Listing ID
        listing_id: String,
        #[command(flatten)]
        snapshot: SnapshotArgs,
    },
    /// Unfavorite a listing
    #[command(alias = "rm")]
    Remove {
        /// Listing ID
        listing_id: String,
    },
    /// List favorites, newest first
    List {
        /// Number of favorites to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ViewCommands {
    /// Record a listing view
    Add {
        /// Listing ID
        listing_id: String,
        #[command(flatten)]
        snapshot: SnapshotArgs,
    },
    /// List recently viewed listings, newest first
    List {
        /// Number of listings to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear the recently viewed list
    Clear,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Store Supabase project settings
    Init {
        /// Supabase project URL
        #[arg(long, value_name = "URL")]
        supabase_url: Option<String>,
        /// Supabase anon/public key
        #[arg(long, value_name = "KEY")]
        supabase_anon_key: Option<String>,
    },
    /// Print the effective configuration
    Show,
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Login with Supabase email/password, store the session and sync
    Login {
        /// Account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Show the signed-in account
    Status,
    /// Sign out and forget the stored session
    Logout,
}
