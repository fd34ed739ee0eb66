use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Normalize a raw catalogue export (fill places, split storage codes).
    Clean(CleanArgs),
    /// Browse the catalogue and fill your cart interactively.
    Browse(SessionArgs),
    /// Print your cart as a numbered pick-list.
    Export(SessionArgs),
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    /// Raw catalogue export (CSV).
    #[arg(long)]
    pub input: String,

    /// Output path for the normalized catalogue CSV.
    #[arg(long)]
    pub out: String,

    /// Overwrite the output if it exists.
    #[arg(long, default_value_t = false)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct SessionArgs {
    /// Email of the signed-in user (checked against `allowed_users`).
    #[arg(long)]
    pub email: String,

    /// Given name of the signed-in user; names the cart sheet and cache.
    #[arg(long)]
    pub given_name: String,

    /// JSON config file.
    #[arg(long, default_value = "bookcart.json")]
    pub config: String,

    /// Directory holding the worksheets (default: $BOOKCART_STORE_DIR or `sheets`).
    #[arg(long)]
    pub store_dir: Option<String>,

    /// Directory for the local cart cache (default: $BOOKCART_CACHE_DIR or `.`).
    #[arg(long)]
    pub cache_dir: Option<String>,
}
