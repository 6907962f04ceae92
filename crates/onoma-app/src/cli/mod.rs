use std::path::PathBuf;

use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand, ValueEnum};

/// Top-level CLI entry point.
#[derive(Debug, Parser)]
#[command(
    name = "onoma",
    version,
    author,
    about = "AI-assisted batch image renamer"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
    /// Increase logging verbosity (-v, -vv, -vvv).
    #[arg(global = true, short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            command: None,
            verbose: 0,
        }
    }
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn print_help() {
        let mut cmd = Cli::command();
        let _ = cmd.print_help();
        println!();
    }
}

/// Supported subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Rename a batch of images using the naming service.
    Rename(RenameArgs),
}

/// Options for the `rename` command.
#[derive(Debug, Args)]
pub struct RenameArgs {
    /// Image file or directory of images to rename.
    pub path: PathBuf,
    /// Directory where the renamed bundle will be written.
    #[arg(long, value_name = "DIR", default_value = "renamed")]
    pub output: PathBuf,
    /// Maximum number of records per naming call (defaults from config).
    #[arg(long)]
    pub chunk_size: Option<usize>,
    /// Idle seconds between orchestration cycles (defaults from config).
    #[arg(long)]
    pub cooldown_secs: Option<u64>,
    /// Gemini model used for naming inference (defaults from config).
    #[arg(long)]
    pub model: Option<String>,
    /// Limit the number of files enqueued (omit to take everything).
    #[arg(long)]
    pub limit: Option<usize>,
    /// Overwrite an existing output directory without prompting.
    #[arg(long, action = ArgAction::SetTrue)]
    pub force: bool,
    /// Resolve names and report, but skip the bundle export.
    #[arg(long, action = ArgAction::SetTrue)]
    pub dry_run: bool,
    /// Output format for the result listing (table or json).
    #[arg(long, default_value = "table")]
    pub format: RenameFormat,
}

/// Format for the rename result listing.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RenameFormat {
    Table,
    Json,
}
