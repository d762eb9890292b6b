use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod build;
mod commands;
mod config;
mod logger;
mod util;

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// The command to execute
    #[command(subcommand)]
    command: PresskitCommand,
}

#[derive(Parser)]
struct InitArgs {
    /// The path to initialize the project in
    path: PathBuf,

    /// Whether to create the directory if it doesn't exist
    #[arg(short, long, default_value = "false")]
    create: bool,
}

#[derive(Parser)]
struct BuildArgs {
    /// The path to the configuration file (defaults to presskit.yaml)
    #[arg(short, long)]
    config_file: Option<PathBuf>,

    /// Publish drafts and future-dated content
    #[arg(long, default_value = "false")]
    dev: bool,
}

#[derive(Parser)]
struct CleanArgs {
    /// The path to the configuration file (defaults to presskit.yaml)
    #[arg(short, long)]
    config_file: Option<PathBuf>,

    /// Print what would be deleted without deleting it
    #[arg(long, default_value = "false")]
    dry_run: bool,
}

#[derive(Parser)]
struct ServeArgs {
    /// The address to bind to
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    /// The port to bind to
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Open the project in the default browser
    #[arg(short, long, default_value = "false")]
    open: bool,

    /// The path to the configuration file (defaults to presskit.yaml)
    #[arg(short, long)]
    config_file: Option<PathBuf>,

    /// Watch for changes and rebuild automatically
    #[arg(short, long, default_value = "false")]
    watch: bool,

    /// Render deferred expressions in HTML pages on every request
    #[arg(short, long, default_value = "false")]
    dynamic: bool,
}

#[derive(Subcommand)]
enum PresskitCommand {
    /// Initialize a new presskit project
    Init(InitArgs),

    /// Build the site
    Build(BuildArgs),

    /// Delete the build directory
    Clean(CleanArgs),

    /// Serve the site on a local port
    Serve(ServeArgs),
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    match args.command {
        PresskitCommand::Init(args) => {
            commands::init::run(&args).await?;
        }
        PresskitCommand::Build(args) => {
            commands::build::run(&args).await?;
        }
        PresskitCommand::Clean(args) => {
            commands::clean::run(&args).await?;
        }
        PresskitCommand::Serve(args) => {
            commands::serve::run(&args).await?;
        }
    }

    Ok(())
}
