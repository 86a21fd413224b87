use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

use arcfetch::commands;

#[derive(Parser)]
#[clap(name = "arcfetch")]
#[clap(about = "Download an archive and extract it")]
#[clap(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[clap(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download an archive into memory and extract it
    Extract {
        /// Archive URL (prompted for when omitted)
        url: Option<String>,
        /// Extract here instead of the configured destination
        #[clap(short, long)]
        dest: Option<PathBuf>,
        /// Print events as JSON lines
        #[clap(long)]
        json: bool,
    },
    /// Download a file and save it without extracting
    Download {
        /// File URL
        url: String,
        /// Where to save the file
        output: PathBuf,
    },
    /// Show or change configuration
    Config {
        #[clap(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the current configuration
    Show,
    /// Change the default extraction directory
    SetDest {
        /// Directory archives are extracted into
        destination: PathBuf,
    },
}

fn setup_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(verbose > 1)
        .without_time()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let result = match cli.command {
        Commands::Extract { url, dest, json } => {
            match commands::extract::extract_archive(url.as_deref(), dest.as_deref(), json) {
                Ok(outcome) if outcome.is_success() => Ok(()),
                Ok(_) => std::process::exit(1),
                Err(e) => Err(anyhow::anyhow!(e)),
            }
        }
        Commands::Download { url, output } => {
            commands::download::download_file(&url, &output).map_err(|e| anyhow::anyhow!(e))
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                commands::config::show_config().map_err(|e| anyhow::anyhow!(e))
            }
            ConfigCommands::SetDest { destination } => {
                commands::config::set_destination(destination).map_err(|e| anyhow::anyhow!(e))
            }
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    Ok(())
}
