mod commands;

use clap::{Parser, Subcommand};
use commands::ResolveArgs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "labrig",
    about = "Reproducible container builds for R data-analysis projects"
)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the profiles in the bundle catalog
    Profiles {
        /// Bundle catalog file (defaults to the built-in catalog)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Resolve the build configuration and show every decision
    Resolve {
        #[command(flatten)]
        args: ResolveArgs,
        /// Print the resolution as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the Dockerfile (synthesized or a pre-built template) and print the build command
    Generate {
        #[command(flatten)]
        args: ResolveArgs,
        /// Where to write a synthesized Dockerfile
        #[arg(long, short = 'o', default_value = "Dockerfile")]
        output: PathBuf,
    },
    /// Create labrig.toml in the current directory
    Init,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Profiles { catalog } => commands::profiles(catalog.as_deref()),
        Commands::Resolve { args, json } => commands::resolve(&args, json).await,
        Commands::Generate { args, output } => commands::generate(&args, &output).await,
        Commands::Init => commands::init_project(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            commands::report(&err);
            ExitCode::FAILURE
        }
    }
}
