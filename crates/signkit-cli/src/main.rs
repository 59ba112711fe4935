use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod output;

use commands::{
    assets::{AssetsCommands, handle_assets_command},
    config::{ConfigCommands, handle_config_command},
    doctor::handle_doctor_command,
    patch::handle_patch_command,
    setup::{SetupArgs, handle_setup_command},
};
use output::print_error;

#[derive(Parser)]
#[command(name = "signkit", version)]
#[command(about = "Release signing setup for Flutter Android apps", long_about = None)]
struct Cli {
    /// Flutter project root
    #[arg(long, env = "SIGNKIT_PROJECT_DIR", default_value = ".", global = true)]
    project_dir: PathBuf,

    /// Config file (defaults to signkit.huml in the project root)
    #[arg(long, env = "SIGNKIT_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a keystore and wire release signing into the project
    Setup(SetupArgs),

    /// Patch the Gradle build script only
    Patch,

    /// Back up or restore Firebase config files
    #[command(subcommand)]
    Assets(AssetsCommands),

    /// Check the toolchain and project state
    Doctor,

    /// Manage the signkit config file
    #[command(subcommand)]
    Config(ConfigCommands),
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| config::default_config_path(&cli.project_dir));

    // Config commands work on the file itself, handle separately
    let command = match cli.command {
        Commands::Config(cmd) => return handle_config_command(&config_path, cmd),
        Commands::Setup(args) => {
            return handle_setup_command(&cli.project_dir, &config_path, args).await;
        }
        other => other,
    };

    let file_config = config::load_config(&config_path)?;
    let layout = config::resolve_layout(&cli.project_dir, file_config.as_ref());

    match command {
        Commands::Patch => handle_patch_command(&layout).await,
        Commands::Assets(cmd) => handle_assets_command(&layout, cmd).await,
        Commands::Doctor => {
            let keystore_name = config::resolve_keystore_name(file_config.as_ref());
            handle_doctor_command(&layout, &keystore_name).await
        }
        Commands::Config(_) | Commands::Setup(_) => unreachable!(), // Handled above
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env file if present (doesn't override existing env vars)
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "signkit=warn,signkit_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = ctrlc::set_handler(|| {
        eprintln!();
        print_error("Cancelled");
        std::process::exit(1);
    }) {
        tracing::warn!("Could not install Ctrl-C handler: {}", e);
    }

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(&format!("{:#}", e));
            tracing::debug!("{:?}", e);
            ExitCode::FAILURE
        }
    }
}
