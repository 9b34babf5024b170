use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "hgw",
    about = "HGW — batch-timed hack/grow/weaken scheduler",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Directory holding the settings database.
    #[arg(long, global = true, default_value = ".hgw")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive a target to minimum security and maximum money.
    ///
    /// Runs against the simulated network described in the config's
    /// [simulation] section. The config is read from --config, or from the
    /// settings store if no file is given.
    Optimize {
        /// Server to optimize.
        #[arg(short, long)]
        target: String,
        /// Path to hgw.toml.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Run a single allocation pass and return without waiting.
        #[arg(long)]
        force_run: bool,
        /// Store the loaded config as the new default.
        #[arg(long)]
        save_config: bool,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Show recorded optimizer runs for a target.
    Runs {
        #[arg(short, long)]
        target: String,
    },
    /// Read and write persisted settings.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Config file helpers.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print one setting.
    Get { key: String },
    /// Store a setting; booleans and numbers are detected.
    Set { key: String, value: String },
    /// Delete a setting.
    Remove { key: String },
    /// List setting keys.
    List {
        #[arg(long, default_value = "")]
        prefix: String,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a scaffold hgw.toml with a small simulated network.
    Init {
        #[arg(short, long, default_value = "hgw.toml")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,hgw_scheduler=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Optimize {
            target,
            config,
            force_run,
            save_config,
            format,
        } => {
            let args = commands::optimize::OptimizeArgs {
                target,
                config,
                force_run,
                save_config,
                format,
            };
            commands::optimize::run(&cli.data_dir, args).await
        }
        Commands::Runs { target } => commands::optimize::runs(&cli.data_dir, &target),
        Commands::Settings { action } => match action {
            SettingsAction::Get { key } => commands::settings::get(&cli.data_dir, &key),
            SettingsAction::Set { key, value } => {
                commands::settings::set(&cli.data_dir, &key, &value)
            }
            SettingsAction::Remove { key } => commands::settings::remove(&cli.data_dir, &key),
            SettingsAction::List { prefix } => commands::settings::list(&cli.data_dir, &prefix),
        },
        Commands::Config { action } => match action {
            ConfigAction::Init { path } => commands::config::init(&path),
        },
    }
}
