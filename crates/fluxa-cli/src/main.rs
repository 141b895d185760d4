mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::{actions::ActionsArgs, generate::GenerateArgs, validate::ValidateArgs};
use fluxa_core::config::Config;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "fluxa",
    about = "Convert image-editing tutorials into executable action JSON",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: ./fluxa.yaml when present)
    #[arg(long, global = true, env = "FLUXA_CONFIG")]
    config: Option<PathBuf>,

    /// Log progress at info level
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate actions from a tutorial URL or transcript file
    Generate(GenerateArgs),

    /// Validate an action file
    Validate(ValidateArgs),

    /// Strip metadata from an action file, leaving the bare array
    Actions(ActionsArgs),
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = load_config(&cli).and_then(|config| match cli.command {
        Commands::Generate(args) => cmd::generate::run(&config, args),
        Commands::Validate(args) => cmd::validate::run(&config, args),
        Commands::Actions(args) => cmd::actions::run(&config, args),
    });

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    use anyhow::Context;
    use fluxa_core::config::WarnLevel;

    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let config =
        Config::discover(cli.config.as_deref(), &cwd).context("failed to load config")?;

    for w in config.validate() {
        match w.level {
            WarnLevel::Warning => tracing::warn!("config: {}", w.message),
            WarnLevel::Error => tracing::error!("config: {}", w.message),
        }
    }
    Ok(config)
}
