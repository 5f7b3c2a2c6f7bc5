use std::path::PathBuf;

use clap::{Parser, Subcommand};

use adj_gateway::{cli, server};

#[derive(Parser)]
#[command(name = "adjutant", version, about = "AI chief-of-staff assistant backend")]
struct Cli {
    /// Config file path (default: $ADJUTANT_CONFIG, then config.toml).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the server (the default when no subcommand is given).
    Serve,
    /// Inspect the effective configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Check the config for errors and warnings.
    Validate,
    /// Print the config with all defaults applied.
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    let config = cli::load_config(args.config.as_deref())?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            init_tracing(config.server.debug);
            server::run(config).await
        }
        Command::Config { action } => match action {
            ConfigAction::Validate => cli::validate(&config),
            ConfigAction::Show => cli::show(&config),
        },
    }
}

fn init_tracing(debug: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(if debug { "debug" } else { "info" }));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if debug {
        builder.compact().init();
    } else {
        builder.json().init();
    }
}
