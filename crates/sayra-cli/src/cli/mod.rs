//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use sayra_core::{config, interrupt};

mod commands;

#[derive(Parser)]
#[command(name = "sayra")]
#[command(version)]
#[command(about = "Sayra orb: voice and command front-end for the Sayra assistant")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Backend endpoint (overrides `session.endpoint`)
    #[arg(long, env = "SAYRA_ENDPOINT", value_name = "URL")]
    endpoint: Option<String>,

    /// Conversation entries to keep, 0 for unbounded (overrides `ui.log_capacity`)
    #[arg(long, value_name = "N")]
    log_capacity: Option<usize>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Print the effective config (file plus flags) as TOML
    Show,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        let config = load_config(cli.endpoint.as_deref(), cli.log_capacity)?;
        interrupt::init()?;
        let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
        return commands::orb::run(&config, &rt);
    };

    match command {
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::Show => {
                let config = load_config(cli.endpoint.as_deref(), cli.log_capacity)?;
                commands::config::show(&config)
            }
        },
    }
}

fn load_config(endpoint: Option<&str>, log_capacity: Option<usize>) -> Result<config::Config> {
    let mut config = config::Config::load().context("load config")?;

    if let Some(endpoint) = endpoint {
        let trimmed = endpoint.trim();
        if trimmed.is_empty() {
            anyhow::bail!("--endpoint must not be empty");
        }
        config.session.endpoint = trimmed.to_string();
    }
    if let Some(capacity) = log_capacity {
        config.ui.log_capacity = capacity;
    }

    Ok(config)
}
