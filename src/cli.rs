// CLI module - command-line argument parsing and handlers
//
// Without a subcommand the chat terminal runs. The config subcommand
// inspects or resets the configuration file:
// - config --show: Display effective configuration
// - config --path: Show config file path
// - config --reset: Rewrite config file with defaults

use crate::config::{Config, ConfigSource, VERSION};
use crate::tui::app::RunArgs;
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::io::Write;

/// chatterm - a reactive terminal chat assistant
#[derive(Debug, Parser)]
#[command(name = "chatterm")]
#[command(version = VERSION)]
#[command(about = "Reactive terminal chat assistant", long_about = None)]
pub struct Cli {
    /// Submit this text as the first message once the app is running
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Run without taking over the terminal; logs go to stdout and the
    /// transcript is printed when the first response ends
    #[arg(long)]
    pub headless: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn run_args(&self) -> RunArgs {
        RunArgs {
            initial_prompt: self.prompt.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,

        /// Reset config file to defaults
        #[arg(long)]
        reset: bool,

        /// Skip the overwrite confirmation for --reset
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

/// Handle subcommands. Returns true if one ran (the process should exit).
pub fn handle_command(cli: &Cli) -> Result<bool> {
    let Some(Commands::Config {
        show,
        path,
        reset,
        yes,
    }) = &cli.command
    else {
        return Ok(false);
    };

    if *path {
        handle_config_path()?;
    } else if *show {
        handle_config_show()?;
    } else if *reset {
        handle_config_reset(*yes)?;
    } else {
        println!("Usage: chatterm config [--show|--path|--reset [--yes]]");
        println!();
        println!("Options:");
        println!("  --show    Display effective configuration");
        println!("  --path    Show config file path");
        println!("  --reset   Reset config file to defaults");
    }
    Ok(true)
}

fn config_path() -> Result<std::path::PathBuf> {
    Config::config_path().ok_or_else(|| anyhow!("could not determine config path"))
}

fn handle_config_path() -> Result<()> {
    println!("{}", config_path()?.display());
    Ok(())
}

fn handle_config_show() -> Result<()> {
    let (config, source) = Config::load()?;

    println!("# Effective configuration (env > file > defaults)");
    match source {
        ConfigSource::File(path) => println!("# Source: {}", path.display()),
        ConfigSource::Defaults => println!("# Source: defaults (no config file)"),
    }
    println!();
    print!("{}", config.to_toml());
    Ok(())
}

fn handle_config_reset(skip_confirm: bool) -> Result<()> {
    let path = config_path()?;

    if path.exists() && !skip_confirm {
        eprint!("Config file exists at {}. Overwrite? [y/N] ", path.display());
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    Config::write_defaults(&path)?;
    println!("Config reset to defaults: {}", path.display());
    Ok(())
}
