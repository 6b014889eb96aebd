use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use std::path::{Path, PathBuf};
use std::sync::Once;

use strata_runtime::RuntimeConfig;

mod scenario;

use scenario::{run_protected, run_unprotected, Scenario};

#[derive(Parser)]
#[command(name = "strata")]
#[command(author, version, about = "Exercise and configure the strata runtime")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trigger a fault, exception or termination and report how the runtime handles it
    Trigger {
        /// What to trigger
        scenario: Scenario,

        /// Run outside any protected region, as an unhandled failure
        #[arg(long)]
        unprotected: bool,

        /// Runtime configuration file (strata.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Inspect runtime configuration files
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Validate a configuration file and print the effective settings
    Check {
        /// Configuration file to check
        file: PathBuf,
    },
}

static TRACING_INIT: Once = Once::new();

/// Enable log output with `STRATA_LOG=debug` or `STRATA_LOG=strata_runtime=trace`.
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if let Ok(filter) = EnvFilter::try_from_env("STRATA_LOG") {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
                .with(filter)
                .init();
        }
    });
}

fn load_config(path: &Path) -> Result<RuntimeConfig> {
    RuntimeConfig::from_file(path)
        .map_err(|e| miette::miette!("{}: {}", path.display(), e))
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))?;

    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Trigger {
            scenario,
            unprotected,
            config,
        } => {
            let config = match config {
                Some(path) => load_config(&path)?,
                None => RuntimeConfig::default(),
            };
            strata_runtime::init_with(&config);
            tracing::debug!(?scenario, unprotected, "running scenario");

            if unprotected {
                let code = run_unprotected(scenario);
                if code == 0 {
                    println!("completed");
                }
                std::process::exit(code);
            }
            println!("{}", run_protected(scenario));
        }

        Commands::Config {
            command: ConfigCommands::Check { file },
        } => {
            let config = load_config(&file)?;
            let rendered = toml::to_string_pretty(&config).into_diagnostic()?;
            println!("{}: OK", file.display());
            print!("{rendered}");
        }
    }

    Ok(())
}
