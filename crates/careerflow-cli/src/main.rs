use std::path::PathBuf;

use anyhow::Result;
use careerflow_cli::sim::{run_script, Script};
use careerflow_cli::tracing_setup::init_tracing;
use careerflow_core::DashboardConfig;
use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "careerflow-sim")]
#[command(about = "Drive a CareerFlow dashboard from a JSON script")]
struct Cli {
    /// Pretty-print JSON output
    #[arg(long, short)]
    pretty: bool,

    /// Path to JSON dashboard config (menu, dashboardPath, identityTimeoutMs)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a script, printing one JSON document per snapshot step
    Run {
        /// Script file
        script: PathBuf,
    },

    /// Print the configured menu
    Menu,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MenuLine<'a> {
    index: usize,
    #[serde(flatten)]
    item: &'a careerflow_core::models::MenuItem,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_tracing() {
        eprintln!("Warning: {:#}", e);
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match cli.config {
        Some(ref path) => DashboardConfig::load(path)?,
        None => DashboardConfig::default(),
    };

    match cli.command {
        Commands::Run { script } => {
            let script = Script::load(&script)?;
            let report = run_script(&script, &config)?;
            for record in &report.snapshots {
                println!("{}", to_json(record, cli.pretty)?);
            }
            for error in &report.errors {
                eprintln!("{}", serde_json::to_string(error)?);
            }
        }
        Commands::Menu => {
            let menu = config.build_menu()?;
            let lines: Vec<MenuLine> = menu
                .items()
                .iter()
                .enumerate()
                .map(|(index, item)| MenuLine { index, item })
                .collect();
            println!("{}", to_json(&lines, cli.pretty)?);
        }
    }
    Ok(())
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> serde_json::Result<String> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
}
