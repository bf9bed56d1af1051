mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::period::PeriodArgs;
use commands::report::ReportArgs;
use commands::run::RunArgs;

/// CLO cash-flow waterfall simulator
#[derive(Parser)]
#[command(
    name = "clo",
    version,
    about = "CLO cash-flow waterfall simulator",
    long_about = "Runs a CLO deal period by period through its interest and principal \
                  priorities of payments with decimal precision, persisting the deal \
                  state after every period so runs can be inspected and resumed."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a deal to collateral exhaustion or legal maturity
    Run(RunArgs),
    /// Print ledgers from a persisted deal state
    Report(ReportArgs),
    /// Payment period containing a date
    Period(PeriodArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Run(args) => commands::run::run_simulation(args),
        Commands::Report(args) => commands::report::run_report(args),
        Commands::Period(args) => commands::period::run_period_lookup(args),
        Commands::Version => {
            println!("clo {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
