mod commands;
mod input;
mod logging;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::mortgage::{AffordabilityArgs, AmortizationArgs};
use commands::roi::RoiArgs;
use commands::segmentation::SegmentArgs;

/// Mortgage, affordability, ROI and customer segmentation calculators
#[derive(Parser)]
#[command(
    name = "bizcalc",
    version,
    about = "Mortgage, affordability, ROI and customer segmentation calculators",
    long_about = "A CLI for the business calculators with decimal precision. \
                  Supports amortization schedules (conventional and islamic), \
                  home affordability, investment ROI/NPV projections and \
                  rule-based user segmentation."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log computation details to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Monthly payment and amortization schedule for a property loan
    Amortization(AmortizationArgs),
    /// Maximum affordable payment, loan and property value
    Affordability(AffordabilityArgs),
    /// Multi-year ROI, NPV and payback projection
    Roi(RoiArgs),
    /// Bucket users into behavioural cohorts
    Segment(SegmentArgs),
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
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Amortization(args) => commands::mortgage::run_amortization(args),
        Commands::Affordability(args) => commands::mortgage::run_affordability(args),
        Commands::Roi(args) => commands::roi::run_roi(args),
        Commands::Segment(args) => commands::segmentation::run_segment(args),
        Commands::Version => {
            println!("bizcalc {}", env!("CARGO_PKG_VERSION"));
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
