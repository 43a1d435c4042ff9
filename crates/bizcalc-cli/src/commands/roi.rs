use clap::Args;
use serde_json::Value;
use std::fs;
use tabled::{builder::Builder, Table};

use bizcalc_core::roi::export;
use bizcalc_core::roi::projection::{self, RoiInput};
use bizcalc_core::Currency;

use crate::input;

/// Arguments for the ROI projection
#[derive(Args)]
pub struct RoiArgs {
    /// Path to JSON/YAML input file
    #[arg(long)]
    pub input: Option<String>,

    /// Also write the yearly cash flows to this CSV file
    #[arg(long)]
    pub csv_export: Option<String>,

    /// Print the cash-flow schedule to stderr, formatted in this currency
    /// (USD, EUR, GBP, SAR, AED or any ISO code)
    #[arg(long)]
    pub currency: Option<Currency>,
}

pub fn run_roi(args: RoiArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let roi_input: RoiInput = input::load(args.input.as_deref())?
        .ok_or("--input file (or JSON on stdin) is required for the ROI projection")?;

    let result = projection::compute_roi(&roi_input)?;

    if let Some(ref path) = args.csv_export {
        let csv = export::cash_flows_to_csv(&result.result.cash_flows)?;
        fs::write(path, csv).map_err(|e| format!("Failed to write '{}': {}", path, e))?;
        tracing::info!(path = %path, "cash flows exported");
    }

    if let Some(ref currency) = args.currency {
        let mut builder = Builder::default();
        builder.push_record(export::CSV_HEADERS);
        for row in export::cash_flow_rows(&result.result.cash_flows, Some(currency)) {
            builder.push_record(row);
        }
        eprintln!("{}", Table::from(builder));
    }

    Ok(serde_json::to_value(result)?)
}
