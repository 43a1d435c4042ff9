use clap::Args;
use serde_json::Value;

use bizcalc_core::segmentation::cohorts;
use bizcalc_core::segmentation::records::SegmentationInput;

use crate::input;

/// Arguments for user segmentation
#[derive(Args)]
pub struct SegmentArgs {
    /// Path to JSON/YAML file with `as_of`, `profiles`, `activity_logs`
    /// and `transactions`
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_segment(args: SegmentArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let data: SegmentationInput = input::load(args.input.as_deref())?
        .ok_or("--input file (or JSON on stdin) is required for segmentation")?;

    let result = cohorts::segment_users(&data);
    Ok(serde_json::to_value(result)?)
}
