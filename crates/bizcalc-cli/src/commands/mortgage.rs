use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use bizcalc_core::mortgage::affordability::{
    self, AffordabilityInput, AffordabilityRequest, FinancingTerms,
};
use bizcalc_core::mortgage::amortization::{self, LoanParameters};
use bizcalc_core::FinancingMode;

use crate::input;

/// Arguments for the amortization schedule
#[derive(Args)]
pub struct AmortizationArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Property purchase price
    #[arg(long)]
    pub property_value: Option<Decimal>,

    /// Down payment as a percentage of the property value
    #[arg(long, alias = "down-payment", default_value = "20")]
    pub down_payment_percent: Decimal,

    /// Loan term in years
    #[arg(long, alias = "term", default_value_t = 30)]
    pub loan_term_years: u32,

    /// Annual interest or profit rate in percent (6.5 = 6.5%)
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Price as islamic financing (profit rate at 90% of the quoted rate)
    #[arg(long)]
    pub islamic: bool,

    /// Drop the monthly rows and keep only the yearly roll-up
    #[arg(long)]
    pub yearly_only: bool,
}

/// Arguments for the affordability calculation
#[derive(Args)]
pub struct AffordabilityArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Gross monthly household income
    #[arg(long)]
    pub monthly_income: Option<Decimal>,

    /// Monthly living expenses
    #[arg(long, default_value = "0")]
    pub monthly_expenses: Decimal,

    /// Existing monthly debt payments
    #[arg(long, default_value = "0")]
    pub existing_debt_payments: Decimal,

    /// Target debt-to-income ratio in percent
    #[arg(long, alias = "dti", default_value = "40")]
    pub target_debt_to_income_ratio: Decimal,

    /// Loan term in years
    #[arg(long, alias = "term", default_value_t = 30)]
    pub loan_term_years: u32,

    /// Annual interest or profit rate in percent
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Down payment as a percentage of the property value
    #[arg(long, alias = "down-payment", default_value = "20")]
    pub down_payment_percent: Decimal,

    /// Price as islamic financing
    #[arg(long)]
    pub islamic: bool,
}

fn financing_mode(islamic: bool) -> FinancingMode {
    if islamic {
        FinancingMode::Islamic
    } else {
        FinancingMode::Conventional
    }
}

pub fn run_amortization(args: AmortizationArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let loan: LoanParameters = match input::load(args.input.as_deref())? {
        Some(loan) => loan,
        None => LoanParameters {
            property_value: args
                .property_value
                .ok_or("--property-value is required (or provide --input)")?,
            down_payment_percent: args.down_payment_percent,
            loan_term_years: args.loan_term_years,
            rate: args.rate.ok_or("--rate is required (or provide --input)")?,
            financing_mode: financing_mode(args.islamic),
        },
    };

    let mut result = amortization::compute_amortization(&loan)?;
    if args.yearly_only {
        result.result.schedule.clear();
    }
    Ok(serde_json::to_value(result)?)
}

pub fn run_affordability(args: AffordabilityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: AffordabilityRequest = match input::load(args.input.as_deref())? {
        Some(request) => request,
        None => AffordabilityRequest {
            household: AffordabilityInput {
                monthly_income: args
                    .monthly_income
                    .ok_or("--monthly-income is required (or provide --input)")?,
                monthly_expenses: args.monthly_expenses,
                existing_debt_payments: args.existing_debt_payments,
                target_debt_to_income_ratio: args.target_debt_to_income_ratio,
            },
            financing: FinancingTerms {
                loan_term_years: args.loan_term_years,
                rate: args.rate.ok_or("--rate is required (or provide --input)")?,
                financing_mode: financing_mode(args.islamic),
                down_payment_percent: args.down_payment_percent,
            },
        },
    };

    let result = affordability::compute_affordability(&request.household, &request.financing)?;
    Ok(serde_json::to_value(result)?)
}
