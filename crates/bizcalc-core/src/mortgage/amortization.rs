use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::error::BizCalcError;
use crate::mortgage::MAX_TERM_YEARS;
use crate::time_value::{annuity_payment, monthly_rate};
use crate::types::{with_metadata, ComputationOutput, FinancingMode, Money, Percent, Rate};
use crate::BizCalcResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Purchase and loan terms for a property financing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanParameters {
    /// Purchase price of the property
    pub property_value: Money,
    /// Down payment as a percentage of the property value (0-100)
    pub down_payment_percent: Percent,
    /// Loan term in years
    pub loan_term_years: u32,
    /// Annual interest (conventional) or profit (islamic) rate, in percent
    pub rate: Percent,
    /// Pricing convention
    #[serde(default)]
    pub financing_mode: FinancingMode,
}

impl LoanParameters {
    pub fn down_payment_amount(&self) -> Money {
        self.property_value * self.down_payment_percent / dec!(100)
    }

    pub fn loan_amount(&self) -> Money {
        self.property_value - self.down_payment_amount()
    }

    pub fn term_months(&self) -> u32 {
        self.loan_term_years * 12
    }
}

/// One month of the amortization schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationEntry {
    /// 1-based month index
    pub month: u32,
    pub payment: Money,
    pub principal: Money,
    pub interest: Money,
    pub remaining_balance: Money,
    pub cumulative_principal: Money,
    pub cumulative_interest: Money,
    /// Share of the original loan repaid so far (0-100)
    pub percent_paid_off: Percent,
}

/// Calendar-year roll-up of the monthly schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationYear {
    pub year: u32,
    pub principal: Money,
    pub interest: Money,
    pub ending_balance: Money,
}

/// Complete amortization output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationOutput {
    pub down_payment_amount: Money,
    pub loan_amount: Money,
    /// Monthly decimal rate after the financing-mode adjustment
    pub monthly_rate: Rate,
    pub monthly_payment: Money,
    pub total_payments: Money,
    pub total_interest: Money,
    /// Down payment plus every scheduled payment
    pub total_cost: Money,
    pub schedule: Vec<AmortizationEntry>,
    pub yearly_summary: Vec<AmortizationYear>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute the fixed monthly payment and full amortization schedule.
pub fn compute_amortization(
    input: &LoanParameters,
) -> BizCalcResult<ComputationOutput<AmortizationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_loan(input, &mut warnings)?;

    let down_payment_amount = input.down_payment_amount();
    let loan_amount = input.loan_amount();
    let rate = monthly_rate(input.rate, input.financing_mode);
    let n = input.term_months();

    let (monthly_payment, schedule) = build_schedule(loan_amount, rate, n)?;

    let total_payments: Money = schedule.iter().map(|e| e.payment).sum();
    let total_interest: Money = schedule.iter().map(|e| e.interest).sum();
    let yearly_summary = summarise_by_year(&schedule);

    debug!(
        %loan_amount,
        %monthly_payment,
        months = n,
        mode = ?input.financing_mode,
        "amortization schedule built"
    );

    let output = AmortizationOutput {
        down_payment_amount,
        loan_amount,
        monthly_rate: rate,
        monthly_payment,
        total_payments,
        total_interest,
        total_cost: down_payment_amount + total_payments,
        schedule,
        yearly_summary,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Fixed-rate annuity amortization (monthly)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Walk the loan month by month from a fixed annuity payment.
///
/// The final month repays the residual balance so the schedule closes at
/// exactly zero and cumulative principal equals `loan_amount`.
pub fn build_schedule(
    loan_amount: Money,
    rate: Rate,
    months: u32,
) -> BizCalcResult<(Money, Vec<AmortizationEntry>)> {
    let payment = annuity_payment(loan_amount, rate, months)?;

    let mut schedule = Vec::with_capacity(months as usize);
    let mut balance = loan_amount;
    let mut cumulative_principal = Decimal::ZERO;
    let mut cumulative_interest = Decimal::ZERO;

    for month in 1..=months {
        let interest = balance * rate;
        let is_final = month == months;

        let (principal, row_payment) = if is_final {
            (balance, balance + interest)
        } else {
            (payment - interest, payment)
        };

        balance -= principal;
        cumulative_principal += principal;
        cumulative_interest += interest;

        if is_final {
            balance = Decimal::ZERO;
            cumulative_principal = loan_amount;
        }

        let percent_paid_off = if loan_amount.is_zero() {
            dec!(100)
        } else {
            cumulative_principal / loan_amount * dec!(100)
        };

        schedule.push(AmortizationEntry {
            month,
            payment: row_payment,
            principal,
            interest,
            remaining_balance: balance,
            cumulative_principal,
            cumulative_interest,
            percent_paid_off,
        });
    }

    Ok((payment, schedule))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_loan(input: &LoanParameters, warnings: &mut Vec<String>) -> BizCalcResult<()> {
    if input.property_value <= Decimal::ZERO {
        return Err(BizCalcError::invalid(
            "property_value",
            "Property value must be positive",
        ));
    }

    if input.down_payment_percent < Decimal::ZERO || input.down_payment_percent > dec!(100) {
        return Err(BizCalcError::invalid(
            "down_payment_percent",
            "Down payment must be between 0 and 100 percent",
        ));
    }

    if input.loan_amount() < Decimal::ZERO {
        return Err(BizCalcError::invalid(
            "loan_amount",
            "Loan amount cannot be negative",
        ));
    }

    if input.loan_term_years == 0 || input.loan_term_years > MAX_TERM_YEARS {
        return Err(BizCalcError::invalid(
            "loan_term_years",
            format!("Loan term must be between 1 and {MAX_TERM_YEARS} years"),
        ));
    }

    if input.rate < Decimal::ZERO || input.rate > dec!(100) {
        return Err(BizCalcError::invalid(
            "rate",
            "Rate must be between 0 and 100 percent",
        ));
    }

    if input.down_payment_percent < dec!(20) {
        warnings.push(format!(
            "Down payment of {}% is below 20%; lenders typically require mortgage insurance",
            input.down_payment_percent
        ));
    }

    if input.loan_term_years > 30 {
        warnings.push(format!(
            "Loan term of {} years exceeds the common 30-year maximum",
            input.loan_term_years
        ));
    }

    Ok(())
}

fn summarise_by_year(schedule: &[AmortizationEntry]) -> Vec<AmortizationYear> {
    let mut years: Vec<AmortizationYear> = Vec::with_capacity(schedule.len() / 12 + 1);

    for entry in schedule {
        let year = (entry.month - 1) / 12 + 1;
        match years.last_mut() {
            Some(current) if current.year == year => {
                current.principal += entry.principal;
                current.interest += entry.interest;
                current.ending_balance = entry.remaining_balance;
            }
            _ => years.push(AmortizationYear {
                year,
                principal: entry.principal,
                interest: entry.interest,
                ending_balance: entry.remaining_balance,
            }),
        }
    }

    years
}
