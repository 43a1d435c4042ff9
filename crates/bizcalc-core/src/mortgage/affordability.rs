use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::error::BizCalcError;
use crate::mortgage::MAX_TERM_YEARS;
use crate::time_value::{annuity_principal, monthly_rate};
use crate::types::{with_metadata, ComputationOutput, FinancingMode, Money, Percent};
use crate::BizCalcResult;

/// Debt-to-income ceilings reported alongside the target scenario.
pub const DTI_SCENARIOS: [Decimal; 3] = [dec!(40), dec!(50), dec!(60)];

/// Rate shock, in percentage points, applied to the stressed scenario.
pub const STRESS_RATE_SHOCK: Decimal = dec!(2);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Household cash flow used to size a mortgage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffordabilityInput {
    pub monthly_income: Money,
    pub monthly_expenses: Money,
    pub existing_debt_payments: Money,
    /// Maximum share of income that may go to debt service, in percent
    pub target_debt_to_income_ratio: Percent,
}

/// Loan terms the affordable payment is converted through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancingTerms {
    pub loan_term_years: u32,
    /// Annual interest or profit rate, in percent
    pub rate: Percent,
    #[serde(default)]
    pub financing_mode: FinancingMode,
    /// Down payment share used to turn a loan into a property value
    #[serde(default)]
    pub down_payment_percent: Percent,
}

/// Serialisable request combining both halves, as read by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffordabilityRequest {
    pub household: AffordabilityInput,
    pub financing: FinancingTerms,
}

/// Affordability under one debt-to-income ratio and rate combination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffordabilityScenario {
    pub label: String,
    pub debt_to_income_ratio: Percent,
    pub rate: Percent,
    pub monthly_payment: Money,
    pub loan_amount: Money,
    pub property_value: Money,
}

/// Complete affordability output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffordabilityOutput {
    pub affordable_monthly_payment: Money,
    pub affordable_loan_amount: Money,
    pub affordable_property_value: Money,
    pub down_payment_required: Money,
    /// Income left after expenses, debts and the affordable payment. Signed:
    /// a negative value is the monthly shortfall of an overcommitted household.
    pub residual_monthly_income: Money,
    /// DTI 40 / 50 / 60 followed by the stressed (rate + 2) scenario
    pub scenarios: Vec<AffordabilityScenario>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Size the largest loan and property a household can carry.
///
/// The affordable payment is capped both by the debt-to-income ceiling and by
/// disposable income, then converted to a loan amount by inverting the
/// annuity formula.
pub fn compute_affordability(
    input: &AffordabilityInput,
    terms: &FinancingTerms,
) -> BizCalcResult<ComputationOutput<AffordabilityOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_input(input, terms, &mut warnings)?;

    let target = evaluate_scenario(
        "Target",
        input,
        terms,
        input.target_debt_to_income_ratio,
        terms.rate,
    )?;

    let mut scenarios = Vec::with_capacity(DTI_SCENARIOS.len() + 1);
    for ratio in DTI_SCENARIOS {
        scenarios.push(evaluate_scenario(
            &format!("DTI {ratio}%"),
            input,
            terms,
            ratio,
            terms.rate,
        )?);
    }
    scenarios.push(evaluate_scenario(
        &format!("Stressed (+{STRESS_RATE_SHOCK} pts)"),
        input,
        terms,
        input.target_debt_to_income_ratio,
        terms.rate + STRESS_RATE_SHOCK,
    )?);

    if target.monthly_payment.is_zero() {
        warnings.push(
            "Expenses and existing debts consume the available income; no payment capacity".into(),
        );
    }

    let residual_monthly_income = input.monthly_income
        - input.monthly_expenses
        - input.existing_debt_payments
        - target.monthly_payment;

    debug!(
        payment = %target.monthly_payment,
        loan = %target.loan_amount,
        "affordability computed"
    );

    let output = AffordabilityOutput {
        affordable_monthly_payment: target.monthly_payment,
        affordable_loan_amount: target.loan_amount,
        affordable_property_value: target.property_value,
        down_payment_required: target.property_value - target.loan_amount,
        residual_monthly_income,
        scenarios,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Debt-to-income capacity with annuity inversion",
        &AffordabilityRequest {
            household: input.clone(),
            financing: terms.clone(),
        },
        warnings,
        elapsed,
        output,
    ))
}

/// Monthly payment capacity under a debt-to-income ceiling, never negative.
pub fn payment_capacity(input: &AffordabilityInput, dti_ratio: Percent) -> Money {
    let debt_ceiling =
        input.monthly_income * dti_ratio / dec!(100) - input.existing_debt_payments;
    let disposable =
        input.monthly_income - input.monthly_expenses - input.existing_debt_payments;
    debt_ceiling.min(disposable).max(Decimal::ZERO)
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

fn evaluate_scenario(
    label: &str,
    input: &AffordabilityInput,
    terms: &FinancingTerms,
    dti_ratio: Percent,
    rate: Percent,
) -> BizCalcResult<AffordabilityScenario> {
    let monthly_payment = payment_capacity(input, dti_ratio);
    let r = monthly_rate(rate, terms.financing_mode);
    let loan_amount = annuity_principal(monthly_payment, r, terms.loan_term_years * 12)?
        .max(Decimal::ZERO);

    let financed_share = Decimal::ONE - terms.down_payment_percent / dec!(100);
    let property_value = loan_amount / financed_share;

    Ok(AffordabilityScenario {
        label: label.to_string(),
        debt_to_income_ratio: dti_ratio,
        rate,
        monthly_payment,
        loan_amount,
        property_value,
    })
}

fn validate_input(
    input: &AffordabilityInput,
    terms: &FinancingTerms,
    warnings: &mut Vec<String>,
) -> BizCalcResult<()> {
    let amounts = [
        ("monthly_income", input.monthly_income),
        ("monthly_expenses", input.monthly_expenses),
        ("existing_debt_payments", input.existing_debt_payments),
    ];
    for (field, value) in amounts {
        if value < Decimal::ZERO {
            return Err(BizCalcError::invalid(field, "Amount cannot be negative"));
        }
    }

    if input.target_debt_to_income_ratio < Decimal::ZERO
        || input.target_debt_to_income_ratio > dec!(100)
    {
        return Err(BizCalcError::invalid(
            "target_debt_to_income_ratio",
            "Debt-to-income ratio must be between 0 and 100 percent",
        ));
    }

    if terms.loan_term_years == 0 || terms.loan_term_years > MAX_TERM_YEARS {
        return Err(BizCalcError::invalid(
            "loan_term_years",
            format!("Loan term must be between 1 and {MAX_TERM_YEARS} years"),
        ));
    }

    if terms.rate < Decimal::ZERO || terms.rate > dec!(100) {
        return Err(BizCalcError::invalid(
            "rate",
            "Rate must be between 0 and 100 percent",
        ));
    }

    if terms.down_payment_percent < Decimal::ZERO || terms.down_payment_percent >= dec!(100) {
        return Err(BizCalcError::invalid(
            "down_payment_percent",
            "Down payment must be at least 0 and below 100 percent",
        ));
    }

    if input.target_debt_to_income_ratio > dec!(50) {
        warnings.push(format!(
            "Target DTI of {}% exceeds 50%; most lenders cap debt service well below this",
            input.target_debt_to_income_ratio
        ));
    }

    Ok(())
}
