use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::error::BizCalcError;
use crate::roi::MAX_HORIZON_YEARS;
use crate::time_value::{compound, irr};
use crate::types::{with_metadata, ComputationOutput, Money, Percent, Years};
use crate::BizCalcResult;

/// Share of operating costs attributed to employee productivity gains.
const PRODUCTIVITY_WEIGHT: Decimal = dec!(0.5);

/// Share of revenue attributed to customer satisfaction gains.
const SATISFACTION_WEIGHT: Decimal = dec!(0.02);

const IRR_GUESS: Decimal = dec!(0.10);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Investment case for a solution rollout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoiInput {
    /// Current annual revenue
    pub annual_revenue: Money,
    /// Current annual operating costs
    pub annual_operating_costs: Money,
    /// One-off implementation cost, spent in year 0
    pub implementation_cost: Money,
    /// Recurring cost charged in every projected year
    pub annual_maintenance_cost: Money,
    /// Expected revenue uplift at full effect, in percent
    pub revenue_increase_percent: Percent,
    /// Expected operating cost reduction at full effect, in percent
    pub cost_reduction_percent: Percent,
    /// Rollout duration; benefits ramp linearly until it completes
    pub time_to_implement_months: u32,
    /// Include productivity and satisfaction benefits
    #[serde(default)]
    pub include_intangibles: bool,
    #[serde(default)]
    pub employee_productivity_percent: Percent,
    #[serde(default)]
    pub customer_satisfaction_percent: Percent,
    /// Number of projected years after the investment year
    pub time_horizon_years: u32,
    /// Annual discount rate for NPV, in percent
    pub discount_rate_percent: Percent,
}

/// One row of the cash-flow projection. Year 0 is the investment year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowYear {
    pub year: u32,
    /// Implementation outlay (year 0 only)
    pub investment: Money,
    /// Maintenance charged this year (zero in year 0)
    pub maintenance_cost: Money,
    /// Rollout completion applied to this year's benefits (0-1)
    pub implementation_factor: Decimal,
    pub revenue_gain: Money,
    pub cost_savings: Money,
    pub intangible_benefit: Money,
    pub net_cash_flow: Money,
    pub cumulative_cash_flow: Money,
    /// Net cash flow relative to the implementation cost, in percent
    pub yearly_roi_percent: Percent,
    /// Net cash flow discounted to year 0
    pub discounted_cash_flow: Money,
}

/// Named contribution to the steady-state annual benefit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiFactor {
    pub name: String,
    pub percent: Percent,
}

/// Headline investment metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoiSummary {
    /// Implementation plus maintenance over the horizon
    pub total_investment: Money,
    /// Sum of net cash flows after year 0
    pub total_returns: Money,
    /// Sum of the yearly ROI percentages
    pub roi_percent: Percent,
    pub npv: Money,
    /// Simplified proxy: (NPV / implementation) x discount rate when NPV > 0
    pub irr_approx: Percent,
    /// Newton-Raphson IRR of the same cash flows, in percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irr_solved: Option<Percent>,
    pub payback_period_years: Years,
    pub benefit_cost_ratio: Decimal,
    pub roi_breakdown: Vec<RoiFactor>,
}

/// Complete ROI projection output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoiOutput {
    pub cash_flows: Vec<CashFlowYear>,
    pub summary: RoiSummary,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Project year-by-year cash flows and summary metrics for an investment.
pub fn compute_roi(input: &RoiInput) -> BizCalcResult<ComputationOutput<RoiOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_input(input, &mut warnings)?;

    let cash_flows = project_cash_flows(input)?;
    let summary = summarise(input, &cash_flows, &mut warnings);

    debug!(
        years = input.time_horizon_years,
        npv = %summary.npv,
        payback = %summary.payback_period_years,
        "roi projection computed"
    );

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Multi-year ROI projection with linear rollout ramp",
        input,
        warnings,
        elapsed,
        RoiOutput {
            cash_flows,
            summary,
        },
    ))
}

/// Share of full benefit realised in `year`.
///
/// Ramps linearly over the rollout window (measured in fractional years so
/// sub-year rollouts keep their effect), then holds at 1.
pub fn implementation_factor(year: u32, time_to_implement_months: u32) -> Decimal {
    let rollout_years = Decimal::from(time_to_implement_months) / dec!(12);
    let y = Decimal::from(year);
    if rollout_years > Decimal::ZERO && y <= rollout_years {
        y / rollout_years
    } else {
        Decimal::ONE
    }
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

fn project_cash_flows(input: &RoiInput) -> BizCalcResult<Vec<CashFlowYear>> {
    let horizon = input.time_horizon_years;
    let one_plus_d = Decimal::ONE + input.discount_rate_percent / dec!(100);

    let mut flows = Vec::with_capacity(horizon as usize + 1);
    flows.push(CashFlowYear {
        year: 0,
        investment: input.implementation_cost,
        maintenance_cost: Decimal::ZERO,
        implementation_factor: Decimal::ZERO,
        revenue_gain: Decimal::ZERO,
        cost_savings: Decimal::ZERO,
        intangible_benefit: Decimal::ZERO,
        net_cash_flow: -input.implementation_cost,
        cumulative_cash_flow: -input.implementation_cost,
        yearly_roi_percent: Decimal::ZERO,
        discounted_cash_flow: -input.implementation_cost,
    });

    let mut cumulative = -input.implementation_cost;

    for year in 1..=horizon {
        let factor = implementation_factor(year, input.time_to_implement_months);

        let revenue_gain =
            input.annual_revenue * input.revenue_increase_percent / dec!(100) * factor;
        let cost_savings =
            input.annual_operating_costs * input.cost_reduction_percent / dec!(100) * factor;
        let intangible_benefit = if input.include_intangibles {
            input.annual_operating_costs
                * PRODUCTIVITY_WEIGHT
                * input.employee_productivity_percent
                / dec!(100)
                * factor
                + input.annual_revenue
                    * SATISFACTION_WEIGHT
                    * input.customer_satisfaction_percent
                    / dec!(100)
                    * factor
        } else {
            Decimal::ZERO
        };

        let net_cash_flow =
            revenue_gain + intangible_benefit - input.annual_maintenance_cost + cost_savings;
        cumulative += net_cash_flow;

        let yearly_roi_percent = net_cash_flow / input.implementation_cost * dec!(100);
        let discounted_cash_flow = net_cash_flow
            .checked_div(compound(one_plus_d, year)?)
            .ok_or_else(|| {
                BizCalcError::invalid(
                    "discount_rate_percent",
                    format!("discount factor for year {year} leaves decimal range"),
                )
            })?;

        flows.push(CashFlowYear {
            year,
            investment: Decimal::ZERO,
            maintenance_cost: input.annual_maintenance_cost,
            implementation_factor: factor,
            revenue_gain,
            cost_savings,
            intangible_benefit,
            net_cash_flow,
            cumulative_cash_flow: cumulative,
            yearly_roi_percent,
            discounted_cash_flow,
        });
    }

    Ok(flows)
}

fn summarise(input: &RoiInput, flows: &[CashFlowYear], warnings: &mut Vec<String>) -> RoiSummary {
    let horizon = Decimal::from(input.time_horizon_years);
    let implementation = input.implementation_cost;

    let total_investment = implementation + input.annual_maintenance_cost * horizon;
    let total_returns: Money = flows.iter().skip(1).map(|f| f.net_cash_flow).sum();
    let roi_percent: Percent = flows.iter().skip(1).map(|f| f.yearly_roi_percent).sum();
    let npv: Money = flows.iter().map(|f| f.discounted_cash_flow).sum();

    let irr_approx = if npv > Decimal::ZERO {
        npv / implementation * input.discount_rate_percent
    } else {
        Decimal::ZERO
    };

    let raw_flows: Vec<Money> = flows.iter().map(|f| f.net_cash_flow).collect();
    let irr_solved = match irr(&raw_flows, IRR_GUESS) {
        Ok(rate) => Some(rate * dec!(100)),
        Err(e) => {
            warnings.push(format!("IRR solver did not produce a rate: {e}"));
            None
        }
    };

    let payback_period_years = payback_period(flows, horizon);
    if flows
        .last()
        .is_some_and(|f| f.cumulative_cash_flow < Decimal::ZERO)
    {
        warnings.push(format!(
            "Investment does not pay back within the {} year horizon",
            input.time_horizon_years
        ));
    }

    if npv < Decimal::ZERO {
        warnings.push(format!(
            "NPV of {:.2} is negative at a {}% discount rate",
            npv, input.discount_rate_percent
        ));
    }

    RoiSummary {
        total_investment,
        total_returns,
        roi_percent,
        npv,
        irr_approx,
        irr_solved,
        payback_period_years,
        benefit_cost_ratio: total_returns / implementation,
        roi_breakdown: roi_breakdown(input),
    }
}

/// Fractional year at which cumulative cash flow first turns non-negative,
/// saturating at the horizon when it never does.
fn payback_period(flows: &[CashFlowYear], horizon: Decimal) -> Years {
    for pair in flows.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        if prev.cumulative_cash_flow < Decimal::ZERO
            && curr.cumulative_cash_flow >= Decimal::ZERO
            && curr.net_cash_flow > Decimal::ZERO
        {
            let payback = Decimal::from(curr.year - 1)
                + prev.cumulative_cash_flow.abs() / curr.net_cash_flow;
            return payback.max(Decimal::ZERO).min(horizon);
        }
    }
    horizon
}

/// Percentage split of the full-effect annual benefit between its drivers.
fn roi_breakdown(input: &RoiInput) -> Vec<RoiFactor> {
    let revenue = input.annual_revenue * input.revenue_increase_percent / dec!(100);
    let cost = input.annual_operating_costs * input.cost_reduction_percent / dec!(100);
    let (productivity, satisfaction) = if input.include_intangibles {
        (
            input.annual_operating_costs * PRODUCTIVITY_WEIGHT * input.employee_productivity_percent
                / dec!(100),
            input.annual_revenue * SATISFACTION_WEIGHT * input.customer_satisfaction_percent
                / dec!(100),
        )
    } else {
        (Decimal::ZERO, Decimal::ZERO)
    };

    let total = revenue + cost + productivity + satisfaction;
    if total.is_zero() {
        return Vec::new();
    }

    [
        ("Revenue Increase", revenue),
        ("Cost Reduction", cost),
        ("Employee Productivity", productivity),
        ("Customer Satisfaction", satisfaction),
    ]
    .into_iter()
    .filter(|(_, value)| !value.is_zero())
    .map(|(name, value)| RoiFactor {
        name: name.to_string(),
        percent: value / total * dec!(100),
    })
    .collect()
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_input(input: &RoiInput, warnings: &mut Vec<String>) -> BizCalcResult<()> {
    if input.implementation_cost <= Decimal::ZERO {
        return Err(BizCalcError::invalid(
            "implementation_cost",
            "Implementation cost must be positive",
        ));
    }

    if input.time_horizon_years == 0 || input.time_horizon_years > MAX_HORIZON_YEARS {
        return Err(BizCalcError::invalid(
            "time_horizon_years",
            format!("Time horizon must be between 1 and {MAX_HORIZON_YEARS} years"),
        ));
    }

    if input.discount_rate_percent <= dec!(-100) {
        return Err(BizCalcError::invalid(
            "discount_rate_percent",
            "Discount rate must be greater than -100%",
        ));
    }

    let non_negative = [
        ("annual_revenue", input.annual_revenue),
        ("annual_operating_costs", input.annual_operating_costs),
        ("annual_maintenance_cost", input.annual_maintenance_cost),
        ("revenue_increase_percent", input.revenue_increase_percent),
        ("cost_reduction_percent", input.cost_reduction_percent),
        ("employee_productivity_percent", input.employee_productivity_percent),
        ("customer_satisfaction_percent", input.customer_satisfaction_percent),
    ];
    for (field, value) in non_negative {
        if value < Decimal::ZERO {
            return Err(BizCalcError::invalid(field, "Value cannot be negative"));
        }
    }

    if input.cost_reduction_percent > dec!(100) {
        return Err(BizCalcError::invalid(
            "cost_reduction_percent",
            "Cost reduction cannot exceed 100%",
        ));
    }

    if input.time_to_implement_months > input.time_horizon_years * 12 {
        warnings.push(format!(
            "Rollout of {} months outlasts the {} year horizon; benefits never reach full effect",
            input.time_to_implement_months, input.time_horizon_years
        ));
    }

    Ok(())
}
