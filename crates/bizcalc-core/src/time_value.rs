use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::BizCalcError;
use crate::types::{FinancingMode, Money, Percent, Rate};
use crate::BizCalcResult;

const CONVERGENCE_THRESHOLD: Decimal = dec!(0.0000001);
const MAX_IRR_ITERATIONS: u32 = 100;

/// Islamic financing prices the quoted profit rate at 90%.
pub const ISLAMIC_RATE_FACTOR: Decimal = dec!(0.9);

/// Convert an annual percentage into the monthly decimal rate used by the
/// annuity formulas, applying the financing-mode convention.
pub fn monthly_rate(annual_percent: Percent, mode: FinancingMode) -> Rate {
    let effective = match mode {
        FinancingMode::Conventional => annual_percent,
        FinancingMode::Islamic => annual_percent * ISLAMIC_RATE_FACTOR,
    };
    effective / dec!(100) / dec!(12)
}

/// `base^n`, failing instead of panicking when the result leaves the
/// Decimal range.
pub fn compound(base: Decimal, n: u32) -> BizCalcResult<Decimal> {
    base.checked_powu(n as u64)
        .ok_or_else(|| BizCalcError::invalid("rate", format!("({base})^{n} overflows decimal range")))
}

/// Fixed annuity payment for `principal` over `nper` periods at `rate`.
///
/// Falls back to straight-line `principal / nper` when the rate is zero.
pub fn annuity_payment(principal: Money, rate: Rate, nper: u32) -> BizCalcResult<Money> {
    if nper == 0 {
        return Err(BizCalcError::invalid("nper", "Number of periods must be > 0"));
    }

    if rate.is_zero() {
        return Ok(principal / Decimal::from(nper));
    }

    let factor = compound(Decimal::ONE + rate, nper)?;
    let denominator = factor - Decimal::ONE;
    if denominator.is_zero() {
        return Err(BizCalcError::DivisionByZero {
            context: "annuity payment ((1+r)^n - 1)".into(),
        });
    }

    // Ratio first: rate * factor / (factor - 1) stays close to `rate` even
    // when the factor itself is large.
    let per_unit = rate
        .checked_mul(factor)
        .and_then(|x| x.checked_div(denominator))
        .ok_or_else(|| BizCalcError::invalid("rate", "annuity factor overflows decimal range"))?;
    principal
        .checked_mul(per_unit)
        .ok_or_else(|| BizCalcError::invalid("principal", "payment overflows decimal range"))
}

/// Principal that a fixed `payment` services over `nper` periods at `rate`
/// (the annuity formula solved for the loan amount).
pub fn annuity_principal(payment: Money, rate: Rate, nper: u32) -> BizCalcResult<Money> {
    if nper == 0 {
        return Err(BizCalcError::invalid("nper", "Number of periods must be > 0"));
    }

    if rate.is_zero() {
        return Ok(payment * Decimal::from(nper));
    }

    let factor = compound(Decimal::ONE + rate, nper)?;
    if factor.is_zero() {
        return Err(BizCalcError::DivisionByZero {
            context: "annuity principal (1+r)^-n".into(),
        });
    }

    let per_unit = (Decimal::ONE - Decimal::ONE / factor)
        .checked_div(rate)
        .ok_or_else(|| BizCalcError::invalid("rate", "annuity factor overflows decimal range"))?;
    payment
        .checked_mul(per_unit)
        .ok_or_else(|| BizCalcError::invalid("payment", "principal overflows decimal range"))
}

/// Net Present Value of a series of cash flows, the first at t = 0.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> BizCalcResult<Money> {
    if rate <= dec!(-1) {
        return Err(BizCalcError::invalid(
            "rate",
            "Discount rate must be greater than -100%",
        ));
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount.checked_mul(one_plus_r).ok_or_else(|| {
                BizCalcError::invalid("rate", format!("discount factor overflows at period {t}"))
            })?;
        }
        result += cf.checked_div(discount).ok_or_else(|| BizCalcError::DivisionByZero {
            context: format!("NPV discount factor at period {t}"),
        })?;
    }

    Ok(result)
}

/// Internal Rate of Return using Newton-Raphson
///
/// Fails with `ConvergenceFailure` when the iteration does not settle or
/// walks into a rate where the discount factors leave the Decimal range.
pub fn irr(cash_flows: &[Money], guess: Rate) -> BizCalcResult<Rate> {
    if cash_flows.len() < 2 {
        return Err(BizCalcError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }

    let diverged = |iterations: u32, last_delta: Decimal| BizCalcError::ConvergenceFailure {
        function: "IRR".into(),
        iterations,
        last_delta,
    };

    let mut rate = guess;

    for i in 0..MAX_IRR_ITERATIONS {
        let (npv_val, dnpv) =
            npv_and_derivative(cash_flows, rate).ok_or_else(|| diverged(i, Decimal::MAX))?;

        if npv_val.abs() < CONVERGENCE_THRESHOLD {
            return Ok(rate);
        }

        let step = npv_val
            .checked_div(dnpv)
            .ok_or_else(|| diverged(i, npv_val))?;
        rate = rate.checked_sub(step).ok_or_else(|| diverged(i, npv_val))?;

        // Guard against divergence
        if rate < dec!(-0.99) {
            rate = dec!(-0.99);
        } else if rate > dec!(100.0) {
            rate = dec!(100.0);
        }
    }

    let last_delta = npv_and_derivative(cash_flows, rate)
        .map(|(v, _)| v)
        .unwrap_or(Decimal::MAX);
    Err(diverged(MAX_IRR_ITERATIONS, last_delta))
}

/// NPV and its first derivative with respect to `rate`, or `None` when a
/// discount factor underflows to zero or a term leaves the Decimal range.
fn npv_and_derivative(cash_flows: &[Money], rate: Rate) -> Option<(Decimal, Decimal)> {
    let one_plus_r = Decimal::ONE + rate;
    let mut npv_val = Decimal::ZERO;
    let mut dnpv = Decimal::ZERO;

    for (t, cf) in cash_flows.iter().enumerate() {
        let discount = one_plus_r.checked_powu(t as u64)?;
        npv_val = npv_val.checked_add(cf.checked_div(discount)?)?;
        if t > 0 {
            let term = Decimal::from(t as u64)
                .checked_mul(*cf)?
                .checked_div(discount.checked_mul(one_plus_r)?)?;
            dnpv = dnpv.checked_sub(term)?;
        }
    }

    Some((npv_val, dnpv))
}
