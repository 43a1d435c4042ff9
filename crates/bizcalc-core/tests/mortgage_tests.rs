use bizcalc_core::mortgage::affordability::{self, AffordabilityInput, FinancingTerms};
use bizcalc_core::mortgage::amortization::{self, LoanParameters};
use bizcalc_core::time_value::{annuity_payment, monthly_rate};
use bizcalc_core::{BizCalcError, FinancingMode};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Amortization tests
// ===========================================================================

fn loans() -> Vec<LoanParameters> {
    let mut cases = Vec::new();
    for (value, down, years, rate, mode) in [
        (dec!(500000), dec!(20), 30, dec!(6.5), FinancingMode::Conventional),
        (dec!(1250000), dec!(25), 25, dec!(4.25), FinancingMode::Islamic),
        (dec!(180000), dec!(5), 15, dec!(7.9), FinancingMode::Conventional),
        (dec!(99999.99), dec!(0), 1, dec!(12), FinancingMode::Islamic),
        (dec!(750000), dec!(10), 50, dec!(3), FinancingMode::Conventional),
    ] {
        cases.push(LoanParameters {
            property_value: value,
            down_payment_percent: down,
            loan_term_years: years,
            rate,
            financing_mode: mode,
        });
    }
    cases
}

#[test]
fn test_principal_sums_to_loan_amount() {
    for loan in loans() {
        let out = amortization::compute_amortization(&loan).unwrap();
        let total: Decimal = out.result.schedule.iter().map(|e| e.principal).sum();
        assert!(
            (total - loan.loan_amount()).abs() <= dec!(0.000001),
            "principal {} vs loan {}",
            total,
            loan.loan_amount()
        );
    }
}

#[test]
fn test_last_balance_exactly_zero() {
    for loan in loans() {
        let out = amortization::compute_amortization(&loan).unwrap();
        let last = out.result.schedule.last().unwrap();
        assert_eq!(last.remaining_balance, Decimal::ZERO);
        assert_eq!(last.month, loan.term_months());
    }
}

#[test]
fn test_balance_non_increasing_and_rows_balance() {
    for loan in loans() {
        let out = amortization::compute_amortization(&loan).unwrap();
        let schedule = &out.result.schedule;
        let mut previous = loan.loan_amount();
        for (i, entry) in schedule.iter().enumerate() {
            assert!(entry.remaining_balance <= previous);
            previous = entry.remaining_balance;
            if i + 1 < schedule.len() {
                assert!((entry.principal + entry.interest - entry.payment).abs() < dec!(0.0000000001));
                assert_eq!(entry.payment, out.result.monthly_payment);
            }
        }
    }
}

#[test]
fn test_zero_rate_equal_principal() {
    let loan = LoanParameters {
        property_value: dec!(240000),
        down_payment_percent: dec!(0),
        loan_term_years: 20,
        rate: Decimal::ZERO,
        financing_mode: FinancingMode::Conventional,
    };
    let out = amortization::compute_amortization(&loan).unwrap();
    let expected = dec!(240000) / dec!(240);
    assert_eq!(out.result.monthly_payment, expected);
    for entry in &out.result.schedule {
        assert_eq!(entry.principal, expected);
        assert_eq!(entry.interest, Decimal::ZERO);
    }
    assert_eq!(out.result.total_interest, Decimal::ZERO);
}

#[test]
fn test_totals_are_consistent() {
    let loan = &loans()[0];
    let out = amortization::compute_amortization(loan).unwrap();
    let r = &out.result;
    assert_eq!(r.total_payments, r.schedule.iter().map(|e| e.payment).sum::<Decimal>());
    assert_eq!(r.total_cost, r.down_payment_amount + r.total_payments);
    assert!((r.total_payments - r.total_interest - r.loan_amount).abs() < dec!(0.000001));
}

#[test]
fn test_invalid_loans_rejected_before_computation() {
    let base = loans()[0].clone();

    let mut bad = base.clone();
    bad.property_value = Decimal::ZERO;
    assert!(matches!(
        amortization::compute_amortization(&bad),
        Err(BizCalcError::InvalidInput { .. })
    ));

    let mut bad = base.clone();
    bad.loan_term_years = 51;
    assert!(amortization::compute_amortization(&bad).is_err());

    let mut bad = base;
    bad.rate = dec!(-0.5);
    assert!(amortization::compute_amortization(&bad).is_err());
}

#[test]
fn test_extreme_but_valid_loan_completes() {
    let loan = LoanParameters {
        property_value: dec!(2_000_000_000),
        down_payment_percent: Decimal::ZERO,
        loan_term_years: 50,
        rate: dec!(100),
        financing_mode: FinancingMode::Conventional,
    };
    let out = amortization::compute_amortization(&loan).unwrap();
    let last = out.result.schedule.last().unwrap();
    assert_eq!(last.remaining_balance, Decimal::ZERO);
    assert_eq!(last.cumulative_principal, dec!(2_000_000_000));
    assert!(out.warnings.iter().all(|w| !w.contains('\u{2014}')));
}

// ===========================================================================
// Affordability tests
// ===========================================================================

fn terms(mode: FinancingMode) -> FinancingTerms {
    FinancingTerms {
        loan_term_years: 30,
        rate: dec!(5.5),
        financing_mode: mode,
        down_payment_percent: dec!(20),
    }
}

#[test]
fn test_overcommitted_household_clamped_to_zero() {
    let input = AffordabilityInput {
        monthly_income: dec!(4000),
        monthly_expenses: dec!(3500),
        existing_debt_payments: dec!(900),
        target_debt_to_income_ratio: dec!(40),
    };
    let out = affordability::compute_affordability(&input, &terms(FinancingMode::Conventional))
        .unwrap();
    assert_eq!(out.result.affordable_monthly_payment, Decimal::ZERO);
    assert_eq!(out.result.affordable_loan_amount, Decimal::ZERO);
    assert_eq!(out.result.affordable_property_value, Decimal::ZERO);
    for scenario in &out.result.scenarios {
        assert!(scenario.monthly_payment >= Decimal::ZERO);
        assert!(scenario.loan_amount >= Decimal::ZERO);
    }
    assert!(!out.warnings.is_empty());
    assert!(out.warnings.iter().all(|w| !w.contains('\u{2014}')));
}

#[test]
fn test_residual_income_reports_signed_shortfall() {
    // 4000 - 3500 - 900 leaves a 400 monthly shortfall before any mortgage
    let input = AffordabilityInput {
        monthly_income: dec!(4000),
        monthly_expenses: dec!(3500),
        existing_debt_payments: dec!(900),
        target_debt_to_income_ratio: dec!(40),
    };
    let out = affordability::compute_affordability(&input, &terms(FinancingMode::Conventional))
        .unwrap();
    assert_eq!(out.result.residual_monthly_income, dec!(-400));
}

#[test]
fn test_upper_bound_terms_do_not_overflow() {
    let input = AffordabilityInput {
        monthly_income: dec!(50_000_000),
        monthly_expenses: Decimal::ZERO,
        existing_debt_payments: Decimal::ZERO,
        target_debt_to_income_ratio: dec!(60),
    };
    let financing = FinancingTerms {
        loan_term_years: 50,
        rate: dec!(100),
        financing_mode: FinancingMode::Conventional,
        down_payment_percent: Decimal::ZERO,
    };
    let out = affordability::compute_affordability(&input, &financing).unwrap();
    assert!(out.result.affordable_loan_amount > Decimal::ZERO);
    assert!(out.warnings.iter().all(|w| !w.contains('\u{2014}')));
}

#[test]
fn test_affordable_loan_round_trips_through_annuity() {
    let input = AffordabilityInput {
        monthly_income: dec!(12500),
        monthly_expenses: dec!(4200),
        existing_debt_payments: dec!(650),
        target_debt_to_income_ratio: dec!(35),
    };
    for mode in [FinancingMode::Conventional, FinancingMode::Islamic] {
        let t = terms(mode);
        let out = affordability::compute_affordability(&input, &t).unwrap();
        let r = monthly_rate(t.rate, t.financing_mode);
        let payment =
            annuity_payment(out.result.affordable_loan_amount, r, t.loan_term_years * 12).unwrap();
        assert!(
            (payment - out.result.affordable_monthly_payment).abs() < dec!(0.0001),
            "payment {} vs {}",
            payment,
            out.result.affordable_monthly_payment
        );
    }
}

#[test]
fn test_higher_dti_scenarios_afford_more() {
    let input = AffordabilityInput {
        monthly_income: dec!(9000),
        monthly_expenses: dec!(1500),
        existing_debt_payments: dec!(300),
        target_debt_to_income_ratio: dec!(40),
    };
    let out = affordability::compute_affordability(&input, &terms(FinancingMode::Conventional))
        .unwrap();
    let s = &out.result.scenarios;
    assert!(s[0].loan_amount < s[1].loan_amount);
    assert!(s[1].loan_amount < s[2].loan_amount);
    // DTI 40 matches the target
    assert_eq!(s[0].loan_amount, out.result.affordable_loan_amount);
}
