use rust_decimal::Decimal;

use crate::error::BizCalcError;
use crate::format::{format_currency, format_percent};
use crate::roi::projection::CashFlowYear;
use crate::types::Currency;
use crate::BizCalcResult;

/// Column order of the cash-flow export.
pub const CSV_HEADERS: [&str; 9] = [
    "Year",
    "Investment",
    "Revenue Gain",
    "Cost Savings",
    "Maintenance Cost",
    "Intangible Benefits",
    "Net Cash Flow",
    "Cumulative Cash Flow",
    "ROI",
];

/// Render cash flows as display rows matching [`CSV_HEADERS`].
///
/// Money and ROI columns are plain two-decimal numbers, or grouped and
/// currency-formatted when a currency is given. The ROI cell is `0` for the
/// investment year.
pub fn cash_flow_rows(flows: &[CashFlowYear], currency: Option<&Currency>) -> Vec<Vec<String>> {
    let money = |value: Decimal| match currency {
        Some(c) => format_currency(value, c, 2),
        None => value.round_dp(2).to_string(),
    };

    flows
        .iter()
        .map(|f| {
            let roi = if f.year == 0 {
                "0".to_string()
            } else if currency.is_some() {
                format_percent(f.yearly_roi_percent, 2)
            } else {
                format!("{}%", f.yearly_roi_percent.round_dp(2))
            };
            vec![
                f.year.to_string(),
                money(f.investment),
                money(f.revenue_gain),
                money(f.cost_savings),
                money(f.maintenance_cost),
                money(f.intangible_benefit),
                money(f.net_cash_flow),
                money(f.cumulative_cash_flow),
                roi,
            ]
        })
        .collect()
}

/// Serialise the projection to CSV, one row per year, header first.
pub fn cash_flows_to_csv(flows: &[CashFlowYear]) -> BizCalcResult<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());

    wtr.write_record(CSV_HEADERS)
        .map_err(|e| BizCalcError::SerializationError(e.to_string()))?;
    for row in cash_flow_rows(flows, None) {
        wtr.write_record(&row)
            .map_err(|e| BizCalcError::SerializationError(e.to_string()))?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| BizCalcError::SerializationError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| BizCalcError::SerializationError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row(year: u32, net: Decimal, cum: Decimal, roi: Decimal) -> CashFlowYear {
        CashFlowYear {
            year,
            investment: if year == 0 { dec!(1000) } else { Decimal::ZERO },
            maintenance_cost: if year == 0 { Decimal::ZERO } else { dec!(100) },
            implementation_factor: Decimal::ONE,
            revenue_gain: Decimal::ZERO,
            cost_savings: Decimal::ZERO,
            intangible_benefit: Decimal::ZERO,
            net_cash_flow: net,
            cumulative_cash_flow: cum,
            yearly_roi_percent: roi,
            discounted_cash_flow: net,
        }
    }

    #[test]
    fn test_csv_header_and_roi_column() {
        let flows = vec![
            row(0, dec!(-1000), dec!(-1000), Decimal::ZERO),
            row(1, dec!(1250), dec!(250), dec!(125)),
        ];
        let csv = cash_flows_to_csv(&flows).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "Year,Investment,Revenue Gain,Cost Savings,Maintenance Cost,Intangible Benefits,Net Cash Flow,Cumulative Cash Flow,ROI"
        );
        assert!(lines[1].starts_with("0,1000,"));
        assert!(lines[1].ends_with(",0"));
        assert!(lines[2].ends_with(",125%"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_currency_rows() {
        let flows = vec![
            row(0, dec!(-1000), dec!(-1000), Decimal::ZERO),
            row(1, dec!(12500), dec!(11500), dec!(1250)),
        ];
        let rows = cash_flow_rows(&flows, Some(&Currency::USD));
        assert_eq!(rows[0][1], "$1,000.00");
        assert_eq!(rows[0][6], "-$1,000.00");
        assert_eq!(rows[0][8], "0");
        assert_eq!(rows[1][8], "1,250.00%");
    }
}
