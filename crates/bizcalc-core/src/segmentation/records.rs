use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::BizCalcError;
use crate::types::Money;
use crate::BizCalcResult;

/// Average month length used to turn a day span into months.
const DAYS_PER_MONTH: Decimal = dec!(30);

// ---------------------------------------------------------------------------
// Imported records
// ---------------------------------------------------------------------------
//
// Dates stay as the raw strings found in the imported CSV/JSON and are parsed
// during analysis, so a malformed export degrades the analysis instead of
// failing the import.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub age: u32,
    /// `YYYY-MM-DD` or an RFC 3339 timestamp
    pub join_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLog {
    pub user_id: String,
    pub timestamp: String,
    pub session_minutes: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Completed,
    Pending,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub user_id: String,
    pub date: String,
    pub amount: Money,
    pub status: TransactionStatus,
}

/// Everything one segmentation run looks at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationInput {
    /// Reference date for "days since join" and recency checks
    pub as_of: NaiveDate,
    pub profiles: Vec<UserProfile>,
    #[serde(default)]
    pub activity_logs: Vec<ActivityLog>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

// ---------------------------------------------------------------------------
// Per-user aggregates
// ---------------------------------------------------------------------------

/// Behavioural aggregates the rule cascade classifies on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMetrics {
    pub user_id: String,
    pub days_since_join: i64,
    pub avg_order_value: Money,
    /// Completed purchases per month between first and last purchase
    pub purchase_frequency: Decimal,
    pub avg_session_minutes: Decimal,
    pub session_count: usize,
    pub completed_purchases: usize,
    /// Days since the most recent activity, if any
    pub days_since_last_activity: Option<i64>,
}

/// Parse a record date. Accepts `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS` and
/// RFC 3339 timestamps.
pub fn parse_date(raw: &str) -> BizCalcResult<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt.date());
    }
    Err(BizCalcError::DateError(format!("unrecognised date '{raw}'")))
}

/// Build per-user aggregates for every profile.
///
/// Fails on the first malformed or future-dated record; callers treat that
/// as a signal to fall back to coarse segmentation.
pub fn build_user_metrics(input: &SegmentationInput) -> BizCalcResult<Vec<UserMetrics>> {
    let mut logs_by_user: HashMap<&str, Vec<&ActivityLog>> = HashMap::new();
    for log in &input.activity_logs {
        logs_by_user.entry(log.user_id.as_str()).or_default().push(log);
    }

    let mut txns_by_user: HashMap<&str, Vec<&Transaction>> = HashMap::new();
    for txn in &input.transactions {
        txns_by_user.entry(txn.user_id.as_str()).or_default().push(txn);
    }

    input
        .profiles
        .iter()
        .map(|profile| {
            let logs = logs_by_user
                .get(profile.user_id.as_str())
                .map(Vec::as_slice)
                .unwrap_or_default();
            let txns = txns_by_user
                .get(profile.user_id.as_str())
                .map(Vec::as_slice)
                .unwrap_or_default();
            user_metrics(input.as_of, profile, logs, txns)
        })
        .collect()
}

fn user_metrics(
    as_of: NaiveDate,
    profile: &UserProfile,
    logs: &[&ActivityLog],
    txns: &[&Transaction],
) -> BizCalcResult<UserMetrics> {
    let joined = parse_date(&profile.join_date)?;
    let days_since_join = (as_of - joined).num_days();
    if days_since_join < 0 {
        return Err(BizCalcError::DateError(format!(
            "user {} joined on {joined}, after the analysis date {as_of}",
            profile.user_id
        )));
    }

    // Purchases
    let mut completed: Vec<(NaiveDate, Money)> = Vec::new();
    for txn in txns {
        let date = parse_date(&txn.date)?;
        if txn.status == TransactionStatus::Completed {
            completed.push((date, txn.amount));
        }
    }

    let (avg_order_value, purchase_frequency) = if completed.is_empty() {
        (Decimal::ZERO, Decimal::ZERO)
    } else {
        let count = Decimal::from(completed.len() as u64);
        let total: Money = completed.iter().map(|(_, amount)| *amount).sum();
        let first = completed.iter().map(|(d, _)| *d).min().unwrap_or(as_of);
        let last = completed.iter().map(|(d, _)| *d).max().unwrap_or(as_of);
        let span_months = (Decimal::from((last - first).num_days()) / DAYS_PER_MONTH).max(Decimal::ONE);
        (total / count, count / span_months)
    };

    // Sessions
    let mut last_active: Option<NaiveDate> = None;
    let mut session_total = Decimal::ZERO;
    for log in logs {
        let date = parse_date(&log.timestamp)?;
        last_active = Some(last_active.map_or(date, |d| d.max(date)));
        session_total += log.session_minutes;
    }
    let avg_session_minutes = if logs.is_empty() {
        Decimal::ZERO
    } else {
        session_total / Decimal::from(logs.len() as u64)
    };

    Ok(UserMetrics {
        user_id: profile.user_id.clone(),
        days_since_join,
        avg_order_value,
        purchase_frequency,
        avg_session_minutes,
        session_count: logs.len(),
        completed_purchases: completed.len(),
        days_since_last_activity: last_active.map(|d| (as_of - d).num_days()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    fn txn(user: &str, date: &str, amount: Decimal, status: TransactionStatus) -> Transaction {
        Transaction {
            user_id: user.into(),
            date: date.into(),
            amount,
            status,
        }
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(parse_date("2024-03-15").unwrap(), expected);
        assert_eq!(parse_date("2024-03-15T10:30:00Z").unwrap(), expected);
        assert_eq!(parse_date("2024-03-15T10:30:00").unwrap(), expected);
        assert!(parse_date("15/03/2024").is_err());
    }

    #[test]
    fn test_frequency_over_purchase_span() {
        let input = SegmentationInput {
            as_of: as_of(),
            profiles: vec![UserProfile {
                user_id: "u1".into(),
                age: 35,
                join_date: "2023-01-01".into(),
                location: None,
            }],
            activity_logs: vec![],
            transactions: vec![
                txn("u1", "2024-01-01", dec!(100), TransactionStatus::Completed),
                txn("u1", "2024-01-31", dec!(300), TransactionStatus::Completed),
                txn("u1", "2024-03-01", dec!(200), TransactionStatus::Completed),
                txn("u1", "2024-03-02", dec!(999), TransactionStatus::Refunded),
            ],
        };
        let metrics = build_user_metrics(&input).unwrap();
        let m = &metrics[0];
        assert_eq!(m.completed_purchases, 3);
        assert_eq!(m.avg_order_value, dec!(200));
        // 60 day span => 2 months => 1.5 purchases per month
        assert_eq!(m.purchase_frequency, dec!(1.5));
    }

    #[test]
    fn test_single_purchase_uses_one_month_floor() {
        let input = SegmentationInput {
            as_of: as_of(),
            profiles: vec![UserProfile {
                user_id: "u1".into(),
                age: 35,
                join_date: "2023-01-01".into(),
                location: None,
            }],
            activity_logs: vec![ActivityLog {
                user_id: "u1".into(),
                timestamp: "2024-06-20".into(),
                session_minutes: dec!(12),
                action: None,
            }],
            transactions: vec![txn("u1", "2024-01-01", dec!(80), TransactionStatus::Completed)],
        };
        let m = &build_user_metrics(&input).unwrap()[0];
        assert_eq!(m.purchase_frequency, Decimal::ONE);
        assert_eq!(m.avg_session_minutes, dec!(12));
        assert_eq!(m.days_since_last_activity, Some(10));
    }

    #[test]
    fn test_malformed_transaction_date_fails() {
        let input = SegmentationInput {
            as_of: as_of(),
            profiles: vec![UserProfile {
                user_id: "u1".into(),
                age: 35,
                join_date: "2023-01-01".into(),
                location: None,
            }],
            activity_logs: vec![],
            transactions: vec![txn("u1", "yesterday", dec!(10), TransactionStatus::Completed)],
        };
        assert!(matches!(
            build_user_metrics(&input),
            Err(BizCalcError::DateError(_))
        ));
    }
}
