use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use crate::segmentation::records::{build_user_metrics, SegmentationInput, UserMetrics};
use crate::segmentation::rules::{classify, SegmentId};
use crate::types::{with_metadata, ComputationOutput, Money, Percent};

/// Months of purchasing projected into a cohort's total value.
const VALUE_PROJECTION_MONTHS: Decimal = dec!(3);

/// Activity within this many days counts as retained.
const RETENTION_WINDOW_DAYS: i64 = 30;

/// Joins within this many days count towards cohort growth.
const GROWTH_WINDOW_DAYS: i64 = 90;

/// Sizes used when there is nothing to analyse, canonical order.
const DEFAULT_SIZES: [i64; 5] = [15, 30, 25, 10, 20];

/// Allowed size range per cohort in the age fallback, canonical order.
const FALLBACK_SIZE_RANGES: [(i64, i64); 5] = [(5, 30), (15, 45), (10, 40), (5, 25), (5, 30)];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationMode {
    /// Users classified from their own purchases and sessions
    Behavioral,
    /// Coarse split by age band after the behavioural pass failed
    AgeFallback,
}

/// Aggregate statistics for one cohort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    pub name: String,
    pub user_count: u32,
    /// Share of the population in percent; the five sizes sum to 100
    pub size: u32,
    /// Projected three-month purchase value
    pub total_value: Money,
    pub conversion_rate: Percent,
    pub engagement_score: Decimal,
    pub retention_rate: Percent,
    pub avg_session_time: Decimal,
    pub avg_order_value: Money,
    pub purchase_frequency: Decimal,
    pub growth_rate: Percent,
    pub churn_risk: Percent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationOutput {
    pub mode: SegmentationMode,
    pub total_users: u32,
    pub total_value: Money,
    pub segments: Vec<Segment>,
}

/// Metric set reported for a cohort with no members to average over.
#[derive(Debug, Clone, Copy)]
struct CohortMetrics {
    conversion_rate: Decimal,
    engagement_score: Decimal,
    retention_rate: Decimal,
    avg_session_time: Decimal,
    avg_order_value: Decimal,
    purchase_frequency: Decimal,
    growth_rate: Decimal,
    churn_risk: Decimal,
}

fn default_metrics(id: SegmentId) -> CohortMetrics {
    let (conversion_rate, engagement_score, retention_rate, avg_session_time) = match id {
        SegmentId::HighValue => (dec!(12.5), dec!(85), dec!(92), dec!(18.5)),
        SegmentId::Regular => (dec!(6.8), dec!(72), dec!(78), dec!(12.3)),
        SegmentId::Occasional => (dec!(3.2), dec!(45), dec!(55), dec!(7.8)),
        SegmentId::AtRisk => (dec!(1.5), dec!(25), dec!(30), dec!(3.2)),
        SegmentId::NewUsers => (dec!(4.5), dec!(60), dec!(65), dec!(9.5)),
    };
    let (avg_order_value, purchase_frequency, growth_rate) = match id {
        SegmentId::HighValue => (dec!(285), dec!(3.2), dec!(8.5)),
        SegmentId::Regular => (dec!(145), dec!(1.8), dec!(5.2)),
        SegmentId::Occasional => (dec!(85), dec!(0.6), dec!(2.1)),
        SegmentId::AtRisk => (dec!(65), dec!(0.3), dec!(-5.5)),
        SegmentId::NewUsers => (dec!(95), dec!(0.8), dec!(25)),
    };
    CohortMetrics {
        conversion_rate,
        engagement_score,
        retention_rate,
        avg_session_time,
        avg_order_value,
        purchase_frequency,
        growth_rate,
        churn_risk: dec!(100) - retention_rate,
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Bucket users into the five cohorts and aggregate per-cohort statistics.
///
/// Never fails: an empty population or a record that cannot be analysed
/// switches to the age-band fallback, recorded in `mode` and the warnings.
pub fn segment_users(input: &SegmentationInput) -> ComputationOutput<SegmentationOutput> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let output = if input.profiles.is_empty() {
        warn!("no user profiles supplied, using default segmentation");
        warnings.push("No user profiles supplied; default segment sizes reported".into());
        fallback_segmentation(input)
    } else {
        match build_user_metrics(input) {
            Ok(metrics) => behavioral_segmentation(input, &metrics),
            Err(error) => {
                warn!(%error, "behavioural segmentation failed, falling back to age bands");
                warnings.push(format!(
                    "Behavioural analysis failed ({error}); segments estimated from age bands"
                ));
                fallback_segmentation(input)
            }
        }
    };

    debug!(
        mode = ?output.mode,
        users = output.total_users,
        "segmentation complete"
    );

    let elapsed = start.elapsed().as_micros() as u64;

    with_metadata(
        "Rule-based cohort segmentation",
        &serde_json::json!({
            "as_of": input.as_of,
            "profiles": input.profiles.len(),
            "activity_logs": input.activity_logs.len(),
            "transactions": input.transactions.len(),
        }),
        warnings,
        elapsed,
        output,
    )
}

/// Make rounded sizes sum to exactly 100.
///
/// Rescales proportionally when the sum is off, then books any remaining
/// rounding residual on the first cohort. If that would take the first cohort
/// below zero, the shortfall is taken from the largest cohort instead.
pub fn normalise_sizes(sizes: &mut [i64; 5]) {
    let sum: i64 = sizes.iter().sum();
    if sum <= 0 {
        *sizes = DEFAULT_SIZES;
        return;
    }

    if sum != 100 {
        for size in sizes.iter_mut() {
            *size = round_to_i64(Decimal::from(*size) * dec!(100) / Decimal::from(sum));
        }
    }

    book_residual(sizes, 100);
}

/// Book the rounding residual against `target` on the first cohort. A first
/// cohort too small to absorb a negative residual passes the rest to the
/// largest one.
fn book_residual(values: &mut [i64; 5], target: i64) {
    let residual = target - values.iter().sum::<i64>();
    values[0] += residual;

    if values[0] < 0 {
        let shortfall = -values[0];
        values[0] = 0;
        if let Some(largest) = values.iter_mut().max_by_key(|v| **v) {
            *largest -= shortfall;
        }
    }
}

// ---------------------------------------------------------------------------
// Behavioural segmentation
// ---------------------------------------------------------------------------

fn behavioral_segmentation(input: &SegmentationInput, metrics: &[UserMetrics]) -> SegmentationOutput {
    let mut members: [Vec<&UserMetrics>; 5] = Default::default();
    for m in metrics {
        members[classify(m).index()].push(m);
    }

    let total_users = metrics.len();
    let mut sizes = [0i64; 5];
    for (i, bucket) in members.iter().enumerate() {
        sizes[i] = round_to_i64(
            Decimal::from(bucket.len() as u64) / Decimal::from(total_users as u64) * dec!(100),
        );
    }
    normalise_sizes(&mut sizes);

    let segments: Vec<Segment> = SegmentId::ALL
        .iter()
        .map(|&id| aggregate_bucket(id, &members[id.index()], sizes[id.index()]))
        .collect();

    debug!(as_of = %input.as_of, ?sizes, "behavioural cohorts sized");

    SegmentationOutput {
        mode: SegmentationMode::Behavioral,
        total_users: total_users as u32,
        total_value: segments.iter().map(|s| s.total_value).sum(),
        segments,
    }
}

fn aggregate_bucket(id: SegmentId, bucket: &[&UserMetrics], size: i64) -> Segment {
    let total_value: Money = bucket
        .iter()
        .map(|m| m.avg_order_value * m.purchase_frequency * VALUE_PROJECTION_MONTHS)
        .sum();

    let metrics = if bucket.is_empty() {
        default_metrics(id)
    } else {
        let n = Decimal::from(bucket.len() as u64);
        let mean = |f: fn(&UserMetrics) -> Decimal| bucket.iter().map(|m| f(m)).sum::<Decimal>() / n;
        let share = |f: fn(&UserMetrics) -> bool| {
            Decimal::from(bucket.iter().filter(|m| f(m)).count() as u64) / n * dec!(100)
        };

        let retention_rate = share(|m| {
            m.days_since_last_activity
                .is_some_and(|d| d <= RETENTION_WINDOW_DAYS)
        });

        CohortMetrics {
            conversion_rate: share(|m| m.completed_purchases > 0),
            engagement_score: mean(engagement_score),
            retention_rate,
            avg_session_time: mean(|m| m.avg_session_minutes),
            avg_order_value: mean(|m| m.avg_order_value),
            purchase_frequency: mean(|m| m.purchase_frequency),
            growth_rate: share(|m| m.days_since_join <= GROWTH_WINDOW_DAYS),
            churn_risk: dec!(100) - retention_rate,
        }
    };

    build_segment(id, bucket.len() as u32, size, total_value, metrics)
}

/// Per-user engagement on a 0-100 scale: two points per average session
/// minute plus one per recorded session.
fn engagement_score(m: &UserMetrics) -> Decimal {
    (m.avg_session_minutes * dec!(2) + Decimal::from(m.session_count as u64)).min(dec!(100))
}

// ---------------------------------------------------------------------------
// Age-band fallback
// ---------------------------------------------------------------------------

fn fallback_segmentation(input: &SegmentationInput) -> SegmentationOutput {
    let total_users = input.profiles.len();

    let mut sizes = if total_users == 0 {
        DEFAULT_SIZES
    } else {
        let count = |pred: fn(u32) -> bool| {
            Decimal::from(input.profiles.iter().filter(|p| pred(p.age)).count() as u64)
                / Decimal::from(total_users as u64)
                * dec!(100)
        };
        let young = count(|age| age < 30);
        let middle = count(|age| (30..50).contains(&age));
        let senior = count(|age| age >= 50);

        // Canonical order: high-value, regular, occasional, at-risk, new-users
        let raw = [
            middle * dec!(0.4),
            middle * dec!(0.6) + senior * dec!(0.2),
            young * dec!(0.5) + senior * dec!(0.3),
            senior * dec!(0.5),
            young * dec!(0.5),
        ];

        let mut sizes = [0i64; 5];
        for (i, value) in raw.iter().enumerate() {
            let (lo, hi) = FALLBACK_SIZE_RANGES[i];
            sizes[i] = round_to_i64(*value).clamp(lo, hi);
        }
        sizes
    };
    normalise_sizes(&mut sizes);

    let mut user_counts = [0i64; 5];
    for (count, size) in user_counts.iter_mut().zip(sizes) {
        *count = round_to_i64(Decimal::from(size) * Decimal::from(total_users as u64) / dec!(100));
    }
    book_residual(&mut user_counts, total_users as i64);

    let segments: Vec<Segment> = SegmentId::ALL
        .iter()
        .map(|&id| {
            let size = sizes[id.index()];
            let user_count = user_counts[id.index()];
            let metrics = default_metrics(id);
            let total_value = metrics.avg_order_value
                * metrics.purchase_frequency
                * VALUE_PROJECTION_MONTHS
                * Decimal::from(user_count);
            build_segment(id, user_count.max(0) as u32, size, total_value, metrics)
        })
        .collect();

    SegmentationOutput {
        mode: SegmentationMode::AgeFallback,
        total_users: total_users as u32,
        total_value: segments.iter().map(|s| s.total_value).sum(),
        segments,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn build_segment(
    id: SegmentId,
    user_count: u32,
    size: i64,
    total_value: Money,
    m: CohortMetrics,
) -> Segment {
    Segment {
        id,
        name: id.display_name().to_string(),
        user_count,
        size: u32::try_from(size).unwrap_or(0),
        total_value,
        conversion_rate: m.conversion_rate,
        engagement_score: m.engagement_score,
        retention_rate: m.retention_rate,
        avg_session_time: m.avg_session_time,
        avg_order_value: m.avg_order_value,
        purchase_frequency: m.purchase_frequency,
        growth_rate: m.growth_rate,
        churn_risk: m.churn_risk,
    }
}

fn round_to_i64(value: Decimal) -> i64 {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0)
}
