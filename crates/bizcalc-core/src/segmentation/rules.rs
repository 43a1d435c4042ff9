use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::segmentation::records::UserMetrics;

/// The five cohorts, in canonical output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SegmentId {
    HighValue,
    Regular,
    Occasional,
    AtRisk,
    NewUsers,
}

impl SegmentId {
    pub const ALL: [SegmentId; 5] = [
        SegmentId::HighValue,
        SegmentId::Regular,
        SegmentId::Occasional,
        SegmentId::AtRisk,
        SegmentId::NewUsers,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            SegmentId::HighValue => "high-value",
            SegmentId::Regular => "regular",
            SegmentId::Occasional => "occasional",
            SegmentId::AtRisk => "at-risk",
            SegmentId::NewUsers => "new-users",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            SegmentId::HighValue => "High-Value Customers",
            SegmentId::Regular => "Regular Customers",
            SegmentId::Occasional => "Occasional Buyers",
            SegmentId::AtRisk => "At-Risk Users",
            SegmentId::NewUsers => "New Users",
        }
    }

    /// Position in [`SegmentId::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

/// One step of the classification cascade.
pub struct SegmentRule {
    pub segment: SegmentId,
    pub description: &'static str,
    pub matches: fn(&UserMetrics) -> bool,
}

fn is_new(m: &UserMetrics) -> bool {
    m.days_since_join <= 30
}

fn is_high_value(m: &UserMetrics) -> bool {
    m.avg_order_value >= dec!(200) && m.purchase_frequency >= dec!(2)
}

fn is_regular(m: &UserMetrics) -> bool {
    m.avg_order_value >= dec!(100) && m.purchase_frequency >= dec!(1)
}

fn is_at_risk(m: &UserMetrics) -> bool {
    m.avg_session_minutes < dec!(5) && m.purchase_frequency < dec!(1) && m.days_since_join > 90
}

fn always(_: &UserMetrics) -> bool {
    true
}

/// Evaluated top to bottom; the first matching rule assigns the cohort.
pub const RULES: [SegmentRule; 5] = [
    SegmentRule {
        segment: SegmentId::NewUsers,
        description: "joined within the last 30 days",
        matches: is_new,
    },
    SegmentRule {
        segment: SegmentId::HighValue,
        description: "average order >= 200 and at least 2 purchases a month",
        matches: is_high_value,
    },
    SegmentRule {
        segment: SegmentId::Regular,
        description: "average order >= 100 and at least 1 purchase a month",
        matches: is_regular,
    },
    SegmentRule {
        segment: SegmentId::AtRisk,
        description: "short sessions, rare purchases, member for over 90 days",
        matches: is_at_risk,
    },
    SegmentRule {
        segment: SegmentId::Occasional,
        description: "everyone else",
        matches: always,
    },
];

/// Assign a user to exactly one cohort.
pub fn classify(metrics: &UserMetrics) -> SegmentId {
    RULES
        .iter()
        .find(|rule| (rule.matches)(metrics))
        .map(|rule| rule.segment)
        .unwrap_or(SegmentId::Occasional)
}
