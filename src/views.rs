//! Views computed from a filtered slice of the aggregate table.
//!
//! Every builder is a pure function of its input rows. Nothing is cached:
//! the HTTP layer calls [`render`] on each request.

use crate::filter::{FilterSpec, filter};
use crate::table::{AggregateRow, AggregateTable};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The four headline numbers.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct Kpis {
    pub clicks: u64,
    pub conversions: u64,
    /// Rounded to cents
    pub paid_amount: f64,
    /// Rounded to cents
    pub revenue: f64,
}

/// Clicks on one day.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct DatePoint {
    pub date: NaiveDate,
    pub clicks: u64,
}

/// One slice of a share breakdown.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct CategoryShare {
    pub label: String,
    pub value: f64,
    /// Fraction of the breakdown total, 0 when the total is 0
    pub share: f64,
}

/// One bar of a sum breakdown.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct CategorySum {
    pub label: String,
    pub value: f64,
}

/// Which chart pair fills the two lower slots.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChartMode {
    #[default]
    Pie,
    Bar,
}

/// Content of the two switchable chart slots.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ChartPair {
    Pie {
        card_brand: Vec<CategoryShare>,
        payment_method: Vec<CategoryShare>,
    },
    Bar {
        revenue_by_date: Vec<CategorySum>,
        clicks_by_gender: Vec<CategorySum>,
    },
}

/// Everything the page displays for one filter selection.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Dashboard {
    pub kpis: Kpis,
    pub clicks_by_date: Vec<DatePoint>,
    pub charts: ChartPair,
}

/// Categorical dimensions a breakdown can group by.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dimension {
    Date,
    CardBrand,
    PaymentMethod,
    Gender,
}

/// Measures a breakdown can sum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Measure {
    Clicks,
    PaidAmount,
    Revenue,
}

impl Dimension {
    fn label(self, row: &AggregateRow) -> String {
        match self {
            Dimension::Date => row.date.format("%Y-%m-%d").to_string(),
            Dimension::CardBrand => row.card_brand.clone(),
            Dimension::PaymentMethod => row.payment_method.clone(),
            Dimension::Gender => row.gender.clone(),
        }
    }
}

impl Measure {
    fn value(self, row: &AggregateRow) -> f64 {
        match self {
            Measure::Clicks => row.clicks as f64,
            Measure::PaidAmount => row.paid_amount,
            Measure::Revenue => row.revenue,
        }
    }
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Sum the four measures over `rows`.
pub fn kpis(rows: &[&AggregateRow]) -> Kpis {
    let mut k = Kpis::default();
    let mut paid = 0.0;
    let mut revenue = 0.0;
    for row in rows {
        k.clicks += row.clicks;
        k.conversions += row.conversions;
        paid += row.paid_amount;
        revenue += row.revenue;
    }
    k.paid_amount = round2(paid);
    k.revenue = round2(revenue);
    k
}

/// Clicks per day, ascending by date.
///
/// The returned iterator is finite; call again for a fresh pass.
pub fn clicks_by_date(rows: &[&AggregateRow]) -> impl Iterator<Item = DatePoint> {
    let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for row in rows {
        *per_day.entry(row.date).or_insert(0) += row.clicks;
    }
    per_day
        .into_iter()
        .map(|(date, clicks)| DatePoint { date, clicks })
}

/// Sum `measure` per value of `dimension`, ordered by label.
/// Labels with no rows never appear.
pub fn sum_by(rows: &[&AggregateRow], dimension: Dimension, measure: Measure) -> Vec<CategorySum> {
    let mut groups: BTreeMap<String, f64> = BTreeMap::new();
    for row in rows {
        *groups.entry(dimension.label(row)).or_insert(0.0) += measure.value(row);
    }
    groups
        .into_iter()
        .map(|(label, value)| CategorySum { label, value })
        .collect()
}

/// Paid amount per value of `dimension` together with each value's share.
pub fn share_by(rows: &[&AggregateRow], dimension: Dimension) -> Vec<CategoryShare> {
    let sums = sum_by(rows, dimension, Measure::PaidAmount);
    let total: f64 = sums.iter().map(|s| s.value).sum();
    sums.into_iter()
        .map(|s| CategoryShare {
            share: if total != 0.0 { s.value / total } else { 0.0 },
            label: s.label,
            value: s.value,
        })
        .collect()
}

/// Build the chart pair for `mode` from already filtered rows.
pub fn chart_pair(rows: &[&AggregateRow], mode: ChartMode) -> ChartPair {
    match mode {
        ChartMode::Pie => ChartPair::Pie {
            card_brand: share_by(rows, Dimension::CardBrand),
            payment_method: share_by(rows, Dimension::PaymentMethod),
        },
        ChartMode::Bar => ChartPair::Bar {
            revenue_by_date: sum_by(rows, Dimension::Date, Measure::Revenue),
            clicks_by_gender: sum_by(rows, Dimension::Gender, Measure::Clicks),
        },
    }
}

/// Filter `table` with `spec` and compute every view the page shows.
pub fn render(table: &AggregateTable, spec: &FilterSpec, mode: ChartMode) -> Dashboard {
    let rows = filter(table.rows(), spec);
    Dashboard {
        kpis: kpis(&rows),
        clicks_by_date: clicks_by_date(&rows).collect(),
        charts: chart_pair(&rows, mode),
    }
}
