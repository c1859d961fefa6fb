use crate::record::DashboardOptions;
use crate::table::AggregateRow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// User-selected constraints applied before any view is computed.
///
/// The date range is half-open: `date_start` is included, `date_end` is not.
/// Empty `ps_ids` or `countries` match nothing.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct FilterSpec {
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    pub ps_ids: BTreeSet<i64>,
    pub countries: BTreeSet<String>,
}

impl FilterSpec {
    pub fn new(
        date_start: NaiveDate,
        date_end: NaiveDate,
        ps_ids: impl IntoIterator<Item = i64>,
        countries: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        FilterSpec {
            date_start,
            date_end,
            ps_ids: ps_ids.into_iter().collect(),
            countries: countries.into_iter().map(Into::into).collect(),
        }
    }

    /// The selection the dashboard opens with.
    pub fn initial(options: &DashboardOptions) -> Self {
        FilterSpec::new(
            options.min_date,
            options.max_date,
            [options.default_ps_id],
            [options.default_country.clone()],
        )
    }

    pub fn matches(&self, row: &AggregateRow) -> bool {
        row.date >= self.date_start
            && row.date < self.date_end
            && self.ps_ids.contains(&row.ps_id)
            && self.countries.contains(&row.country)
    }
}

/// Keep the rows matching every predicate of `spec`.
pub fn filter<'a>(rows: &'a [AggregateRow], spec: &FilterSpec) -> Vec<&'a AggregateRow> {
    if spec.ps_ids.is_empty() || spec.countries.is_empty() || spec.date_start >= spec.date_end {
        return Vec::new();
    }
    rows.iter().filter(|row| spec.matches(row)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn row(d: &str, ps_id: i64, country: &str) -> AggregateRow {
        AggregateRow {
            date: date(d),
            ps_id,
            country: country.to_string(),
            card_brand: "Visa".to_string(),
            payment_method: "card".to_string(),
            gender: "F".to_string(),
            clicks: 1,
            conversions: 0,
            paid_amount: 1.0,
            revenue: 1.0,
        }
    }

    fn sample() -> Vec<AggregateRow> {
        vec![
            row("2021-01-01", 1, "US"),
            row("2021-01-02", 1, "US"),
            row("2021-01-02", 2, "US"),
            row("2021-01-03", 1, "DE"),
        ]
    }

    #[test]
    fn test_end_date_is_exclusive() {
        let rows = sample();
        let spec = FilterSpec::new(date("2021-01-01"), date("2021-01-02"), [1], ["US"]);
        let out = filter(&rows, &spec);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].date, date("2021-01-01"));
    }

    #[test]
    fn test_equal_bounds_yield_nothing() {
        let rows = sample();
        let spec = FilterSpec::new(date("2021-01-02"), date("2021-01-02"), [1, 2], ["US"]);
        assert!(filter(&rows, &spec).is_empty());
    }

    #[test]
    fn test_reversed_bounds_yield_nothing() {
        let rows = sample();
        let spec = FilterSpec::new(date("2021-01-03"), date("2021-01-01"), [1], ["US"]);
        assert!(filter(&rows, &spec).is_empty());
    }

    #[test]
    fn test_empty_sets_match_nothing() {
        let rows = sample();
        let no_ps = FilterSpec::new(
            date("2021-01-01"),
            date("2021-02-01"),
            Vec::<i64>::new(),
            ["US"],
        );
        assert!(filter(&rows, &no_ps).is_empty());

        let no_co = FilterSpec::new(
            date("2021-01-01"),
            date("2021-02-01"),
            [1],
            Vec::<String>::new(),
        );
        assert!(filter(&rows, &no_co).is_empty());
    }

    #[test]
    fn test_set_membership() {
        let rows = sample();
        let spec = FilterSpec::new(date("2021-01-01"), date("2021-02-01"), [1], ["US", "DE"]);
        assert_eq!(filter(&rows, &spec).len(), 3);

        let spec = FilterSpec::new(date("2021-01-01"), date("2021-02-01"), [2], ["US", "DE"]);
        assert_eq!(filter(&rows, &spec).len(), 1);
    }
}
