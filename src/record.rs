use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One click event exactly as it was imported.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Record {
    pub date: NaiveDate,
    pub ps_id: i64,
    pub country: String,
    pub card_brand: String,
    pub payment_method: String,
    pub gender: String,
    pub click_id: String,
    pub is_conversion: bool,
    pub paid_amount: f64,
    pub revenue: f64,
}

/// The imported record set. Built once by the loader and never mutated.
#[derive(Clone, Debug, Default)]
pub struct RawStore {
    records: Vec<Record>,
}

/// Values offered by the dashboard controls and their initial selection.
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct DashboardOptions {
    /// Distinct PS IDs in order of first appearance
    pub ps_ids: Vec<i64>,
    /// Distinct countries in order of first appearance
    pub countries: Vec<String>,
    pub min_date: NaiveDate,
    pub max_date: NaiveDate,
    pub default_ps_id: i64,
    pub default_country: String,
}

impl RawStore {
    pub fn new(records: Vec<Record>) -> Self {
        RawStore { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Derive the control options. `None` for an empty store.
    ///
    /// The default PS ID is the largest one and the default country is the
    /// country of the first record, so the initial page shows a single
    /// partner in a single market.
    pub fn options(&self) -> Option<DashboardOptions> {
        let first = self.records.first()?;

        let mut seen_ps = HashSet::new();
        let mut seen_co = HashSet::new();
        let mut ps_ids = Vec::new();
        let mut countries = Vec::new();
        let mut min_date = first.date;
        let mut max_date = first.date;

        for record in &self.records {
            if seen_ps.insert(record.ps_id) {
                ps_ids.push(record.ps_id);
            }
            if seen_co.insert(record.country.as_str()) {
                countries.push(record.country.clone());
            }
            min_date = min_date.min(record.date);
            max_date = max_date.max(record.date);
        }

        let default_ps_id = ps_ids.iter().copied().max().unwrap_or(first.ps_id);

        Some(DashboardOptions {
            ps_ids,
            countries,
            min_date,
            max_date,
            default_ps_id,
            default_country: first.country.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: &str, ps_id: i64, country: &str) -> Record {
        Record {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            ps_id,
            country: country.to_string(),
            card_brand: "Visa".to_string(),
            payment_method: "card".to_string(),
            gender: "F".to_string(),
            click_id: "c".to_string(),
            is_conversion: false,
            paid_amount: 0.0,
            revenue: 0.0,
        }
    }

    #[test]
    fn test_options_empty_store() {
        assert!(RawStore::default().options().is_none());
    }

    #[test]
    fn test_options_keep_first_appearance_order() {
        let store = RawStore::new(vec![
            record("2021-02-01", 7, "DE"),
            record("2021-01-15", 3, "US"),
            record("2021-03-01", 7, "FR"),
            record("2021-01-20", 12, "US"),
        ]);
        let opts = store.options().unwrap();
        assert_eq!(opts.ps_ids, vec![7, 3, 12]);
        assert_eq!(opts.countries, vec!["DE", "US", "FR"]);
        assert_eq!(opts.min_date.to_string(), "2021-01-15");
        assert_eq!(opts.max_date.to_string(), "2021-03-01");
        assert_eq!(opts.default_ps_id, 12);
        assert_eq!(opts.default_country, "DE");
    }
}
