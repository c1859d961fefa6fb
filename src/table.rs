use crate::record::Record;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Grouping key of the aggregate table.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AggregateKey {
    pub date: NaiveDate,
    pub ps_id: i64,
    pub country: String,
    pub card_brand: String,
    pub payment_method: String,
    pub gender: String,
}

/// One group of click records with its summed measures.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct AggregateRow {
    pub date: NaiveDate,
    pub ps_id: i64,
    pub country: String,
    pub card_brand: String,
    pub payment_method: String,
    pub gender: String,
    pub clicks: u64,
    pub conversions: u64,
    pub paid_amount: f64,
    pub revenue: f64,
}

#[derive(Default)]
struct Measures {
    clicks: u64,
    conversions: u64,
    paid_amount: f64,
    revenue: f64,
}

/// The grouped summary every view is computed from.
///
/// Built once from the raw records and shared read-only afterwards.
/// Callers must not rely on row order.
#[derive(Clone, Debug, Default)]
pub struct AggregateTable {
    rows: Vec<AggregateRow>,
    record_count: usize,
}

impl AggregateTable {
    /// Group `records` by (date, ps_id, country, card_brand, payment_method,
    /// gender), counting clicks and conversions and summing amounts.
    pub fn aggregate(records: &[Record]) -> Self {
        let mut groups: BTreeMap<AggregateKey, Measures> = BTreeMap::new();

        for record in records {
            let key = AggregateKey {
                date: record.date,
                ps_id: record.ps_id,
                country: record.country.clone(),
                card_brand: record.card_brand.clone(),
                payment_method: record.payment_method.clone(),
                gender: record.gender.clone(),
            };
            let m = groups.entry(key).or_default();
            m.clicks += 1;
            if record.is_conversion {
                m.conversions += 1;
            }
            m.paid_amount += record.paid_amount;
            m.revenue += record.revenue;
        }

        let rows = groups
            .into_iter()
            .map(|(key, m)| AggregateRow {
                date: key.date,
                ps_id: key.ps_id,
                country: key.country,
                card_brand: key.card_brand,
                payment_method: key.payment_method,
                gender: key.gender,
                clicks: m.clicks,
                conversions: m.conversions,
                paid_amount: m.paid_amount,
                revenue: m.revenue,
            })
            .collect();

        AggregateTable {
            rows,
            record_count: records.len(),
        }
    }

    /// Wrap rows that are already aggregated. The record count is taken to
    /// be the total number of clicks.
    pub fn from_rows(rows: Vec<AggregateRow>) -> Self {
        let record_count = rows.iter().map(|r| r.clicks as usize).sum();
        AggregateTable { rows, record_count }
    }

    pub fn rows(&self) -> &[AggregateRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of raw records the table was built from.
    pub fn record_count(&self) -> usize {
        self.record_count
    }
}

impl AggregateRow {
    pub fn key(&self) -> AggregateKey {
        AggregateKey {
            date: self.date,
            ps_id: self.ps_id,
            country: self.country.clone(),
            card_brand: self.card_brand.clone(),
            payment_method: self.payment_method.clone(),
            gender: self.gender.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn record(date: &str, ps_id: i64, brand: &str, conv: bool, pv: f64, rev: f64) -> Record {
        Record {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            ps_id,
            country: "US".to_string(),
            card_brand: brand.to_string(),
            payment_method: "card".to_string(),
            gender: "M".to_string(),
            click_id: format!("{}-{}", date, ps_id),
            is_conversion: conv,
            paid_amount: pv,
            revenue: rev,
        }
    }

    #[test]
    fn test_aggregate_groups_by_full_key() {
        let records = vec![
            record("2021-01-01", 1, "Visa", true, 10.0, 1.0),
            record("2021-01-01", 1, "Visa", false, 5.0, 0.5),
            record("2021-01-01", 1, "Master", true, 2.0, 0.25),
            record("2021-01-02", 1, "Visa", true, 1.0, 0.125),
        ];
        let table = AggregateTable::aggregate(&records);
        assert_eq!(table.len(), 3);
        assert_eq!(table.record_count(), 4);

        let visa = table
            .rows()
            .iter()
            .find(|r| r.card_brand == "Visa" && r.date.to_string() == "2021-01-01")
            .unwrap();
        assert_eq!(visa.clicks, 2);
        assert_eq!(visa.conversions, 1);
        assert_eq!(visa.paid_amount, 15.0);
        assert_eq!(visa.revenue, 1.5);
    }

    #[test]
    fn test_clicks_sum_to_record_count_and_keys_unique() {
        let mut records = Vec::new();
        for i in 0..50 {
            let day = format!("2021-01-{:02}", 1 + i % 5);
            let brand = if i % 3 == 0 { "Visa" } else { "Amex" };
            records.push(record(&day, i % 4, brand, i % 2 == 0, 1.0, 1.0));
        }
        let table = AggregateTable::aggregate(&records);

        let total: u64 = table.rows().iter().map(|r| r.clicks).sum();
        assert_eq!(total as usize, records.len());

        let keys: HashSet<AggregateKey> = table.rows().iter().map(|r| r.key()).collect();
        assert_eq!(keys.len(), table.len());
    }

    #[test]
    fn test_aggregate_empty() {
        let table = AggregateTable::aggregate(&[]);
        assert!(table.is_empty());
        assert_eq!(table.record_count(), 0);
    }
}
