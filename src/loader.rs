use crate::error::DashboardError;
use crate::record::{RawStore, Record};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Columns the import cannot do without. Any other column is ignored.
pub const REQUIRED_COLUMNS: &[&str] = &[
    "datecl",
    "ps_id",
    "co_name",
    "card_brand",
    "payment_method",
    "gender",
    "cl_id",
    "cl_tracked",
    "pv",
    "revenue",
];

const DATE_FMT: &str = "%Y-%m-%d";

/// Load the click records from a CSV file
///
/// The whole file is parsed up front. A missing column or a single
/// malformed row fails the load, since the dashboard cannot start without
/// a trustworthy aggregate table.
///
/// # Arguments
/// * `filepath` - Path to the CSV file to load
///
/// # Returns
/// * `Result<RawStore, DashboardError>` - The imported records or an error
///
/// # Examples
/// ```no_run
/// use ps_dashboard::loader::load_records;
///
/// match load_records("data/sample_data.csv") {
///     Ok(store) => println!("Loaded {} records", store.len()),
///     Err(e) => eprintln!("Error loading CSV: {}", e),
/// }
/// ```
pub fn load_records(filepath: impl AsRef<Path>) -> Result<RawStore, DashboardError> {
    let file = File::open(filepath)?;
    read_records(BufReader::new(file))
}

/// Parse click records from any CSV source.
pub fn read_records<R: Read>(reader: R) -> Result<RawStore, DashboardError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let columns = ColumnMap::from_headers(&headers)?;

    let mut records = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        // +2: one for the header row, one for 1-based numbering
        let line = idx + 2;
        let row = result?;
        let record = columns
            .parse(&row)
            .map_err(|message| DashboardError::MalformedRow { line, message })?;
        records.push(record);
    }

    if records.is_empty() {
        return Err(DashboardError::EmptyFile);
    }

    Ok(RawStore::new(records))
}

/// Positions of the required columns within a CSV record.
struct ColumnMap {
    indices: HashMap<&'static str, usize>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, DashboardError> {
        let mut by_name = HashMap::new();
        for (i, field) in headers.iter().enumerate() {
            by_name.entry(field.trim().to_string()).or_insert(i);
        }

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| !by_name.contains_key(**c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(DashboardError::MissingColumns(missing));
        }

        let indices = REQUIRED_COLUMNS
            .iter()
            .map(|c| (*c, by_name[*c]))
            .collect();
        Ok(ColumnMap { indices })
    }

    fn get<'a>(&self, row: &'a csv::StringRecord, col: &'static str) -> Result<&'a str, String> {
        self.indices
            .get(col)
            .and_then(|&i| row.get(i))
            .ok_or_else(|| format!("missing value for '{}'", col))
    }

    fn text(&self, row: &csv::StringRecord, col: &'static str) -> Result<String, String> {
        let value = self.get(row, col)?;
        if value.is_empty() {
            return Err(format!("empty value for '{}'", col));
        }
        Ok(value.to_string())
    }

    fn parse(&self, row: &csv::StringRecord) -> Result<Record, String> {
        Ok(Record {
            date: parse_date(self.get(row, "datecl")?)?,
            ps_id: parse_ps_id(self.get(row, "ps_id")?)?,
            country: self.text(row, "co_name")?,
            card_brand: self.text(row, "card_brand")?,
            payment_method: self.text(row, "payment_method")?,
            gender: self.text(row, "gender")?,
            click_id: self.text(row, "cl_id")?,
            is_conversion: parse_flag(self.get(row, "cl_tracked")?)?,
            paid_amount: parse_amount(self.get(row, "pv")?, "pv")?,
            revenue: parse_amount(self.get(row, "revenue")?, "revenue")?,
        })
    }
}

/// Parse an ISO date, tolerating a trailing time component
/// (`2021-01-01 12:00:00` or `2021-01-01T12:00:00`).
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    let invalid = || format!("invalid date '{}'", s);
    let day = match (s.get(..10), s.get(10..)) {
        (Some(day), Some(rest)) if rest.is_empty() || rest.starts_with([' ', 'T']) => day,
        _ => return Err(invalid()),
    };
    NaiveDate::parse_from_str(day, DATE_FMT).map_err(|_| invalid())
}

fn parse_ps_id(s: &str) -> Result<i64, String> {
    if let Ok(id) = s.parse::<i64>() {
        return Ok(id);
    }
    // Exports sometimes write integer ids as "12.0"
    match s.parse::<f64>() {
        Ok(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
        _ => Err(format!("invalid ps_id '{}'", s)),
    }
}

/// Parse a conversion flag: 0/1, true/false or 0.0/1.0.
pub fn parse_flag(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => match other.parse::<f64>() {
            Ok(f) if f == 1.0 => Ok(true),
            Ok(f) if f == 0.0 => Ok(false),
            _ => Err(format!("invalid cl_tracked '{}'", s)),
        },
    }
}

fn parse_amount(s: &str, col: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("invalid {} '{}'", col, s)),
    }
}
