#![cfg(feature = "web")]

use crate::error::DashboardError;
use crate::table::AggregateRow;
use rust_xlsxwriter::{Workbook, Worksheet};

/// Column headers shared by both export formats
const HEADERS: [&str; 10] = [
    "date",
    "ps_id",
    "country",
    "card_brand",
    "payment_method",
    "gender",
    "clicks",
    "conversions",
    "paid_amount",
    "revenue",
];

/// Download formats offered for the filtered table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "csv" => Some(ExportFormat::Csv),
            "xlsx" => Some(ExportFormat::Xlsx),
            _ => None,
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            ExportFormat::Csv => "dashboard_export.csv",
            ExportFormat::Xlsx => "dashboard_export.xlsx",
        }
    }

    pub fn export(self, rows: &[&AggregateRow]) -> Result<Vec<u8>, DashboardError> {
        match self {
            ExportFormat::Csv => to_csv(rows),
            ExportFormat::Xlsx => to_xlsx(rows),
        }
    }
}

/// Convert filtered aggregate rows to CSV
///
/// One line per row under a header line; dates are written as YYYY-MM-DD.
///
/// # Arguments
/// * `rows` - The filtered rows to export
///
/// # Returns
/// * `Result<Vec<u8>, DashboardError>` - CSV content or an error
pub fn to_csv(rows: &[&AggregateRow]) -> Result<Vec<u8>, DashboardError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(HEADERS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| DashboardError::Io(e.into_error()))
}

/// Convert filtered aggregate rows to XLSX
///
/// # Arguments
/// * `rows` - The filtered rows to export
///
/// # Returns
/// * `Result<Vec<u8>, DashboardError>` - XLSX file content as bytes or an error
pub fn to_xlsx(rows: &[&AggregateRow]) -> Result<Vec<u8>, DashboardError> {
    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();

    for (col, name) in HEADERS.iter().enumerate() {
        worksheet.write_string(0, col as u16, *name)?;
    }

    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        worksheet.write_string(r, 0, &row.date.format("%Y-%m-%d").to_string())?;
        worksheet.write_number(r, 1, row.ps_id as f64)?;
        worksheet.write_string(r, 2, row.country.as_str())?;
        worksheet.write_string(r, 3, row.card_brand.as_str())?;
        worksheet.write_string(r, 4, row.payment_method.as_str())?;
        worksheet.write_string(r, 5, row.gender.as_str())?;
        worksheet.write_number(r, 6, row.clicks as f64)?;
        worksheet.write_number(r, 7, row.conversions as f64)?;
        worksheet.write_number(r, 8, row.paid_amount)?;
        worksheet.write_number(r, 9, row.revenue)?;
    }

    workbook.push_worksheet(worksheet);

    let buffer = workbook.save_to_buffer()?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rows() -> Vec<AggregateRow> {
        vec![
            AggregateRow {
                date: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
                ps_id: 3,
                country: "US".to_string(),
                card_brand: "Visa".to_string(),
                payment_method: "card".to_string(),
                gender: "F".to_string(),
                clicks: 4,
                conversions: 1,
                paid_amount: 12.5,
                revenue: 2.25,
            },
            AggregateRow {
                date: NaiveDate::from_ymd_opt(2021, 1, 2).unwrap(),
                ps_id: 3,
                country: "Côte d'Ivoire, CI".to_string(),
                card_brand: "Amex".to_string(),
                payment_method: "paypal".to_string(),
                gender: "M".to_string(),
                clicks: 1,
                conversions: 0,
                paid_amount: 0.0,
                revenue: 0.0,
            },
        ]
    }

    #[test]
    fn test_to_csv() {
        let rows = rows();
        let refs: Vec<&AggregateRow> = rows.iter().collect();
        let csv = String::from_utf8(to_csv(&refs).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "date,ps_id,country,card_brand,payment_method,gender,clicks,conversions,paid_amount,revenue"
        );
        assert_eq!(lines[1], "2021-01-01,3,US,Visa,card,F,4,1,12.5,2.25");
        assert!(lines[2].starts_with("2021-01-02,3,\"Côte d'Ivoire, CI\",Amex"));
    }

    #[test]
    fn test_to_csv_empty_has_header() {
        let csv = String::from_utf8(to_csv(&[]).unwrap()).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn test_to_xlsx_is_zip() {
        let rows = rows();
        let refs: Vec<&AggregateRow> = rows.iter().collect();
        let bytes = to_xlsx(&refs).unwrap();
        assert_eq!(&bytes[0..2], b"PK");
    }

    #[test]
    fn test_format_metadata() {
        assert_eq!(ExportFormat::from_slug("xlsx"), Some(ExportFormat::Xlsx));
        assert_eq!(ExportFormat::from_slug("csv"), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::from_slug("pdf"), None);
        assert!(ExportFormat::Csv.content_type().starts_with("text/csv"));
        assert!(ExportFormat::Xlsx.file_name().ends_with(".xlsx"));
    }
}
