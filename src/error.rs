use thiserror::Error;

/// Every failure the dashboard can report, from loading the CSV to
/// serving a chart.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Line {line}: {message}")]
    MalformedRow { line: usize, message: String },

    #[error("CSV file has no data rows")]
    EmptyFile,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Chart rendering failed: {0}")]
    Chart(String),

    #[error("Template error: {0}")]
    Template(String),

    #[cfg(feature = "web")]
    #[error("XLSX export failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[cfg(feature = "web")]
    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

impl From<toml::de::Error> for DashboardError {
    fn from(err: toml::de::Error) -> Self {
        DashboardError::Config(err.to_string())
    }
}

#[cfg(feature = "web")]
impl axum::response::IntoResponse for DashboardError {
    fn into_response(self) -> axum::response::Response {
        log::error!("{}", self);
        (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            self.to_string(),
        )
            .into_response()
    }
}
