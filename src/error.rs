use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("CSV has no rows or no headers.")]
    EmptyCsv,

    #[error("Excel sheet is empty or has no headers.")]
    EmptySheet,

    #[error("Upload .csv, .xlsx or .xls")]
    UnsupportedFile(String),

    #[error("Paste Google Sheets URL (or Spreadsheet ID).")]
    InvalidSheetUrl,

    #[error("Failed to fetch sheet. Make sure it is public or 'Published to web'. ({0})")]
    SheetFetch(String),

    #[error("Please add a short comment (1–2 sentences).")]
    EmptyFeedback,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel error: {0}")]
    Excel(#[from] calamine::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;
