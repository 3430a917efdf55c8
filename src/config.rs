use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_DIR: &str = ".kpi_report";
pub const MAPPINGS_FILE: &str = "mappings.json";
pub const FEEDBACK_FILE: &str = "feedback.json";

/// Where persisted state and exported reports live.
///
/// The binary fills this from command-line flags, which in turn fall back to
/// the `KPI_REPORT_DATA_DIR` / `KPI_REPORT_EXPORT_DIR` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub export_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            export_dir: PathBuf::from("."),
        }
    }
}

impl Settings {
    pub fn new(data_dir: impl Into<PathBuf>, export_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            export_dir: export_dir.into(),
        }
    }

    pub fn mappings_path(&self) -> PathBuf {
        self.data_dir.join(MAPPINGS_FILE)
    }

    pub fn feedback_path(&self) -> PathBuf {
        self.data_dir.join(FEEDBACK_FILE)
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let s = Settings::default();
        assert_eq!(s.mappings_path(), PathBuf::from(".kpi_report/mappings.json"));
        assert_eq!(s.feedback_path(), PathBuf::from(".kpi_report/feedback.json"));
        assert_eq!(s.export_dir(), Path::new("."));
    }
}
