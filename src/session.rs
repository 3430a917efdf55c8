use crate::error::Result;
use crate::mapper::suggest;
use crate::output::{write_report, ExportReport};
use crate::reports::analyze;
use crate::store::MappingStore;
use crate::types::{ColumnRoleMapping, Dashboard, Table};
use chrono::Utc;
use log::{debug, info};
use std::path::{Path, PathBuf};

/// The working state of one user: the loaded table, where it came from and
/// the current column mapping.
///
/// Mapping edits are written through to the `MappingStore` (when one is
/// attached) under the current source name, so reloading the same file later
/// restores them.
#[derive(Debug, Default)]
pub struct Session {
    table: Option<Table>,
    source_name: String,
    mapping: ColumnRoleMapping,
    store: Option<MappingStore>,
}

impl Session {
    pub fn new(store: Option<MappingStore>) -> Self {
        Self {
            store,
            ..Self::default()
        }
    }

    /// Replace the loaded table.
    ///
    /// The mapping starts from a fresh suggestion for the new columns, then any
    /// mapping saved for `source_name` is laid over it.
    pub fn load(&mut self, source_name: &str, table: Table) {
        let mut mapping = suggest(table.columns());
        if let Some(saved) = self.store.as_ref().and_then(|s| s.get(source_name)) {
            info!("Restored saved mapping for {}", source_name);
            mapping.overlay(&saved);
        }

        self.source_name = source_name.to_string();
        self.mapping = mapping;
        self.table = Some(table);
    }

    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn mapping(&self) -> &ColumnRoleMapping {
        &self.mapping
    }

    pub fn columns(&self) -> &[String] {
        self.table.as_ref().map(|t| t.columns()).unwrap_or(&[])
    }

    pub fn set_revenue(&mut self, column: Option<String>) -> Result<()> {
        self.mapping.revenue_column = column;
        self.persist()
    }

    pub fn toggle_cost(&mut self, column: &str) -> Result<()> {
        self.mapping.toggle_cost_column(column);
        self.persist()
    }

    /// `None` clears the role. It is stored as an empty name so the cleared
    /// state survives a reload instead of reverting to the suggestion.
    pub fn set_product(&mut self, column: Option<String>) -> Result<()> {
        self.mapping.product_column = Some(column.unwrap_or_default());
        self.persist()
    }

    /// Same clearing rule as [`Session::set_product`].
    pub fn set_date(&mut self, column: Option<String>) -> Result<()> {
        self.mapping.date_column = Some(column.unwrap_or_default());
        self.persist()
    }

    pub fn set_mapping(&mut self, mapping: ColumnRoleMapping) -> Result<()> {
        self.mapping = mapping;
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        match &self.store {
            Some(store) if !self.source_name.is_empty() => {
                store.save(&self.source_name, &self.mapping)
            }
            _ => {
                debug!("No source loaded; mapping change kept in memory only");
                Ok(())
            }
        }
    }

    /// KPIs, health, trend and cost breakdown for the loaded table.
    pub fn dashboard(&self) -> Option<Dashboard> {
        self.table.as_ref().map(|t| analyze(t, &self.mapping))
    }

    pub fn export_report(&self) -> Option<ExportReport> {
        let table = self.table.as_ref()?;
        let dashboard = analyze(table, &self.mapping);
        Some(ExportReport::new(
            &self.source_name,
            table,
            &self.mapping,
            &dashboard,
            Utc::now(),
        ))
    }

    /// Write the export into `dir`. `Ok(None)` means nothing was loaded.
    pub fn export(&self, dir: impl AsRef<Path>) -> Result<Option<PathBuf>> {
        match self.export_report() {
            Some(report) => write_report(dir, &report).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_csv;
    use crate::output::read_report;
    use tempfile::TempDir;

    const CSV: &str = "Day,Sales,COGS,Rent,Item\n\
                       2024-01-01,100,30,10,Latte\n\
                       2024-01-02,200,50,10,Mocha\n";

    fn table() -> Table {
        parse_csv(CSV.as_bytes()).unwrap()
    }

    #[test]
    fn test_empty_session_has_no_dashboard() {
        let session = Session::new(None);
        assert!(session.dashboard().is_none());
        assert!(session.columns().is_empty());
        let dir = TempDir::new().unwrap();
        assert!(session.export(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_load_applies_suggestion() {
        let mut session = Session::new(None);
        session.load("shop.csv", table());
        assert_eq!(session.source_name(), "shop.csv");
        assert_eq!(session.mapping().revenue_column.as_deref(), Some("Sales"));
        assert_eq!(session.mapping().cost_columns, vec!["COGS"]);

        let d = session.dashboard().unwrap();
        assert_eq!(d.kpis.revenue, 300.0);
        assert_eq!(d.kpis.cost, 80.0);
        assert_eq!(d.trend.len(), 2);
    }

    #[test]
    fn test_mapping_edits_survive_reload() {
        let dir = TempDir::new().unwrap();
        let store = MappingStore::new(dir.path().join("mappings.json"));

        let mut first = Session::new(Some(store.clone()));
        first.load("shop.csv", table());
        first.toggle_cost("Rent").unwrap();
        first.set_product(None).unwrap();
        assert_eq!(first.dashboard().unwrap().kpis.cost, 100.0);

        let mut second = Session::new(Some(store));
        second.load("shop.csv", table());
        assert_eq!(second.mapping().cost_columns, vec!["COGS", "Rent"]);
        assert_eq!(second.mapping().product_column.as_deref(), Some(""));
        assert_eq!(second.dashboard().unwrap().kpis.top_product, "N/A");

        second.load("other.csv", table());
        assert_eq!(second.mapping().cost_columns, vec!["COGS"]);
        assert_eq!(second.mapping().product_column.as_deref(), Some("Item"));
    }

    #[test]
    fn test_cleared_roles_stay_cleared_after_reload() {
        let dir = TempDir::new().unwrap();
        let store = MappingStore::new(dir.path().join("mappings.json"));

        let mut first = Session::new(Some(store.clone()));
        first.load("shop.csv", table());
        first.toggle_cost("COGS").unwrap();
        first.set_date(None).unwrap();
        assert!(first.mapping().cost_columns.is_empty());

        let mut second = Session::new(Some(store));
        second.load("shop.csv", table());
        assert!(second.mapping().cost_columns.is_empty());
        assert_eq!(second.mapping().date_column.as_deref(), Some(""));
        assert_eq!(second.mapping().revenue_column.as_deref(), Some("Sales"));

        let d = second.dashboard().unwrap();
        assert_eq!(d.kpis.cost, 0.0);
        assert!(d.trend.is_empty());
        assert!(d.cost_breakdown.is_empty());
    }

    #[test]
    fn test_export_writes_loaded_source() {
        let dir = TempDir::new().unwrap();
        let mut session = Session::new(None);
        session.load("shop.csv", table());
        session.set_revenue(Some("Sales".into())).unwrap();

        let path = session.export(dir.path()).unwrap().unwrap();
        let report = read_report(path).unwrap();
        assert_eq!(report.source, "shop.csv");
        assert_eq!(report.kpis, session.dashboard().unwrap().kpis);
        assert_eq!(report.sample_rows.len(), 2);
    }
}
