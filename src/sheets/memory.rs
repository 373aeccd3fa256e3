//! In-memory [`SheetStore`] for exercising the pipeline without the network.

use super::{SheetStore, SheetsError, Tab};
use crate::models::{HEADER, SummaryRow};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemorySheets {
    tabs: Mutex<BTreeMap<String, Vec<Vec<String>>>>,
}

impl MemorySheets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a tab with raw rows (header included).
    pub fn with_tab(mut self, name: &str, rows: Vec<Vec<String>>) -> Self {
        self.tabs.get_mut().insert(name.to_string(), rows);
        self
    }

    pub async fn rows(&self, name: &str) -> Option<Vec<Vec<String>>> {
        self.tabs.lock().await.get(name).cloned()
    }
}

fn tab(name: &str) -> Tab {
    Tab {
        title: name.to_string(),
        sheet_id: 0,
    }
}

impl SheetStore for MemorySheets {
    async fn get_or_create_tab(&self, name: &str) -> Result<Tab, SheetsError> {
        self.tabs
            .lock()
            .await
            .entry(name.to_string())
            .or_insert_with(|| vec![HEADER.iter().map(|h| h.to_string()).collect()]);
        Ok(tab(name))
    }

    async fn read_all_rows(&self, tab: &Tab) -> Result<Vec<Vec<String>>, SheetsError> {
        Ok(self.tabs.lock().await.get(&tab.title).cloned().unwrap_or_default())
    }

    async fn append_row(&self, tab: &Tab, row: &SummaryRow) -> Result<(), SheetsError> {
        self.tabs
            .lock()
            .await
            .entry(tab.title.clone())
            .or_default()
            .push(row.to_cells());
        Ok(())
    }

    async fn update_cell(
        &self,
        tab: &Tab,
        row: usize,
        column: usize,
        value: &str,
    ) -> Result<(), SheetsError> {
        let mut tabs = self.tabs.lock().await;
        let rows = tabs.entry(tab.title.clone()).or_default();
        if rows.len() < row {
            rows.resize(row, Vec::new());
        }
        let cells = &mut rows[row - 1];
        if cells.len() < column {
            cells.resize(column, String::new());
        }
        cells[column - 1] = value.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let store = MemorySheets::new();
        let first = store.get_or_create_tab("2025-05-06").await.unwrap();
        store
            .append_row(&first, &SummaryRow::new("2025-05-06", "t", "s"))
            .await
            .unwrap();
        let second = store.get_or_create_tab("2025-05-06").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.rows("2025-05-06").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_cell_pads_short_rows() {
        let store = MemorySheets::new().with_tab(
            "d",
            vec![
                vec!["h".into()],
                vec!["d".into(), "t".into(), "s".into()],
            ],
        );
        store.update_cell(&tab("d"), 2, 4, "thread").await.unwrap();
        assert_eq!(store.rows("d").await.unwrap()[1], vec!["d", "t", "s", "thread"]);
    }
}
