//! Point metadata export.
//!
//! The metadata endpoint answers with semicolon-separated rows. The
//! fragments for a floor are concatenated as-is, every `;` becomes `,`, and
//! a fixed header row is prepended. Rows are not validated: a fragment that
//! ends mid-row, or a value that itself contained a `;`, ends up in the file
//! unchanged apart from the separator swap.

use std::path::PathBuf;

use tracing::info;

use crate::error::ScrapeResult;
use crate::storage::{write_file, StorageLayout};

/// Header row of every exported table.
pub const CSV_HEADER: &str = "x,y,name,type,imageUrl,link,id\n";

/// Replace every semicolon with a comma.
pub fn normalize_metadata(text: &str) -> String {
    text.replace(';', ",")
}

/// Header plus normalized metadata, exactly as written to disk.
pub fn render_table(text: &str) -> String {
    let mut table = String::with_capacity(CSV_HEADER.len() + text.len());
    table.push_str(CSV_HEADER);
    table.push_str(&normalize_metadata(text));
    table
}

/// The table file written for one floor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTable {
    pub floor_id: String,
    pub path: PathBuf,
    /// Non-empty lines after the header.
    pub rows: usize,
    pub bytes: usize,
}

/// Writes `{data}/{floor}.csv`.
#[derive(Debug, Clone, Copy)]
pub struct DataExporter<'a> {
    layout: &'a StorageLayout,
}

impl<'a> DataExporter<'a> {
    pub fn new(layout: &'a StorageLayout) -> Self {
        Self { layout }
    }

    pub fn export_table(&self, floor_id: &str, metadata: &str) -> ScrapeResult<ExportTable> {
        let table = render_table(metadata);
        let path = self.layout.table_path(floor_id);
        write_file(&path, &table)?;

        let rows = table
            .lines()
            .skip(1)
            .filter(|line| !line.trim().is_empty())
            .count();
        info!(floor = floor_id, path = %path.display(), rows, "Wrote floor data");

        Ok(ExportTable {
            floor_id: floor_id.to_string(),
            path,
            rows,
            bytes: table.len(),
        })
    }
}
