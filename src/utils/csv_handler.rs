//! 旧版访问记录 CSV 读取
//!
//! Legacy history exports are `title,project,viewed_at` rows where
//! `viewed_at` is RFC3339 or `YYYY-MM-DD`.

use csv::ReaderBuilder;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::errors::{HistoryError, Result};
use crate::storage::LegacyPageView;
use crate::utils::TimeParser;

/// CSV 行数据结构
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyCsvRow {
    pub title: String,
    pub project: String,
    pub viewed_at: String,
}

impl LegacyCsvRow {
    pub fn into_legacy_page_view(self) -> Result<LegacyPageView> {
        if self.title.is_empty() {
            return Err(HistoryError::validation("Empty title"));
        }
        if self.project.is_empty() {
            return Err(HistoryError::validation("Empty project"));
        }
        let viewed_date = TimeParser::parse_instant(&self.viewed_at)?;
        Ok(LegacyPageView {
            title: self.title,
            project: self.project,
            viewed_date,
        })
    }
}

/// Read legacy rows from any reader.
///
/// Bad rows are skipped with a warning; the read fails only when no row
/// could be used at all.
pub fn read_legacy_csv<R: Read>(reader: R) -> Result<Vec<LegacyPageView>> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    let mut errors = Vec::new();

    for (row_idx, result) in csv_reader.deserialize::<LegacyCsvRow>().enumerate() {
        let row_num = row_idx + 2; // 1-based, header 占第 1 行

        match result {
            Ok(row) => match row.into_legacy_page_view() {
                Ok(record) => records.push(record),
                Err(e) => errors.push(format!("Row {}: {}", row_num, e.message())),
            },
            Err(e) => errors.push(format!("Row {}: CSV parse error: {}", row_num, e)),
        }
    }

    if !errors.is_empty() && records.is_empty() {
        return Err(HistoryError::serialization(format!(
            "Failed to read legacy CSV:\n{}",
            errors.join("\n")
        )));
    }

    if !errors.is_empty() {
        tracing::warn!("Legacy CSV warnings:\n{}", errors.join("\n"));
    }

    Ok(records)
}

/// 从 CSV 文件读取旧版访问记录
pub fn import_legacy_csv<P: AsRef<Path>>(path: P) -> Result<Vec<LegacyPageView>> {
    let file = File::open(path.as_ref())
        .map_err(|e| HistoryError::file_operation(format!("Failed to open file: {}", e)))?;
    read_legacy_csv(BufReader::new(file))
}
