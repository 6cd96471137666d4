use std::path::Path;

use twdict_core::dictionary::DictionaryLoader;
use twdict_core::error::ParseError;
use twdict_types::DictionaryRecord;

use crate::columns::ColumnMap;
use crate::record::record_from_row;
use crate::sheet::{SheetRow, read_first_sheet};

/// Loads the publisher's xlsx export
#[derive(Debug, Default, Clone, Copy)]
pub struct XlsxLoader;

impl XlsxLoader {
    /// Turn sheet rows into records. The first non-empty row is the header.
    pub fn records_from_rows(rows: Vec<SheetRow>) -> Result<Vec<DictionaryRecord>, ParseError> {
        let mut rows = rows.into_iter();
        let header = rows.next().ok_or(ParseError::NoRows)?;
        let columns = ColumnMap::from_header(&header.cells)?;

        let mut records = Vec::new();
        let mut data_rows = 0usize;
        let mut skipped = 0usize;

        for row in rows {
            data_rows += 1;
            match record_from_row(&columns, &row.cells) {
                Some(record) => records.push(record),
                None => {
                    skipped += 1;
                    tracing::warn!("Skipping row {}: empty headword", row.number);
                }
            }
        }

        if data_rows == 0 {
            return Err(ParseError::NoRows);
        }
        if skipped > 0 {
            tracing::warn!("Skipped {} of {} rows without a headword", skipped, data_rows);
        }

        Ok(records)
    }
}

impl DictionaryLoader for XlsxLoader {
    fn load_from_file(&self, path: &Path) -> Result<Vec<DictionaryRecord>, ParseError> {
        tracing::info!("Loading dictionary from file: {}", path.display());
        let records = Self::records_from_rows(read_first_sheet(path)?)?;
        tracing::info!("Loaded {} dictionary records from file", records.len());
        Ok(records)
    }

    fn supported_formats(&self) -> Vec<String> {
        vec!["xlsx".to_string()]
    }
}
