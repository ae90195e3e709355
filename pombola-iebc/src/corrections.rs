//! Manually curated name correction tables
//!
//! The IEBC API spells some wards and parties differently from the documents
//! our data was built from. Each table is a two-column CSV without a header,
//! `api_name,db_name`, mapping the API spelling to ours.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::data_files::{PARTY_NAME_CORRECTIONS, WARD_NAME_CORRECTIONS};
use crate::{ImportError, ImportResult};

#[derive(Debug, Clone, Default)]
pub struct CorrectionTable {
    entries: HashMap<String, String>,
    source: Option<PathBuf>,
}

impl CorrectionTable {
    /// Load a table; rows with either column empty are skipped
    pub fn load(path: &Path) -> ImportResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(|e| ImportError::Corrections {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        let mut entries = HashMap::new();
        for record in reader.records() {
            let record = record?;
            let api_name = record.get(0).unwrap_or("").trim();
            let db_name = record.get(1).unwrap_or("").trim();
            if !api_name.is_empty() && !db_name.is_empty() {
                entries.insert(api_name.to_string(), db_name.to_string());
            }
        }

        tracing::debug!(file = %path.display(), entries = entries.len(), "Loaded correction table");

        Ok(Self {
            entries,
            source: Some(path.to_path_buf()),
        })
    }

    pub fn from_pairs<I, A, B>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(a, b)| (a.into(), b.into()))
                .collect(),
            source: None,
        }
    }

    /// Our spelling of `name`, or `name` itself when there is no correction
    pub fn correct<'a>(&'a self, name: &'a str) -> &'a str {
        self.entries.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

/// Both correction tables
#[derive(Debug, Clone, Default)]
pub struct Corrections {
    pub places: CorrectionTable,
    pub parties: CorrectionTable,
}

impl Corrections {
    /// Load the tables from the election data directory
    pub fn load(data_directory: &Path) -> ImportResult<Self> {
        Ok(Self {
            places: CorrectionTable::load(&data_directory.join(WARD_NAME_CORRECTIONS))?,
            parties: CorrectionTable::load(&data_directory.join(PARTY_NAME_CORRECTIONS))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_skips_incomplete_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wards.csv");
        std::fs::write(
            &path,
            "KABETE/KIAMBAA,Kabete / Kiambaa\nLONELY,\n,Orphan\nMUGUGA , Muguga\nsingle\n",
        )
        .unwrap();

        let table = CorrectionTable::load(&path).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.correct("KABETE/KIAMBAA"), "Kabete / Kiambaa");
        assert_eq!(table.correct("MUGUGA"), "Muguga");
        assert_eq!(table.correct("LONELY"), "LONELY");
        assert_eq!(table.source(), Some(path.as_path()));
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let result = Corrections::load(dir.path());
        assert!(matches!(result, Err(ImportError::Corrections { .. })));
    }

    #[test]
    fn test_load_both_tables() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(WARD_NAME_CORRECTIONS), "A,B\n").unwrap();
        std::fs::write(
            dir.path().join(PARTY_NAME_CORRECTIONS),
            "ODM,Orange Democratic Movement\n",
        )
        .unwrap();

        let corrections = Corrections::load(dir.path()).unwrap();

        assert_eq!(corrections.places.correct("A"), "B");
        assert_eq!(corrections.parties.correct("ODM"), "Orange Democratic Movement");
    }
}
