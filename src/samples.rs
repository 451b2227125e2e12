// src/samples.rs

//! Sample Table: one row per sample, loaded once and read-only afterwards.
//!
//! The sheet is a tabular file with a header row. The delimiter is a tab if
//! the header contains one, otherwise a comma. The identifier column must be
//! named `sample`; every other column maps a name (e.g. `fq1`, `fq2`) to an
//! input file path for that sample.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::errors::{EngineError, Result};
use crate::fs::FileSystem;

/// One row of the sample sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub id: String,
    /// Named input files, keyed by column name.
    pub inputs: BTreeMap<String, PathBuf>,
}

/// The full sample sheet, in row order.
#[derive(Debug, Clone)]
pub struct SampleTable {
    columns: Vec<String>,
    samples: Vec<Sample>,
}

const ID_COLUMN: &str = "sample";

impl SampleTable {
    /// Load and parse a sample sheet.
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        let contents = fs
            .read_to_string(path)
            .map_err(|e| EngineError::SampleTable(format!("{:?}: {}", path, e)))?;
        Self::parse(&contents)
            .map_err(|msg| EngineError::SampleTable(format!("{:?}: {}", path, msg)))
    }

    /// Parse sheet contents. Exposed for tests and builders.
    pub fn parse(contents: &str) -> std::result::Result<Self, String> {
        let mut lines = contents
            .lines()
            .map(str::trim_end)
            .filter(|l| !l.is_empty() && !l.starts_with('#'));

        let header = lines.next().ok_or("empty sample sheet")?;
        let delim = if header.contains('\t') { '\t' } else { ',' };

        let columns: Vec<String> = header.split(delim).map(|c| c.trim().to_string()).collect();
        let id_idx = columns
            .iter()
            .position(|c| c == ID_COLUMN)
            .ok_or_else(|| format!("header must contain a '{ID_COLUMN}' column"))?;

        let mut samples: Vec<Sample> = Vec::new();
        for (lineno, line) in lines.enumerate() {
            let fields: Vec<&str> = line.split(delim).map(str::trim).collect();
            if fields.len() != columns.len() {
                return Err(format!(
                    "row {}: expected {} fields, found {}",
                    lineno + 2,
                    columns.len(),
                    fields.len()
                ));
            }

            let id = fields[id_idx].to_string();
            if id.is_empty() {
                return Err(format!("row {}: empty sample id", lineno + 2));
            }
            if samples.iter().any(|s| s.id == id) {
                return Err(format!("duplicate sample id '{id}'"));
            }

            let inputs = columns
                .iter()
                .zip(&fields)
                .filter(|(col, _)| col.as_str() != ID_COLUMN)
                .map(|(col, value)| (col.clone(), PathBuf::from(value)))
                .collect();

            samples.push(Sample { id, inputs });
        }

        if samples.is_empty() {
            return Err("sample sheet contains no rows".to_string());
        }

        Ok(Self { columns, samples })
    }

    /// Sample ids in sheet order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.samples.iter().map(|s| s.id.as_str())
    }

    pub fn get(&self, id: &str) -> Option<&Sample> {
        self.samples.iter().find(|s| s.id == id)
    }

    /// Path for a given sample and column.
    pub fn input_path(&self, id: &str, column: &str) -> Option<&Path> {
        self.get(id)
            .and_then(|s| s.inputs.get(column))
            .map(PathBuf::as_path)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHEET: &str = "sample\tfq1\tfq2\n\
        S1\tdata/S1_R1.fastq\tdata/S1_R2.fastq\n\
        S2\tdata/S2_R1.fastq\tdata/S2_R2.fastq\n";

    #[test]
    fn parses_tab_separated_sheet() {
        let table = SampleTable::parse(SHEET).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.ids().collect::<Vec<_>>(), vec!["S1", "S2"]);
        assert_eq!(
            table.input_path("S2", "fq1").unwrap(),
            Path::new("data/S2_R1.fastq")
        );
    }

    #[test]
    fn parses_comma_separated_sheet() {
        let table = SampleTable::parse("sample,fq1\nS1,a.fastq\n").unwrap();
        assert_eq!(table.input_path("S1", "fq1").unwrap(), Path::new("a.fastq"));
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let table =
            SampleTable::parse("# sheet\nsample\tfq1\n\nS1\ta.fastq\n# trailing\n").unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn rejects_duplicate_sample_id() {
        let err = SampleTable::parse("sample\tfq1\nS1\ta\nS1\tb\n").unwrap_err();
        assert!(err.contains("duplicate sample id"));
    }

    #[test]
    fn rejects_missing_id_column() {
        let err = SampleTable::parse("name\tfq1\nS1\ta\n").unwrap_err();
        assert!(err.contains("'sample' column"));
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = SampleTable::parse("sample\tfq1\tfq2\nS1\ta\n").unwrap_err();
        assert!(err.contains("expected 3 fields"));
    }

    #[test]
    fn rejects_empty_sheet() {
        assert!(SampleTable::parse("sample\tfq1\n").is_err());
    }
}
