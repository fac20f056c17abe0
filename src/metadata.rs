use std::fs::read_to_string;
use std::path::Path;
use tracing::debug;

use crate::error::Result;
use crate::sample::FIELD_SEPARATOR;

/// Per-sample metadata, read from a tab separated file with a header row. Row `i` describes sample
/// `i`. Values are display-only for the session and copied into the progress log when enabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Metadata {
    /// Reads a metadata file. A missing file is read as empty metadata.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No metadata at {}, using empty metadata", path.display());
            return Ok(Self::default());
        }
        Ok(Self::parse(&read_to_string(path)?))
    }

    pub fn parse(content: &str) -> Self {
        let mut lines = content.lines().filter(|l| !l.is_empty());
        let columns: Vec<String> = match lines.next() {
            Some(header) => header.split(FIELD_SEPARATOR).map(String::from).collect(),
            None => return Self::default(),
        };
        let rows = lines
            .map(|line| {
                let mut cells: Vec<String> = line.split(FIELD_SEPARATOR).map(String::from).collect();
                cells.resize(columns.len(), String::new());
                cells
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Named values of the row describing sample `index`.
    pub fn row(&self, index: usize) -> Option<Vec<(&str, &str)>> {
        self.rows.get(index).map(|cells| {
            self.columns
                .iter()
                .map(String::as_str)
                .zip(cells.iter().map(String::as_str))
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT: &str = "set_id\tyt_id\tWoA\tArtist\n1\tabc\tLike a Virgin\tMadonna\n2\tdef\n";

    #[test]
    fn test_parse_metadata() {
        let metadata = Metadata::parse(CONTENT);
        assert_eq!(metadata.columns(), &["set_id", "yt_id", "WoA", "Artist"]);
        assert_eq!(metadata.len(), 2);
        assert_eq!(
            metadata.row(0).unwrap(),
            vec![
                ("set_id", "1"),
                ("yt_id", "abc"),
                ("WoA", "Like a Virgin"),
                ("Artist", "Madonna")
            ]
        );
        assert_eq!(
            metadata.row(1).unwrap(),
            vec![("set_id", "2"), ("yt_id", "def"), ("WoA", ""), ("Artist", "")]
        );
        assert!(metadata.row(2).is_none());
    }

    #[test]
    fn test_missing_metadata_is_empty() {
        let metadata = Metadata::read("no/such/metadata.tsv").unwrap();
        assert!(metadata.is_empty());
        assert!(metadata.columns().is_empty());
    }

    #[test]
    fn test_empty_content() {
        assert_eq!(Metadata::parse(""), Metadata::default());
    }
}
