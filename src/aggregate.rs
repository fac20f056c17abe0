/*!
Offline aggregation of every annotator's work. The annotator outputs and their progress logs are
joined into one combined table (one row per logged sample and annotator), which can then be
pivoted into a wide table where each annotator contributes its own tokens and tags.
*/
use ahash::AHashMap;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_jsonlines::write_json_lines;
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{AggregationError, Result};
use crate::paths::{parse_log_file_name, ANNOTATOR_SEPARATOR, OUTPUT_EXTENSION};
use crate::progress::{ProgressLog, TIMESTAMP_COLUMN, TIMESTAMP_FORMAT};
use crate::sample::read_samples;

pub const INDEX_COLUMN: &str = "Index";
pub const SUBSET_COLUMN: &str = "Subset";
pub const ANNOTATOR_COLUMN: &str = "Annotator";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// One logged sample of one annotator.
pub struct CombinedRow {
    pub index: usize,
    /// Dataset stem the sample belongs to.
    pub subset: String,
    pub annotator: String,
    pub timestamp: NaiveDateTime,
    /// Metadata values copied into the log.
    pub metadata: BTreeMap<String, String>,
    pub tokens: Vec<String>,
    pub tags: Vec<String>,
}

impl CombinedRow {
    /// Value of a column, addressed by name: `Index`, `Subset`, `Annotator`, `Timestamp` or any
    /// metadata column.
    pub fn column(&self, name: &str) -> Option<Cow<'_, str>> {
        match name {
            INDEX_COLUMN => Some(Cow::Owned(self.index.to_string())),
            SUBSET_COLUMN => Some(Cow::Borrowed(self.subset.as_str())),
            ANNOTATOR_COLUMN => Some(Cow::Borrowed(self.annotator.as_str())),
            TIMESTAMP_COLUMN => Some(Cow::Owned(
                self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            )),
            other => self.metadata.get(other).map(|v| Cow::Borrowed(v.as_str())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombinedTable {
    rows: Vec<CombinedRow>,
}

impl From<Vec<CombinedRow>> for CombinedTable {
    fn from(rows: Vec<CombinedRow>) -> Self {
        Self { rows }
    }
}

impl CombinedTable {
    pub fn rows(&self) -> &[CombinedRow] {
        &self.rows
    }
    pub fn len(&self) -> usize {
        self.rows.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
    pub fn annotators(&self) -> BTreeSet<&str> {
        self.rows.iter().map(|r| r.annotator.as_str()).collect()
    }
}

/// Joins every progress log found in `log_dir` with the matching annotator output in
/// `output_dir`. Logs without an output, and log entries without a sample, are skipped. Fails when
/// no log matches any output.
pub fn collect_annotations<P, Q>(output_dir: P, log_dir: Q) -> Result<CombinedTable>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let (output_dir, log_dir) = (output_dir.as_ref(), log_dir.as_ref());
    let no_pairs = || AggregationError::NoMatchingPairs {
        output_dir: output_dir.to_path_buf(),
        log_dir: log_dir.to_path_buf(),
    };
    if !log_dir.is_dir() {
        return Err(no_pairs().into());
    }
    let mut file_names: Vec<String> = fs::read_dir(log_dir)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    file_names.sort();

    let mut rows = Vec::new();
    let mut pairs = 0;
    for file_name in file_names {
        let Some((subset, annotator)) = parse_log_file_name(&file_name) else {
            continue;
        };
        let output = output_dir.join(format!(
            "{}{}{}.{}",
            subset, ANNOTATOR_SEPARATOR, annotator, OUTPUT_EXTENSION
        ));
        if !output.is_file() {
            debug!("No output {} for log {}, skipping", output.display(), file_name);
            continue;
        }
        let log = ProgressLog::open(log_dir.join(&file_name))?;
        let samples = read_samples(&output)?;
        pairs += 1;
        for (index, entry) in log.entries() {
            let Some(sample) = samples.get(index) else {
                debug!(
                    "{} logs sample {} but {} only has {} samples",
                    file_name,
                    index,
                    output.display(),
                    samples.len()
                );
                continue;
            };
            rows.push(CombinedRow {
                index,
                subset: subset.clone(),
                annotator: annotator.clone(),
                timestamp: entry.timestamp,
                metadata: entry.metadata.clone(),
                tokens: sample.tokens().into_iter().map(String::from).collect(),
                tags: sample.tags().into_iter().map(String::from).collect(),
            });
        }
    }
    if pairs == 0 {
        return Err(no_pairs().into());
    }
    rows.sort_by(|a, b| {
        (&a.subset, &a.annotator, a.index).cmp(&(&b.subset, &b.annotator, b.index))
    });
    info!(
        "Collected {} annotated samples from {} output/log pairs",
        rows.len(),
        pairs
    );
    Ok(CombinedTable { rows })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// The tokens and tags an annotator gave to one sample.
pub struct Annotation {
    #[serde(rename = "TEXT")]
    pub tokens: Vec<String>,
    #[serde(rename = "IOB")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One sample identity with the annotation of every annotator who logged it.
pub struct WideRow {
    /// Values of the identity columns, in the order of `WideTable::identity_columns`.
    pub identity: Vec<String>,
    pub annotations: BTreeMap<String, Annotation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WideTable {
    identity_columns: Vec<String>,
    rows: Vec<WideRow>,
}

#[derive(Serialize)]
struct WideRecord<'a> {
    identity: BTreeMap<&'a str, &'a str>,
    annotations: &'a BTreeMap<String, Annotation>,
}

impl WideTable {
    pub fn identity_columns(&self) -> &[String] {
        &self.identity_columns
    }
    pub fn rows(&self) -> &[WideRow] {
        &self.rows
    }
    pub fn len(&self) -> usize {
        self.rows.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
    /// Every annotator present in the table, sorted.
    pub fn annotators(&self) -> BTreeSet<&str> {
        self.rows
            .iter()
            .flat_map(|r| r.annotations.keys().map(String::as_str))
            .collect()
    }

    /// Writes one JSON object per identity.
    pub fn write_json_lines<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let records = self.rows.iter().map(|row| WideRecord {
            identity: self
                .identity_columns
                .iter()
                .map(String::as_str)
                .zip(row.identity.iter().map(String::as_str))
                .collect(),
            annotations: &row.annotations,
        });
        write_json_lines(path, records)?;
        Ok(())
    }
}

/// Reshapes `combined` so each distinct identity becomes one row, each annotator (read from
/// `annotator_column`) contributing its own tokens and tags. Identities keep the order in which they
/// first appear.
pub fn pivot<S: AsRef<str>>(
    combined: &CombinedTable,
    identity_columns: &[S],
    annotator_column: &str,
) -> Result<WideTable> {
    let mut rows: Vec<WideRow> = Vec::new();
    let mut positions: AHashMap<Vec<String>, usize> = AHashMap::with_capacity(combined.len());
    for row in combined.rows() {
        let identity = identity_columns
            .iter()
            .map(|c| {
                row.column(c.as_ref())
                    .map(Cow::into_owned)
                    .ok_or_else(|| AggregationError::MissingColumn(String::from(c.as_ref())))
            })
            .collect::<std::result::Result<Vec<String>, _>>()?;
        let annotator = row
            .column(annotator_column)
            .ok_or_else(|| AggregationError::MissingColumn(String::from(annotator_column)))?
            .into_owned();
        let position = *positions.entry(identity.clone()).or_insert_with(|| {
            rows.push(WideRow {
                identity: identity.clone(),
                annotations: BTreeMap::new(),
            });
            rows.len() - 1
        });
        let annotations = &mut rows[position].annotations;
        if annotations.contains_key(&annotator) {
            return Err(AggregationError::DuplicateEntry {
                identity,
                annotator,
            }
            .into());
        }
        annotations.insert(
            annotator,
            Annotation {
                tokens: row.tokens.clone(),
                tags: row.tags.clone(),
            },
        );
    }
    Ok(WideTable {
        identity_columns: identity_columns
            .iter()
            .map(|c| String::from(c.as_ref()))
            .collect(),
        rows,
    })
}
