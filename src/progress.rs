/*!
Progress log of one (dataset, annotator) pair. It maps sample indices to the last time the sample
was edited or approved, and answers the "where do I resume" question.

The log is a tab separated file. Its header starts with an empty cell (the index column), then
`Timestamp`, then any metadata columns copied at logging time:

```text
	Timestamp	set_id	Artist
0	2024-10-01 12:00:00	1	Madonna
3	2024-10-01 12:03:10	4	Prince
```
*/
use chrono::{Local, NaiveDateTime, SubsecRound};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::Result;
use crate::sample::FIELD_SEPARATOR;
use crate::store::write_atomically;

pub const TIMESTAMP_COLUMN: &str = "Timestamp";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// What `first_unlogged_index` returns once every sample has been logged.
pub enum ResumePolicy {
    /// Start over at index 0, for another review pass.
    #[default]
    WrapToStart,
    /// Stay on the last sample.
    StayAtEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Lookup result of `ProgressLog::timestamp`.
pub enum LogStatus {
    Logged(NaiveDateTime),
    NotLogged,
}

impl LogStatus {
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            LogStatus::Logged(ts) => Some(*ts),
            LogStatus::NotLogged => None,
        }
    }
    pub fn is_logged(&self) -> bool {
        matches!(self, LogStatus::Logged(_))
    }
}

impl Display for LogStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogStatus::Logged(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
            LogStatus::NotLogged => write!(f, "not logged"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: NaiveDateTime,
    /// Metadata values copied when the entry was last written.
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressLog {
    path: PathBuf,
    /// Metadata columns, in the order they appear in the file.
    columns: Vec<String>,
    entries: BTreeMap<usize, LogEntry>,
}

/// Current local time, truncated to the second.
pub fn now() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

impl ProgressLog {
    /// Opens the log stored at `path`. A missing file is an empty log; nothing is written until the
    /// first entry is recorded.
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            debug!("No progress log at {}, starting empty", path.display());
            return Ok(Self {
                path,
                columns: Vec::new(),
                entries: BTreeMap::new(),
            });
        }
        let content = read_to_string(&path)?;
        Ok(Self::parse(path, &content))
    }

    fn parse(path: PathBuf, content: &str) -> Self {
        let mut lines = content.lines().filter(|l| !l.is_empty());
        let header: Vec<&str> = match lines.next() {
            Some(h) => h.split(FIELD_SEPARATOR).collect(),
            None => Vec::new(),
        };
        let timestamp_column = header.iter().position(|c| *c == TIMESTAMP_COLUMN);
        let columns: Vec<String> = header
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(i, _)| Some(*i) != timestamp_column)
            .map(|(_, c)| String::from(*c))
            .collect();
        let mut entries = BTreeMap::new();
        let Some(timestamp_column) = timestamp_column else {
            if !header.is_empty() {
                warn!(
                    "Progress log {} has no {} column, ignoring its rows",
                    path.display(),
                    TIMESTAMP_COLUMN
                );
            }
            return Self {
                path,
                columns,
                entries,
            };
        };
        for line in lines {
            let cells: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
            let index = cells.first().and_then(|c| c.trim().parse::<usize>().ok());
            let timestamp = cells
                .get(timestamp_column)
                .and_then(|c| NaiveDateTime::parse_from_str(c.trim(), TIMESTAMP_FORMAT).ok());
            let (Some(index), Some(timestamp)) = (index, timestamp) else {
                warn!("Skipping malformed row {:?} of {}", line, path.display());
                continue;
            };
            let metadata = header
                .iter()
                .zip(cells.iter())
                .enumerate()
                .skip(1)
                .filter(|(i, _)| *i != timestamp_column)
                .map(|(_, (column, value))| (String::from(*column), String::from(*value)))
                .collect();
            entries.insert(
                index,
                LogEntry {
                    timestamp,
                    metadata,
                },
            );
        }
        Self {
            path,
            columns,
            entries,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in index order.
    pub fn entries(&self) -> impl Iterator<Item = (usize, &LogEntry)> {
        self.entries.iter().map(|(i, e)| (*i, e))
    }

    pub fn timestamp(&self, index: usize) -> LogStatus {
        match self.entries.get(&index) {
            Some(entry) => LogStatus::Logged(entry.timestamp),
            None => LogStatus::NotLogged,
        }
    }

    /// Records the current time for `index` and persists the log.
    pub fn record_timestamp(&mut self, index: usize, metadata: &[(&str, &str)]) -> Result<NaiveDateTime> {
        let timestamp = now();
        self.record_at(index, timestamp, metadata)?;
        Ok(timestamp)
    }

    /// Upserts the entry of `index`: the timestamp is overwritten and the given metadata values
    /// replace the previous ones column by column. Other entries are kept. The log is persisted
    /// before returning.
    pub fn record_at(
        &mut self,
        index: usize,
        timestamp: NaiveDateTime,
        metadata: &[(&str, &str)],
    ) -> Result<()> {
        for (column, _) in metadata {
            if !self.columns.iter().any(|c| c == column) {
                self.columns.push(String::from(*column));
            }
        }
        let entry = self.entries.entry(index).or_insert_with(|| LogEntry {
            timestamp,
            metadata: BTreeMap::new(),
        });
        entry.timestamp = timestamp;
        for (column, value) in metadata {
            entry
                .metadata
                .insert(String::from(*column), String::from(*value));
        }
        write_atomically(&self.path, &self.render())
    }

    /// First index in `0..total` without an entry. When every index is logged, the answer depends on
    /// `policy`.
    pub fn first_unlogged_index(&self, total: usize, policy: ResumePolicy) -> usize {
        match (0..total).find(|i| !self.entries.contains_key(i)) {
            Some(index) => index,
            None => match policy {
                ResumePolicy::WrapToStart => 0,
                ResumePolicy::StayAtEnd => total.saturating_sub(1),
            },
        }
    }

    fn render(&self) -> String {
        let mut out = String::new();
        out.push(FIELD_SEPARATOR);
        out.push_str(TIMESTAMP_COLUMN);
        for column in &self.columns {
            out.push(FIELD_SEPARATOR);
            out.push_str(column);
        }
        out.push('\n');
        for (index, entry) in &self.entries {
            out.push_str(&index.to_string());
            out.push(FIELD_SEPARATOR);
            out.push_str(&entry.timestamp.format(TIMESTAMP_FORMAT).to_string());
            for column in &self.columns {
                out.push(FIELD_SEPARATOR);
                if let Some(value) = entry.metadata.get(column) {
                    out.push_str(value);
                }
            }
            out.push('\n');
        }
        out
    }
}
