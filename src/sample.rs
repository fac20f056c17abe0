/*!
Sample model. An IOB file is a flat stream of `token<TAB>tag` rows; blank rows separate samples.
*/
use serde::{Deserialize, Serialize};
use std::fs::read_to_string;
use std::path::Path;

use crate::error::{NerError, Result};
use crate::grammar;

/// Field separator of IOB files.
pub const FIELD_SEPARATOR: char = '\t';

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// A single row of an IOB file. A row with an empty token is a sample separator.
pub struct Row {
    pub token: String,
    pub tag: String,
}

impl Row {
    pub fn new(token: impl Into<String>, tag: impl Into<String>) -> Self {
        Row {
            token: token.into(),
            tag: tag.into(),
        }
    }

    pub fn separator() -> Self {
        Row::new("", "")
    }

    pub fn is_separator(&self) -> bool {
        self.token.is_empty()
    }

    /// Parses one line (without its line terminator). Missing tag fields are read as empty tags.
    pub fn parse_line(line: &str) -> Self {
        match line.split_once(FIELD_SEPARATOR) {
            Some((token, tag)) => Row::new(token, tag),
            None => Row::new(line, ""),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
/// One sentence or utterance to annotate: an ordered list of (token, tag) pairs.
pub struct Sample {
    rows: Vec<Row>,
}

impl Sample {
    pub fn new(rows: Vec<Row>) -> Self {
        Sample { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn tokens(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.token.as_str()).collect()
    }

    pub fn tags(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.tag.as_str()).collect()
    }

    /// Tag of the first row holding exactly `token`.
    pub fn tag_of(&self, token: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|r| r.token == token)
            .map(|r| r.tag.as_str())
    }

    /// Tag of `token`, preferring the row at `offset` when it holds that token. Falls back to the
    /// first row holding the token, so repeated tokens keep their own tags while the file and the
    /// sample agree, and drift is still tolerated when they do not.
    pub(crate) fn tag_near(&self, token: &str, offset: usize) -> Option<&str> {
        match self.rows.get(offset) {
            Some(row) if row.token == token => Some(row.tag.as_str()),
            _ => self.tag_of(token),
        }
    }

    /// Edits the tag at `position`, with the grammar's cascade onto the next position.
    pub fn apply_edit(&mut self, position: usize, new_tag: &str) -> Result<()> {
        let mut tags: Vec<String> = self.rows.iter().map(|r| r.tag.clone()).collect();
        grammar::apply_edit(&mut tags, position, new_tag)?;
        self.set_tags(tags)
    }

    /// Replaces every tag of the sample. `tags` must have one tag per row.
    pub fn set_tags<I, S>(&mut self, tags: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        if tags.len() != self.rows.len() {
            return Err(NerError::OutOfRange {
                position: tags.len(),
                len: self.rows.len(),
            });
        }
        for (row, tag) in self.rows.iter_mut().zip(tags) {
            row.tag = tag;
        }
        Ok(())
    }
}

/// Splits a flat list of rows into samples. A separator closes the current sample; a trailing
/// sample without a final separator is kept, and consecutive separators produce no empty sample.
pub fn split_into_samples<I>(rows: I) -> Vec<Sample>
where
    I: IntoIterator<Item = Row>,
{
    let mut samples = Vec::new();
    let mut current: Vec<Row> = Vec::new();
    for row in rows {
        if row.is_separator() {
            if !current.is_empty() {
                samples.push(Sample::new(std::mem::take(&mut current)));
            }
        } else {
            current.push(row);
        }
    }
    if !current.is_empty() {
        samples.push(Sample::new(current));
    }
    samples
}

/// Inverse of `split_into_samples`: rows of every sample with one separator between samples.
pub fn flatten(samples: &[Sample]) -> Vec<Row> {
    let mut rows = Vec::with_capacity(samples.iter().map(|s| s.len() + 1).sum());
    for (i, sample) in samples.iter().enumerate() {
        if i > 0 {
            rows.push(Row::separator());
        }
        rows.extend(sample.rows().iter().cloned());
    }
    rows
}

pub fn parse_rows(content: &str) -> Vec<Row> {
    content.lines().map(Row::parse_line).collect()
}

pub fn parse_samples(content: &str) -> Vec<Sample> {
    split_into_samples(parse_rows(content))
}

/// Reads the samples of an IOB file. A missing file is reported as `MissingFile`.
pub fn read_samples<P: AsRef<Path>>(path: P) -> Result<Vec<Sample>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(NerError::MissingFile(path.to_path_buf()));
    }
    let content = read_to_string(path)?;
    Ok(parse_samples(&content))
}
