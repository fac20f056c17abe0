/*!
The annotation store writes edited tags back onto an annotator's output file. It is the only writer
of those files. The source it reconciles against is resolved by `AnnotationPaths::resolve_source`:
the annotator's prior output when it exists, the original input otherwise.
*/
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::paths::{validate_annotator, AnnotationPaths, SourceFile};
use crate::sample::{read_samples, Row, Sample, FIELD_SEPARATOR};

#[derive(Debug, Clone)]
pub struct AnnotationStore {
    paths: AnnotationPaths,
}

/// Result of reconciling a source file with in-memory samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Reconciled {
    pub(crate) content: String,
    pub(crate) changed: bool,
    /// Lines whose token could not be found in the expected sample.
    pub(crate) desynced: usize,
}

impl AnnotationStore {
    pub fn new(paths: AnnotationPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &AnnotationPaths {
        &self.paths
    }

    /// Loads the samples of `dataset` as `annotator` last left them.
    pub fn load(&self, dataset: &str, annotator: &str) -> Result<Vec<Sample>> {
        validate_annotator(annotator)?;
        let source = self.paths.resolve_source(dataset, annotator)?;
        debug!(
            "Loading {} for {} from {}",
            dataset,
            annotator,
            source.path().display()
        );
        read_samples(source.path())
    }

    /// Rewrites the annotator's output file with the tags of `samples`, keeping the line structure
    /// of the source file. Returns whether any line differs from the source.
    pub fn persist(&self, dataset: &str, annotator: &str, samples: &[Sample]) -> Result<bool> {
        validate_annotator(annotator)?;
        let source = self.paths.resolve_source(dataset, annotator)?;
        let original = fs::read_to_string(source.path())?;
        let reconciled = reconcile(&original, samples);
        if reconciled.desynced > 0 {
            warn!(
                "{} line(s) of {} could not be matched to the samples of {}; they were kept unchanged",
                reconciled.desynced,
                source.path().display(),
                annotator
            );
        }
        let output = self.paths.output(dataset, annotator);
        write_atomically(&output, &reconciled.content)?;
        if let SourceFile::Original(_) = source {
            info!("Created {} for {}", output.display(), annotator);
        }
        debug!(
            "Persisted {} for {} (changed: {})",
            dataset, annotator, reconciled.changed
        );
        Ok(reconciled.changed)
    }
}

/// Writes to a sibling temporary file, then renames it over `path`.
pub(crate) fn write_atomically(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Replays `source` line by line. Separator lines are written through and close the current
/// sample; other lines get the current tag of their token within the sample under the cursor.
/// Lines past the last sample, and lines whose token is not in the expected sample, are written
/// through unchanged.
pub(crate) fn reconcile(source: &str, samples: &[Sample]) -> Reconciled {
    let mut content = String::with_capacity(source.len());
    let mut changed = false;
    let mut desynced = 0;
    let mut cursor = 0;
    let mut offset = 0;
    for raw in source.split_inclusive('\n') {
        let (line, terminator) = split_terminator(raw);
        let row = Row::parse_line(line);
        if row.is_separator() {
            if offset > 0 {
                cursor += 1;
                offset = 0;
            }
            content.push_str(raw);
            continue;
        }
        let tag = samples
            .get(cursor)
            .map(|sample| sample.tag_near(&row.token, offset));
        offset += 1;
        match tag {
            Some(Some(tag)) => {
                let rewritten = format!("{}{}{}", row.token, FIELD_SEPARATOR, tag);
                if rewritten != line {
                    changed = true;
                }
                content.push_str(&rewritten);
                content.push_str(terminator);
            }
            Some(None) => {
                desynced += 1;
                debug!(
                    "Token {:?} not found in sample {}; line kept as is",
                    row.token, cursor
                );
                content.push_str(raw);
            }
            None => content.push_str(raw),
        }
    }
    Reconciled {
        content,
        changed,
        desynced,
    }
}

fn split_terminator(raw: &str) -> (&str, &str) {
    if let Some(line) = raw.strip_suffix("\r\n") {
        (line, "\r\n")
    } else if let Some(line) = raw.strip_suffix('\n') {
        (line, "\n")
    } else {
        (raw, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::parse_samples;

    const SOURCE: &str = "Madonna\tO\nLike\tB-WoA\na\tI-WoA\nVirgin\tI-WoA\n\nHello\tO\n";

    #[test]
    fn test_reconcile_unchanged() {
        let samples = parse_samples(SOURCE);
        let actual = reconcile(SOURCE, &samples);
        assert_eq!(actual.content, SOURCE);
        assert!(!actual.changed);
        assert_eq!(actual.desynced, 0);
    }

    #[test]
    fn test_reconcile_edit() {
        let mut samples = parse_samples(SOURCE);
        samples[0].apply_edit(1, "O").unwrap();
        let actual = reconcile(SOURCE, &samples);
        assert!(actual.changed);
        assert_eq!(
            actual.content,
            "Madonna\tO\nLike\tO\na\tB-WoA\nVirgin\tI-WoA\n\nHello\tO\n"
        );
    }

    #[test]
    fn test_reconcile_keeps_line_structure() {
        let source = "\n\nA\tO\r\nB\tO\n\n\n\nC\tO";
        let mut samples = parse_samples(source);
        assert_eq!(samples.len(), 2);
        samples[1].apply_edit(0, "B-PER").unwrap();
        let actual = reconcile(source, &samples);
        assert_eq!(actual.content, "\n\nA\tO\r\nB\tO\n\n\n\nC\tB-PER");
        assert!(actual.changed);
    }

    #[test]
    fn test_reconcile_missing_tag_field_is_a_change() {
        let source = "A\nB\tO\n";
        let mut samples = parse_samples(source);
        samples[0].apply_edit(0, "O").unwrap();
        let actual = reconcile(source, &samples);
        assert_eq!(actual.content, "A\tO\nB\tO\n");
        assert!(actual.changed);
    }

    #[test]
    fn test_reconcile_desync_keeps_line() {
        let samples = parse_samples("Madonna\tB-PER\n");
        let actual = reconcile("Prince\tO\nMadonna\tO\n", &samples);
        assert_eq!(actual.content, "Prince\tO\nMadonna\tB-PER\n");
        assert_eq!(actual.desynced, 1);
        assert!(actual.changed);
    }

    #[test]
    fn test_reconcile_more_lines_than_samples() {
        let samples = parse_samples("A\tB-PER\n");
        let actual = reconcile("A\tO\n\nB\tO\n", &samples);
        assert_eq!(actual.content, "A\tB-PER\n\nB\tO\n");
        assert_eq!(actual.desynced, 0);
    }

    #[test]
    fn test_persist_twice_reports_no_change() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AnnotationPaths::new(dir.path(), dir.path().join("out"), dir.path().join("logs"));
        fs::write(paths.input("songs.IOB"), SOURCE).unwrap();
        let store = AnnotationStore::new(paths.clone());
        let mut samples = store.load("songs.IOB", "alice").unwrap();
        samples[0].apply_edit(1, "O").unwrap();
        assert!(store.persist("songs.IOB", "alice", &samples).unwrap());
        assert!(!store.persist("songs.IOB", "alice", &samples).unwrap());
        assert_eq!(fs::read_to_string(paths.input("songs.IOB")).unwrap(), SOURCE);
        let reloaded = store.load("songs.IOB", "alice").unwrap();
        assert_eq!(reloaded, samples);
        assert!(!paths.output("songs.IOB", "bob").exists());
    }
}
