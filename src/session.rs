/*!
An annotation session of one annotator on one dataset. It holds the transient state a presentation
layer needs (loaded samples, current index) and runs every interaction as one synchronous cycle:
validated edit, then persistence, then (when something changed) a progress log entry.
*/
use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::config::ValidatorConfig;
use crate::error::{NerError, Result};
use crate::grammar::TagVocabulary;
use crate::metadata::Metadata;
use crate::paths::validate_annotator;
use crate::progress::{LogStatus, ProgressLog, ResumePolicy};
use crate::sample::Sample;
use crate::store::AnnotationStore;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Outcome of `Session::edit`.
pub struct EditOutcome {
    /// Tags of the edited sample after the edit and its cascade.
    pub tags: Vec<String>,
    /// Whether the persisted file differs from what was on disk before.
    pub changed: bool,
    /// Time recorded in the progress log, when the edit changed something.
    pub logged: Option<NaiveDateTime>,
}

#[derive(Debug)]
pub struct Session {
    store: AnnotationStore,
    dataset: String,
    annotator: String,
    vocabulary: TagVocabulary,
    samples: Vec<Sample>,
    metadata: Metadata,
    log: ProgressLog,
    log_metadata: bool,
    resume_policy: ResumePolicy,
    current: usize,
}

impl Session {
    /// Opens a session on `dataset` for `annotator`. Samples are read from the annotator's prior
    /// output when there is one, else from the original input; a missing input, or a configured
    /// metadata file that does not exist, halts the session. The session starts at the first sample
    /// that was never logged.
    pub fn open(config: &ValidatorConfig, dataset: &str, annotator: &str) -> Result<Self> {
        validate_annotator(annotator)?;
        let vocabulary = config.vocabulary()?;
        let store = AnnotationStore::new(config.paths());
        let samples = store.load(dataset, annotator)?;
        let metadata = match config.metadata_file() {
            Some(path) if !path.exists() => {
                return Err(NerError::MissingFile(path.to_path_buf()))
            }
            Some(path) => Metadata::read(path)?,
            None => Metadata::default(),
        };
        if !metadata.is_empty() && metadata.len() != samples.len() {
            debug!(
                "Metadata has {} rows for {} samples of {}",
                metadata.len(),
                samples.len(),
                dataset
            );
        }
        let log = ProgressLog::open(store.paths().log(dataset, annotator))?;
        let current = log.first_unlogged_index(samples.len(), config.resume_policy());
        info!(
            "Opened {} for {}: {} samples, {} logged, resuming at {}",
            dataset,
            annotator,
            samples.len(),
            log.len(),
            current
        );
        Ok(Self {
            store,
            dataset: String::from(dataset),
            annotator: String::from(annotator),
            vocabulary,
            samples,
            metadata,
            log,
            log_metadata: config.log_metadata(),
            resume_policy: config.resume_policy(),
            current,
        })
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }
    pub fn annotator(&self) -> &str {
        &self.annotator
    }
    pub fn vocabulary(&self) -> &TagVocabulary {
        &self.vocabulary
    }
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }
    pub fn sample(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }
    pub fn len(&self) -> usize {
        self.samples.len()
    }
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
    pub fn current(&self) -> usize {
        self.current
    }
    pub fn current_sample(&self) -> Option<&Sample> {
        self.samples.get(self.current)
    }

    /// Where a fresh session on the same files would start.
    pub fn resume_index(&self) -> usize {
        self.log
            .first_unlogged_index(self.samples.len(), self.resume_policy)
    }

    /// Tags selectable at `position` of the current sample.
    pub fn legal_tags(&self, position: usize) -> Vec<String> {
        match self.current_sample() {
            Some(sample) => self.vocabulary.legal_tags(&sample.tags(), position),
            None => self.vocabulary.default_tags(),
        }
    }

    pub fn timestamp(&self, index: usize) -> LogStatus {
        self.log.timestamp(index)
    }

    /// Sets the tag at `position` of the current sample, persists every sample, and logs the
    /// current index if the persisted file changed. A tag that the grammar does not offer at this
    /// position is rejected, unless it is already the tag in place.
    pub fn edit(&mut self, position: usize, tag: &str) -> Result<EditOutcome> {
        let index = self.current;
        let len = self.samples.len();
        let sample = self
            .samples
            .get(index)
            .ok_or(NerError::OutOfRange { position: index, len })?;
        let tags = sample.tags();
        if position >= tags.len() {
            return Err(NerError::OutOfRange {
                position,
                len: tags.len(),
            });
        }
        if tags[position] != tag && !self.vocabulary.is_legal(&tags, position, tag) {
            return Err(NerError::IllegalTag {
                position,
                tag: String::from(tag),
            });
        }
        let previous = self.samples[index].clone();
        self.samples[index].apply_edit(position, tag)?;
        let changed = match self
            .store
            .persist(&self.dataset, &self.annotator, &self.samples)
        {
            Ok(changed) => changed,
            Err(e) => {
                self.samples[index] = previous;
                return Err(e);
            }
        };
        let logged = if changed {
            Some(self.record(index)?)
        } else {
            None
        };
        let tags = self.samples[index]
            .tags()
            .into_iter()
            .map(String::from)
            .collect();
        Ok(EditOutcome {
            tags,
            changed,
            logged,
        })
    }

    /// Marks the current sample as reviewed: persists and logs it whether or not anything changed.
    pub fn approve(&mut self) -> Result<NaiveDateTime> {
        let index = self.current;
        if index >= self.samples.len() {
            return Err(NerError::OutOfRange {
                position: index,
                len: self.samples.len(),
            });
        }
        self.store
            .persist(&self.dataset, &self.annotator, &self.samples)?;
        self.record(index)
    }

    /// Moves to the next sample, staying on the last one.
    pub fn next(&mut self) -> usize {
        if self.current + 1 < self.samples.len() {
            self.current += 1;
        }
        self.current
    }

    /// Moves to the previous sample, staying on the first one.
    pub fn prev(&mut self) -> usize {
        self.current = self.current.saturating_sub(1);
        self.current
    }

    pub fn jump(&mut self, index: usize) -> Result<usize> {
        if index >= self.samples.len() {
            return Err(NerError::OutOfRange {
                position: index,
                len: self.samples.len(),
            });
        }
        self.current = index;
        Ok(index)
    }

    fn record(&mut self, index: usize) -> Result<NaiveDateTime> {
        let metadata = match (self.log_metadata, self.metadata.row(index)) {
            (true, Some(row)) => row,
            _ => Vec::new(),
        };
        let timestamp = self.log.record_timestamp(index, &metadata)?;
        debug!(
            "Logged sample {} of {} for {}",
            index, self.dataset, self.annotator
        );
        Ok(timestamp)
    }
}
