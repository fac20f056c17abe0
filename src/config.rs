/*
 * This modules contains the configuration of a validation project. Most importantly, it contains
 * the `ValidatorConfig` struct, which implements the default trait and can be read from a TOML
 * file. A `ValidatorConfigBuilder` is provided to build and customize it from code.
*/
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use crate::aggregate::{INDEX_COLUMN, SUBSET_COLUMN};
use crate::error::{NerError, Result};
use crate::grammar::TagVocabulary;
use crate::paths::AnnotationPaths;
use crate::progress::ResumePolicy;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
/// Configuration of a validation project. It implements the default trait.
pub struct ValidatorConfig {
    /// Entity classes of the tag vocabulary, such as `PER` or `LOC`. The tags offered to the
    /// annotator are `O`, `B-<Class>` and, where legal, `I-<Class>`.
    pub(crate) classes: Vec<String>,
    /// Directory holding the original input files. They are never written.
    pub(crate) input_dir: PathBuf,
    /// Directory receiving the per-annotator output files.
    pub(crate) output_dir: PathBuf,
    /// Directory receiving the per-annotator progress logs.
    pub(crate) log_dir: PathBuf,
    /// Optional metadata file, one row per sample.
    pub(crate) metadata_file: Option<PathBuf>,
    /// Where to resume once every sample has been logged.
    pub(crate) resume_policy: ResumePolicy,
    /// Copy the metadata row of a sample into the progress log when it is logged.
    pub(crate) log_metadata: bool,
    /// Columns identifying a sample across annotators when pivoting the aggregated annotations.
    pub(crate) identity_columns: Vec<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            classes: vec![String::from("PER"), String::from("LOC")],
            input_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("data/output"),
            log_dir: PathBuf::from("logs"),
            metadata_file: None,
            resume_policy: ResumePolicy::WrapToStart,
            log_metadata: true,
            identity_columns: vec![String::from(SUBSET_COLUMN), String::from(INDEX_COLUMN)],
        }
    }
}

impl ValidatorConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| NerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(NerError::MissingFile(path.to_path_buf()));
        }
        Self::from_toml_str(&read_to_string(path)?)
    }

    fn validate(&self) -> Result<()> {
        if self.classes.is_empty() {
            return Err(NerError::Config(String::from(
                "at least one entity class is required",
            )));
        }
        self.vocabulary()?;
        if self.identity_columns.is_empty() {
            return Err(NerError::Config(String::from(
                "at least one identity column is required",
            )));
        }
        Ok(())
    }

    pub fn vocabulary(&self) -> Result<TagVocabulary> {
        Ok(TagVocabulary::new(self.classes.iter().cloned())?)
    }

    pub fn paths(&self) -> AnnotationPaths {
        AnnotationPaths::new(&self.input_dir, &self.output_dir, &self.log_dir)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
    pub fn metadata_file(&self) -> Option<&Path> {
        self.metadata_file.as_deref()
    }
    pub fn resume_policy(&self) -> ResumePolicy {
        self.resume_policy
    }
    pub fn log_metadata(&self) -> bool {
        self.log_metadata
    }
    pub fn identity_columns(&self) -> &[String] {
        &self.identity_columns
    }
}

impl Display for ValidatorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let string = format!("Entity classes: {:?}\n Input directory: {}\n Output directory: {}\n Log directory: {}\n Metadata file: {:?}\n Resume policy: {:?}\n Copying metadata into the log: {}\n Identity columns: {:?}", self.classes, self.input_dir.display(), self.output_dir.display(), self.log_dir.display(), self.metadata_file, self.resume_policy, self.log_metadata, self.identity_columns);
        write!(f, "{}", string)
    }
}

/// This builder can be used to build and customize a `ValidatorConfig` stucture.
#[derive(Clone, Debug, Default)]
pub struct ValidatorConfigBuilder {
    config: ValidatorConfig,
}

impl ValidatorConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.classes = classes.into_iter().map(Into::into).collect();
        self
    }
    pub fn input_dir(mut self, input_dir: impl Into<PathBuf>) -> Self {
        self.config.input_dir = input_dir.into();
        self
    }
    pub fn output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = output_dir.into();
        self
    }
    pub fn log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.config.log_dir = log_dir.into();
        self
    }
    pub fn metadata_file(mut self, metadata_file: impl Into<PathBuf>) -> Self {
        self.config.metadata_file = Some(metadata_file.into());
        self
    }
    pub fn resume_policy(mut self, resume_policy: ResumePolicy) -> Self {
        self.config.resume_policy = resume_policy;
        self
    }
    pub fn log_metadata(mut self, log_metadata: bool) -> Self {
        self.config.log_metadata = log_metadata;
        self
    }
    pub fn identity_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.identity_columns = columns.into_iter().map(Into::into).collect();
        self
    }
    pub fn build(self) -> Result<ValidatorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
