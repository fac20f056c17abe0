/*!
Path resolution for datasets, annotator outputs and progress logs. Every file name used by the
store, the progress log and the aggregation batch is derived here.
*/
use std::path::{Path, PathBuf};

use crate::error::{NerError, Result};

/// Extension of annotated output files.
pub const OUTPUT_EXTENSION: &str = "IOB";
/// Extension of progress log files.
pub const LOG_EXTENSION: &str = "log";
/// Separator between the dataset stem and the annotator in derived file names.
pub const ANNOTATOR_SEPARATOR: char = '_';

/// Dataset name without its `.IOB` extension (case insensitive). Other names are kept as is.
pub fn dataset_stem(dataset: &str) -> &str {
    match dataset.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.eq_ignore_ascii_case(OUTPUT_EXTENSION) => {
            stem
        }
        _ => dataset,
    }
}

/// Annotator identifiers end up in file names, after the last `_`.
pub fn validate_annotator(annotator: &str) -> Result<()> {
    let invalid = annotator.is_empty()
        || annotator.contains(ANNOTATOR_SEPARATOR)
        || annotator.contains('/')
        || annotator.contains('\\');
    if invalid {
        return Err(NerError::InvalidAnnotator(String::from(annotator)));
    }
    Ok(())
}

/// Splits a log file name (`<dataset>_<annotator>.log`) into its dataset stem and annotator. The
/// annotator is everything after the last `_`.
pub fn parse_log_file_name(file_name: &str) -> Option<(String, String)> {
    let base = file_name.strip_suffix(&format!(".{}", LOG_EXTENSION))?;
    let (dataset, annotator) = base.rsplit_once(ANNOTATOR_SEPARATOR)?;
    let dataset = dataset_stem(dataset);
    if dataset.is_empty() || annotator.is_empty() {
        return None;
    }
    Some((String::from(dataset), String::from(annotator)))
}

fn derived_file_name(dataset: &str, annotator: &str, extension: &str) -> String {
    format!(
        "{}{}{}.{}",
        dataset_stem(dataset),
        ANNOTATOR_SEPARATOR,
        annotator,
        extension
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// The file a session reads its samples from.
pub enum SourceFile {
    /// The annotator's own prior output.
    Annotated(PathBuf),
    /// The original, never modified, input file.
    Original(PathBuf),
}

impl SourceFile {
    pub fn path(&self) -> &Path {
        match self {
            SourceFile::Annotated(p) | SourceFile::Original(p) => p,
        }
    }

    pub fn is_annotated(&self) -> bool {
        matches!(self, SourceFile::Annotated(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Directories holding the inputs, the per-annotator outputs and the progress logs.
pub struct AnnotationPaths {
    input_dir: PathBuf,
    output_dir: PathBuf,
    log_dir: PathBuf,
}

impl AnnotationPaths {
    pub fn new(
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        log_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            log_dir: log_dir.into(),
        }
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// The original input file of `dataset`. It is only ever read.
    pub fn input(&self, dataset: &str) -> PathBuf {
        self.input_dir.join(dataset)
    }

    /// `<output_dir>/<stem>_<annotator>.IOB`
    pub fn output(&self, dataset: &str, annotator: &str) -> PathBuf {
        self.output_dir
            .join(derived_file_name(dataset, annotator, OUTPUT_EXTENSION))
    }

    /// `<log_dir>/<stem>_<annotator>.log`
    pub fn log(&self, dataset: &str, annotator: &str) -> PathBuf {
        self.log_dir
            .join(derived_file_name(dataset, annotator, LOG_EXTENSION))
    }

    /// The annotator's prior output wins over the original input. Fails with `MissingFile` when
    /// neither exists.
    pub fn resolve_source(&self, dataset: &str, annotator: &str) -> Result<SourceFile> {
        let output = self.output(dataset, annotator);
        if output.is_file() {
            return Ok(SourceFile::Annotated(output));
        }
        let input = self.input(dataset);
        if input.is_file() {
            return Ok(SourceFile::Original(input));
        }
        Err(NerError::MissingFile(input))
    }
}
