/*!
Human validation of IOB named entity annotations. Annotators review tokenized samples one at a
time, correct their tags, and every correction is written back to a per-annotator copy of the
dataset. A per-annotator progress log remembers which samples were reviewed and when, so that an
interrupted session resumes where it stopped. Once several annotators are done, their work is
aggregated into one table and their agreement is measured with Cohen's kappa.

# Files
* Input files contain one `token<TAB>tag` row per line. Samples are separated by a blank line.
    Input files are never written.
* Output files live under the output directory and are named `<stem>_<annotator>.IOB`, where
    `stem` is the input file name without its extension. They keep the exact line structure of
    the input.
* Progress logs live under the log directory and are named `<stem>_<annotator>.log`. They are tab
    separated tables with one row per reviewed sample: the sample index, its timestamp, and
    optionally a copy of the sample's metadata.

# Tags
Tags follow the IOB2 convention: `O` is outside any entity, `B-<Class>` begins an entity and
`I-<Class>` continues it. `I-<Class>` is only offered right after a `B-<Class>` or `I-<Class>`.
Setting a tag to `O` right before an `I-<Class>` turns that tag into `B-<Class>`, so that the
entity that followed keeps a beginning.

# Terminology
* A class is an entity type, such as `PER` or `WoA`.
* A sample is a sequence of rows between two blank lines.
* An annotator is the person reviewing a dataset. The name is part of file names and may not
    contain `_`.
*/

mod aggregate;
mod agreement;
mod config;
mod datastructure;
mod error;
mod grammar;
mod metadata;
mod paths;
mod progress;
mod sample;
mod session;
mod store;

// The public api starts here
pub use error::{AggregationError, NerError, Result};

pub use grammar::{
    apply_edit, edited, first_dangling, position_label, Marker, Tag, TagParseError, TagVocabulary,
};

pub use sample::{flatten, parse_samples, read_samples, split_into_samples, Row, Sample};

pub use paths::{AnnotationPaths, SourceFile};

pub use store::AnnotationStore;

pub use metadata::Metadata;

pub use progress::{LogEntry, LogStatus, ProgressLog, ResumePolicy};

pub use aggregate::{
    collect_annotations, pivot, Annotation, CombinedRow, CombinedTable, WideRow, WideTable,
    ANNOTATOR_COLUMN, INDEX_COLUMN, SUBSET_COLUMN,
};

pub use agreement::{cohen_kappa, compute_agreement, AgreementReport, PairwiseAgreement};

pub use config::{ValidatorConfig, ValidatorConfigBuilder};

pub use session::{EditOutcome, Session};

/// Main entrypoint of the aggregation side of the library. Collects every annotator's output
/// under `output_dir`, pivots it on `identity_columns` and computes the pairwise agreement of the
/// annotators.
pub fn aggregate_and_compare<P, Q, S>(
    output_dir: P,
    log_dir: Q,
    identity_columns: &[S],
) -> Result<(WideTable, AgreementReport)>
where
    P: AsRef<std::path::Path>,
    Q: AsRef<std::path::Path>,
    S: AsRef<str>,
{
    let combined = collect_annotations(output_dir, log_dir)?;
    let wide = pivot(&combined, identity_columns, ANNOTATOR_COLUMN)?;
    let report = compute_agreement(&wide);
    Ok((wide, report))
}
