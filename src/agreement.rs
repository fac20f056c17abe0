/*!
Inter-annotator agreement. For every pair of annotators, the tags of the samples both of them
annotated are compared position by position with Cohen's kappa, once on the full tags (strict) and
once on the tags with their class stripped and `B`/`I` merged (position-only).
*/
use ahash::AHashMap;
use itertools::Itertools;
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use tracing::{debug, warn};

use crate::aggregate::WideTable;
use crate::datastructure::FlatSequences;
use crate::grammar::position_label;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Agreement between two annotators. Kappa values are `NaN` when undefined, e.g. when both
/// annotators used one single tag throughout.
pub struct PairwiseAgreement {
    pub annotator_a: String,
    pub annotator_b: String,
    /// Samples annotated by both and compared.
    pub joint_samples: usize,
    /// Samples annotated by both whose lengths differ; they are left out of the scores.
    pub skipped_samples: usize,
    /// Compared samples on which both annotators gave exactly the same tags.
    pub identical_samples: usize,
    pub strict_kappa: f64,
    pub position_kappa: f64,
}

impl Display for PairwiseAgreement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}, {}",
            self.annotator_a,
            self.annotator_b,
            self.joint_samples,
            self.strict_kappa,
            self.position_kappa
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Agreement of every pair of annotators sharing at least one sample. Displayed as a comma
/// separated table.
pub struct AgreementReport {
    pairs: Vec<PairwiseAgreement>,
}

impl AgreementReport {
    pub fn pairs(&self) -> &[PairwiseAgreement] {
        &self.pairs
    }

    /// Agreement of two annotators, in any order.
    pub fn get(&self, a: &str, b: &str) -> Option<&PairwiseAgreement> {
        self.pairs.iter().find(|p| {
            (p.annotator_a == a && p.annotator_b == b) || (p.annotator_a == b && p.annotator_b == a)
        })
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl Display for AgreementReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Annotator A, Annotator B, Samples, Strict kappa, Position kappa"
        )?;
        for pair in self.pairs.iter() {
            writeln!(f, "{}", pair)?
        }
        Ok(())
    }
}

/// Cohen's kappa of two labelings of the same items, given as `(label_a, label_b)` pairs. Returns
/// `NaN` when there is no item or when the expected agreement is 1.
pub fn cohen_kappa<'a, I>(labels: I) -> f64
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut ids: AHashMap<&str, usize> = AHashMap::new();
    let mut pairs = Vec::new();
    for (a, b) in labels {
        let next = ids.len();
        let a = *ids.entry(a).or_insert(next);
        let next = ids.len();
        let b = *ids.entry(b).or_insert(next);
        pairs.push((a, b));
    }
    if pairs.is_empty() {
        return f64::NAN;
    }
    let k = ids.len();
    let mut confusion = Array2::<f64>::zeros((k, k));
    for (a, b) in pairs.iter() {
        confusion[[*a, *b]] += 1.0;
    }
    let total = pairs.len() as f64;
    let observed = confusion.diag().sum() / total;
    let marginals_a = confusion.sum_axis(Axis(1));
    let marginals_b = confusion.sum_axis(Axis(0));
    let expected = marginals_a.dot(&marginals_b) / (total * total);
    if (1.0 - expected).abs() <= f64::EPSILON {
        return f64::NAN;
    }
    (observed - expected) / (1.0 - expected)
}

/// Computes the agreement of every unordered pair of annotators of `wide`. Only samples annotated by
/// both annotators of a pair count for that pair; pairs without any shared sample are not reported.
pub fn compute_agreement(wide: &WideTable) -> AgreementReport {
    let annotators = wide.annotators();
    let mut pairs = Vec::new();
    for (a, b) in annotators.iter().copied().tuple_combinations() {
        let mut tags_a: Vec<Vec<&str>> = Vec::new();
        let mut tags_b: Vec<Vec<&str>> = Vec::new();
        let mut skipped = 0;
        for row in wide.rows() {
            let (Some(ann_a), Some(ann_b)) = (row.annotations.get(a), row.annotations.get(b))
            else {
                continue;
            };
            if ann_a.tags.len() != ann_b.tags.len() {
                warn!(
                    "{} and {} disagree on the length of sample {:?}, leaving it out",
                    a, b, row.identity
                );
                skipped += 1;
                continue;
            }
            tags_a.push(ann_a.tags.iter().map(String::as_str).collect());
            tags_b.push(ann_b.tags.iter().map(String::as_str).collect());
        }
        let flat_a = FlatSequences::new(tags_a);
        let flat_b = FlatSequences::new(tags_b);
        let joint_samples = flat_a.num_sequences();
        if joint_samples == 0 && skipped == 0 {
            continue;
        }
        if flat_a.is_empty() {
            debug!("{} and {} share no comparable sample", a, b);
        } else {
            debug!(
                "Comparing {} and {} on {} positions over {} samples",
                a,
                b,
                flat_a.len(),
                joint_samples
            );
        }
        let identical_samples = flat_a
            .iter_vec()
            .zip(flat_b.iter_vec())
            .filter(|(x, y)| x == y)
            .count();
        let strict_kappa = cohen_kappa(flat_a.iter().copied().zip(flat_b.iter().copied()));
        let position_kappa = cohen_kappa(
            flat_a
                .iter()
                .map(|t| position_label(t))
                .zip(flat_b.iter().map(|t| position_label(t))),
        );
        pairs.push(PairwiseAgreement {
            annotator_a: String::from(a),
            annotator_b: String::from(b),
            joint_samples,
            skipped_samples: skipped,
            identical_samples,
            strict_kappa,
            position_kappa,
        });
    }
    AgreementReport { pairs }
}
