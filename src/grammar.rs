/*!
This module holds the IOB tag grammar used by the editor. It decides which tags can be offered at a
given position of a sequence and how clearing a tag cascades onto the next position.

Tags are written `O`, `B-<Class>` or `I-<Class>`. An `I-<Class>` tag is only well formed when the
tag right before it is a `B-` or `I-` tag of the same class.
*/
use enum_iterator::Sequence;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

use crate::error::{NerError, Result};

/// Character separating the marker from the entity class, as in `B-PER`.
pub const DELIMITER: char = '-';

/// Tag given to tokens outside of any entity.
pub const OUTSIDE: &str = "O";

const BEGIN_PREFIX: &str = "B-";
const INSIDE_PREFIX: &str = "I-";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Could not parse a string into a `Tag`.
pub enum TagParseError {
    #[error("received an empty tag")]
    Empty,
    #[error("could not parse `{0}` into an IOB marker")]
    Marker(String),
    #[error("tag `{0}` is missing its entity class")]
    MissingClass(String),
    #[error("`{0}` is not a valid entity class name")]
    InvalidClass(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Sequence, Serialize, Deserialize)]
/// The IOB marker of a tag, without its class.
pub enum Marker {
    O,
    B,
    I,
}

impl TryFrom<char> for Marker {
    type Error = TagParseError;
    fn try_from(value: char) -> std::result::Result<Self, Self::Error> {
        match value {
            'O' => Ok(Self::O),
            'B' => Ok(Self::B),
            'I' => Ok(Self::I),
            _ => Err(TagParseError::Marker(String::from(value))),
        }
    }
}

impl Marker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Marker::O => "O",
            Marker::B => "B",
            Marker::I => "I",
        }
    }

    /// `B` and `I` both mark a token covered by an entity.
    pub fn is_entity(&self) -> bool {
        !matches!(self, Marker::O)
    }
}

impl Display for Marker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// A parsed tag, such as `B-PER`. The `O` tag is the only one without a class.
pub struct Tag {
    marker: Marker,
    class: Option<String>,
}

impl Tag {
    pub fn outside() -> Self {
        Tag {
            marker: Marker::O,
            class: None,
        }
    }
    pub fn begin(class: impl Into<String>) -> Self {
        Tag {
            marker: Marker::B,
            class: Some(class.into()),
        }
    }
    pub fn inside(class: impl Into<String>) -> Self {
        Tag {
            marker: Marker::I,
            class: Some(class.into()),
        }
    }
    pub fn marker(&self) -> Marker {
        self.marker
    }
    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }
}

impl FromStr for Tag {
    type Err = TagParseError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut chars = s.chars();
        let marker = match chars.next() {
            None => return Err(TagParseError::Empty),
            Some(c) => Marker::try_from(c).map_err(|_| TagParseError::Marker(String::from(s)))?,
        };
        let rest = chars.as_str();
        match marker {
            Marker::O if rest.is_empty() => Ok(Tag::outside()),
            Marker::O => Err(TagParseError::Marker(String::from(s))),
            _ => match rest.strip_prefix(DELIMITER) {
                Some(class) if !class.is_empty() => Ok(Tag {
                    marker,
                    class: Some(String::from(class)),
                }),
                _ => Err(TagParseError::MissingClass(String::from(s))),
            },
        }
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.class {
            Some(class) => write!(f, "{}{}{}", self.marker, DELIMITER, class),
            None => write!(f, "{}", self.marker),
        }
    }
}

/// Returns the class continued by `tag` when it opens or continues an entity (`B-X` or `I-X`).
fn entity_class(tag: &str) -> Option<&str> {
    tag.strip_prefix(BEGIN_PREFIX)
        .or_else(|| tag.strip_prefix(INSIDE_PREFIX))
        .filter(|class| !class.is_empty())
}

/// Label of `tag` once its class is stripped and `B`/`I` are merged. Used by the position-only
/// agreement score.
pub fn position_label(tag: &str) -> &str {
    match entity_class(tag) {
        Some(_) => "B/I",
        None => tag,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// The fixed set of entity classes configured for a dataset.
pub struct TagVocabulary {
    classes: Vec<String>,
}

impl TagVocabulary {
    /// Builds a vocabulary from class names. Class names must be non-empty and contain neither
    /// whitespace nor the `-` delimiter.
    pub fn new<I, S>(classes: I) -> std::result::Result<Self, TagParseError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut checked: Vec<String> = Vec::new();
        for class in classes.into_iter().map(Into::into) {
            let invalid = class.is_empty()
                || class.contains(DELIMITER)
                || class.chars().any(char::is_whitespace);
            if invalid {
                return Err(TagParseError::InvalidClass(class));
            }
            if !checked.contains(&class) {
                checked.push(class);
            }
        }
        Ok(Self { classes: checked })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Tags always offered: `O` followed by `B-<Class>` for every class, in configured order.
    pub fn default_tags(&self) -> Vec<String> {
        let mut tags = Vec::with_capacity(self.classes.len() + 2);
        tags.push(String::from(OUTSIDE));
        tags.extend(self.classes.iter().map(|c| Tag::begin(c.as_str()).to_string()));
        tags
    }

    /// Tags that can be selected at `position`. On top of the default tags, `I-<Class>` is offered
    /// when the previous tag is `B-<Class>` or `I-<Class>`.
    pub fn legal_tags<S: AsRef<str>>(&self, sequence: &[S], position: usize) -> Vec<String> {
        let mut tags = self.default_tags();
        let previous = position
            .checked_sub(1)
            .and_then(|p| sequence.get(p))
            .and_then(|t| entity_class(t.as_ref()));
        if let Some(class) = previous {
            tags.push(Tag::inside(class).to_string());
        }
        tags
    }

    pub fn is_legal<S: AsRef<str>>(&self, sequence: &[S], position: usize, tag: &str) -> bool {
        self.legal_tags(sequence, position).iter().any(|t| t == tag)
    }
}

impl Default for TagVocabulary {
    fn default() -> Self {
        Self {
            classes: vec![String::from("PER"), String::from("LOC")],
        }
    }
}

/// Sets `sequence[position]` to `new_tag`. When the new tag is `O` and the next tag is `I-<Class>`,
/// the next tag becomes `B-<Class>`. The cascade stops there: positions further away are never
/// touched, even if they are malformed.
pub fn apply_edit(sequence: &mut [String], position: usize, new_tag: &str) -> Result<()> {
    let len = sequence.len();
    let slot = sequence
        .get_mut(position)
        .ok_or(NerError::OutOfRange { position, len })?;
    *slot = String::from(new_tag);
    if new_tag == OUTSIDE {
        if let Some(next) = sequence.get_mut(position + 1) {
            if let Some(class) = next.strip_prefix(INSIDE_PREFIX) {
                *next = format!("{}{}", BEGIN_PREFIX, class);
            }
        }
    }
    Ok(())
}

/// Same as `apply_edit`, but leaves `sequence` untouched and returns the edited copy.
pub fn edited<S: AsRef<str>>(sequence: &[S], position: usize, new_tag: &str) -> Result<Vec<String>> {
    let mut copy: Vec<String> = sequence.iter().map(|s| String::from(s.as_ref())).collect();
    apply_edit(&mut copy, position, new_tag)?;
    Ok(copy)
}

/// Returns the first position holding an `I-<Class>` tag that does not continue an entity of the
/// same class, if any.
pub fn first_dangling<S: AsRef<str>>(sequence: &[S]) -> Option<usize> {
    let mut previous: Option<&str> = None;
    for (i, tag) in sequence.iter().enumerate() {
        let tag = tag.as_ref();
        if let Some(class) = tag.strip_prefix(INSIDE_PREFIX) {
            if previous.and_then(entity_class) != Some(class) {
                return Some(i);
            }
        }
        previous = Some(tag);
    }
    None
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use enum_iterator::all;
    use quickcheck::{QuickCheck, TestResult};
    use rstest::rstest;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Sequence)]
    pub(crate) enum TagsToTest {
        O,
        BPer,
        IPer,
        BLoc,
        ILoc,
    }

    impl From<TagsToTest> for &'static str {
        fn from(value: TagsToTest) -> Self {
            match value {
                TagsToTest::O => "O",
                TagsToTest::BPer => "B-PER",
                TagsToTest::IPer => "I-PER",
                TagsToTest::BLoc => "B-LOC",
                TagsToTest::ILoc => "I-LOC",
            }
        }
    }

    impl quickcheck::Arbitrary for TagsToTest {
        fn arbitrary(g: &mut quickcheck::Gen) -> Self {
            let values: Vec<TagsToTest> = all::<TagsToTest>().collect();
            *g.choose(&values).unwrap()
        }
    }

    pub(crate) fn to_strings(tags: &[TagsToTest]) -> Vec<String> {
        tags.iter()
            .map(|t| -> &str { (*t).into() })
            .map(String::from)
            .collect()
    }

    fn vocabulary() -> TagVocabulary {
        TagVocabulary::new(["PER", "LOC"]).unwrap()
    }

    #[rstest]
    #[case("O", Tag::outside())]
    #[case("B-PER", Tag::begin("PER"))]
    #[case("I-WoA", Tag::inside("WoA"))]
    #[case("B-Work-of-Art", Tag::begin("Work-of-Art"))]
    fn test_parse_tag(#[case] input: &str, #[case] expected: Tag) {
        let actual: Tag = input.parse().unwrap();
        assert_eq!(actual, expected);
        assert_eq!(actual.to_string(), input);
    }

    #[rstest]
    #[case("", TagParseError::Empty)]
    #[case("X-PER", TagParseError::Marker(String::from("X-PER")))]
    #[case("O-PER", TagParseError::Marker(String::from("O-PER")))]
    #[case("B-", TagParseError::MissingClass(String::from("B-")))]
    #[case("BPER", TagParseError::MissingClass(String::from("BPER")))]
    fn test_parse_tag_errors(#[case] input: &str, #[case] expected: TagParseError) {
        assert_eq!(input.parse::<Tag>(), Err(expected));
    }

    #[test]
    fn test_marker_is_entity() {
        let entity: Vec<Marker> = all::<Marker>().filter(|m| m.is_entity()).collect();
        assert_eq!(entity, vec![Marker::B, Marker::I]);
    }

    #[rstest]
    #[case("")]
    #[case("WORK OF ART")]
    #[case("WORK-OF-ART")]
    fn test_invalid_class_names(#[case] class: &str) {
        assert_eq!(
            TagVocabulary::new([class]),
            Err(TagParseError::InvalidClass(String::from(class)))
        );
    }

    #[test]
    fn test_vocabulary_drops_duplicates() {
        let vocabulary = TagVocabulary::new(["PER", "LOC", "PER"]).unwrap();
        assert_eq!(vocabulary.classes(), &["PER", "LOC"]);
    }

    #[test]
    fn test_legal_tags_at_start() {
        let sequence = vec!["B-PER", "I-PER"];
        assert_eq!(vocabulary().legal_tags(&sequence, 0), vec!["O", "B-PER", "B-LOC"]);
    }

    #[rstest]
    #[case(vec!["B-PER", "O"], 1, Some("I-PER"))]
    #[case(vec!["I-LOC", "O"], 1, Some("I-LOC"))]
    #[case(vec!["O", "O"], 1, None)]
    #[case(vec!["B-PER", "O", "O"], 2, None)]
    #[case(vec!["B-WoA", "O"], 1, Some("I-WoA"))]
    #[case(vec!["B-PER"], 5, None)]
    fn test_legal_tags_continuation(
        #[case] sequence: Vec<&str>,
        #[case] position: usize,
        #[case] continuation: Option<&str>,
    ) {
        let tags = vocabulary().legal_tags(&sequence, position);
        let inside: Vec<&String> = tags.iter().filter(|t| t.starts_with("I-")).collect();
        match continuation {
            Some(expected) => assert_eq!(inside, vec![expected]),
            None => assert!(inside.is_empty()),
        }
    }

    #[test]
    fn test_apply_edit_out_of_range() {
        let mut sequence = vec![String::from("O")];
        let res = apply_edit(&mut sequence, 1, "B-PER");
        assert!(matches!(
            res,
            Err(NerError::OutOfRange {
                position: 1,
                len: 1
            })
        ));
        assert_eq!(sequence, vec!["O"]);
    }

    #[test]
    fn test_apply_edit_cascade_is_single_step() {
        let sequence = vec!["B-WoA", "I-WoA", "I-WoA", "I-WoA"];
        let actual = edited(&sequence, 0, "O").unwrap();
        assert_eq!(actual, vec!["O", "B-WoA", "I-WoA", "I-WoA"]);
        let actual = edited(&["O", "O", "I-PER", "I-PER"], 0, "O").unwrap();
        assert_eq!(actual, vec!["O", "O", "I-PER", "I-PER"]);
    }

    #[test]
    fn test_apply_edit_no_cascade_on_entity_tag() {
        let actual = edited(&["B-PER", "I-PER"], 0, "B-LOC").unwrap();
        assert_eq!(actual, vec!["B-LOC", "I-PER"]);
    }

    #[rstest]
    #[case(vec!["O", "B-PER", "I-PER"], None)]
    #[case(vec!["I-PER"], Some(0))]
    #[case(vec!["B-PER", "I-LOC"], Some(1))]
    #[case(vec!["B-PER", "I-PER", "O", "I-PER"], Some(3))]
    fn test_first_dangling(#[case] sequence: Vec<&str>, #[case] expected: Option<usize>) {
        assert_eq!(first_dangling(&sequence), expected);
    }

    #[test]
    fn test_position_label() {
        assert_eq!(position_label("B-PER"), position_label("I-LOC"));
        assert_eq!(position_label("O"), "O");
    }

    #[test]
    fn test_property_no_dangling_offer() {
        fn no_dangling_offer(sequence: Vec<TagsToTest>, position: usize) -> TestResult {
            if sequence.is_empty() {
                return TestResult::discard();
            }
            let sequence = to_strings(&sequence);
            let position = position % sequence.len();
            let offered = vocabulary().legal_tags(&sequence, position);
            for tag in offered.iter().filter(|t| t.starts_with("I-")) {
                if position == 0 {
                    return TestResult::failed();
                }
                let class = &tag[2..];
                let previous = &sequence[position - 1];
                let continues =
                    *previous == format!("B-{}", class) || *previous == format!("I-{}", class);
                if !continues {
                    return TestResult::failed();
                }
            }
            TestResult::passed()
        }
        let mut qc = QuickCheck::new().tests(2000);
        qc.quickcheck(no_dangling_offer as fn(Vec<TagsToTest>, usize) -> TestResult)
    }

    #[test]
    fn test_property_edit_is_idempotent() {
        fn idempotent(sequence: Vec<TagsToTest>, position: usize, tag: TagsToTest) -> TestResult {
            if sequence.is_empty() {
                return TestResult::discard();
            }
            let sequence = to_strings(&sequence);
            let position = position % sequence.len();
            let tag: &str = tag.into();
            let once = edited(&sequence, position, tag).unwrap();
            let twice = edited(&once, position, tag).unwrap();
            TestResult::from_bool(once == twice)
        }
        let mut qc = QuickCheck::new().tests(2000);
        qc.quickcheck(idempotent as fn(Vec<TagsToTest>, usize, TagsToTest) -> TestResult)
    }

    #[test]
    fn test_property_cascade() {
        fn cascade(sequence: Vec<TagsToTest>, position: usize) -> TestResult {
            if sequence.is_empty() {
                return TestResult::discard();
            }
            let sequence = to_strings(&sequence);
            let position = position % sequence.len();
            let actual = edited(&sequence, position, "O").unwrap();
            for (i, (before, after)) in sequence.iter().zip(actual.iter()).enumerate() {
                let expected = if i == position {
                    String::from("O")
                } else if i == position + 1 && before.starts_with("I-") {
                    format!("B-{}", &before[2..])
                } else {
                    before.clone()
                };
                if *after != expected {
                    return TestResult::failed();
                }
            }
            TestResult::passed()
        }
        let mut qc = QuickCheck::new().tests(2000);
        qc.quickcheck(cascade as fn(Vec<TagsToTest>, usize) -> TestResult)
    }
}
