use std::slice::Iter;

/// Custom datastructure built for reducing cache misses. The sequences are stored back to back in
/// a single boxed slice; `indices` holds the boundaries between them.
#[derive(Debug, Eq, PartialEq, PartialOrd, Ord, Hash, Clone)]
pub(crate) struct FlatSequences<T> {
    pub(crate) items: Box<[T]>,
    pub(crate) indices: Box<[usize]>,
}

impl<T> Default for FlatSequences<T> {
    fn default() -> Self {
        Self {
            items: Box::new([]),
            indices: Box::new([0]),
        }
    }
}

impl<T> FlatSequences<T> {
    pub(crate) fn new(vecs: Vec<Vec<T>>) -> Self {
        Self::from(vecs)
    }

    /// Number of items, over all the sequences.
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of sequences.
    pub(crate) fn num_sequences(&self) -> usize {
        self.indices.len().saturating_sub(1)
    }

    pub(crate) fn iter(&self) -> Iter<'_, T> {
        self.items.iter()
    }

    pub(crate) fn iter_vec(&self) -> VecsIter<'_, T> {
        VecsIter::new(self)
    }
}

impl<T> From<Vec<Vec<T>>> for FlatSequences<T> {
    #[inline(always)]
    fn from(value: Vec<Vec<T>>) -> Self {
        let length: usize = value.iter().map(|v| v.len()).sum();
        let mut flattened = Vec::with_capacity(length);
        let mut indices = Vec::with_capacity(value.len() + 1);
        indices.push(0);
        for vec in value.into_iter() {
            flattened.extend(vec);
            indices.push(flattened.len());
        }
        Self {
            items: flattened.into_boxed_slice(),
            indices: indices.into_boxed_slice(),
        }
    }
}

pub(crate) struct VecsIter<'a, T> {
    flat: &'a FlatSequences<T>,
    counter: usize,
}

impl<'a, T> VecsIter<'a, T> {
    fn new(flat: &'a FlatSequences<T>) -> Self {
        Self { flat, counter: 0 }
    }
}

impl<'a, T> Iterator for VecsIter<'a, T> {
    type Item = &'a [T];
    fn next(&mut self) -> Option<Self::Item> {
        let start = *self.flat.indices.get(self.counter)?;
        let end = *self.flat.indices.get(self.counter + 1)?;
        self.counter += 1;
        self.flat.items.get(start..end)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn build_vecs() -> Vec<Vec<&'static str>> {
        vec![
            vec!["O", "O", "O", "B-MISC", "I-MISC", "I-MISC", "O"],
            vec![],
            vec!["B-PER", "I-PER", "O"],
        ]
    }

    #[test]
    fn test_new_flat_sequences() {
        let actual = FlatSequences::new(build_vecs());
        let expected = FlatSequences {
            items: Box::new([
                "O", "O", "O", "B-MISC", "I-MISC", "I-MISC", "O", "B-PER", "I-PER", "O",
            ]) as Box<[&str]>,
            indices: Box::new([0usize, 7, 7, 10]) as Box<[usize]>,
        };
        assert_eq!(expected, actual);
        assert_eq!(actual.len(), 10);
        assert_eq!(actual.num_sequences(), 3);
    }

    #[test]
    fn test_iter_vec_keeps_empty_sequences() {
        let flat = FlatSequences::new(build_vecs());
        let actual: Vec<&[&str]> = flat.iter_vec().collect();
        assert_eq!(actual.len(), 3);
        assert!(actual[1].is_empty());
        assert_eq!(actual[2], &["B-PER", "I-PER", "O"]);
    }

    #[test]
    fn test_default_is_empty() {
        let flat: FlatSequences<&str> = FlatSequences::default();
        assert!(flat.is_empty());
        assert_eq!(flat.num_sequences(), 0);
        assert_eq!(flat.iter_vec().count(), 0);
    }
}
