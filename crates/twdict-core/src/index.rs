use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use twdict_types::DictionaryRecord;

use crate::distance::bounded_levenshtein;

/// Immutable headword index. Rebuilt wholesale for every dataset generation.
#[derive(Debug, Default)]
pub struct LookupIndex {
    by_headword: HashMap<String, Vec<DictionaryRecord>>,
    /// Distinct headwords in codepoint order
    headwords_sorted: Vec<String>,
    /// Headword char length -> positions in `headwords_sorted`
    by_length: BTreeMap<usize, Vec<usize>>,
    record_count: usize,
}

/// A fuzzy (or prefix/exact) hit borrowed from the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzyMatch<'a> {
    pub headword: &'a str,
    pub distance: usize,
    pub records: &'a [DictionaryRecord],
}

impl LookupIndex {
    /// Group records by headword, keeping row order inside each group.
    pub fn build(records: impl IntoIterator<Item = DictionaryRecord>) -> Self {
        let mut by_headword: HashMap<String, Vec<DictionaryRecord>> = HashMap::new();
        let mut record_count = 0;

        for record in records {
            if record.headword.is_empty() {
                continue;
            }
            record_count += 1;
            by_headword
                .entry(record.headword.clone())
                .or_default()
                .push(record);
        }

        // String ordering is byte order, which for UTF-8 is codepoint order
        let mut headwords_sorted: Vec<String> = by_headword.keys().cloned().collect();
        headwords_sorted.sort_unstable();

        let mut by_length: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (pos, headword) in headwords_sorted.iter().enumerate() {
            by_length
                .entry(headword.chars().count())
                .or_default()
                .push(pos);
        }

        tracing::debug!(
            "Indexed {} records under {} headwords",
            record_count,
            headwords_sorted.len()
        );

        Self {
            by_headword,
            headwords_sorted,
            by_length,
            record_count,
        }
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.record_count
    }

    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }

    pub fn headword_count(&self) -> usize {
        self.headwords_sorted.len()
    }

    pub fn headwords(&self) -> &[String] {
        &self.headwords_sorted
    }

    pub fn exact(&self, word: &str) -> &[DictionaryRecord] {
        self.by_headword
            .get(word)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Up to `limit` headwords starting with `word`, in sorted order.
    pub fn prefix(&self, word: &str, limit: usize) -> Vec<&str> {
        let start = self
            .headwords_sorted
            .partition_point(|headword| headword.as_str() < word);

        self.headwords_sorted[start..]
            .iter()
            .take_while(|headword| headword.starts_with(word))
            .take(limit)
            .map(String::as_str)
            .collect()
    }

    /// Headwords within `max_distance` edits of `word`.
    ///
    /// Ranked by ascending distance, then longer headwords first, then sorted
    /// position. Only length buckets within `max_distance` of the query are
    /// visited.
    pub fn fuzzy(&self, word: &str, max_distance: usize, limit: usize) -> Vec<FuzzyMatch<'_>> {
        let query: Vec<char> = word.chars().collect();
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }

        let shortest = query.len().saturating_sub(max_distance);
        let longest = query.len() + max_distance;

        let mut hits: Vec<(usize, Reverse<usize>, usize)> = Vec::new();
        for (&len, positions) in self.by_length.range(shortest..=longest) {
            for &pos in positions {
                let candidate = &self.headwords_sorted[pos];
                if let Some(distance) = bounded_levenshtein(&query, candidate, max_distance) {
                    hits.push((distance, Reverse(len), pos));
                }
            }
        }

        hits.sort_unstable();
        hits.truncate(limit);

        hits.into_iter()
            .map(|(distance, _, pos)| {
                let headword = self.headwords_sorted[pos].as_str();
                FuzzyMatch {
                    headword,
                    distance,
                    records: self.exact(headword),
                }
            })
            .collect()
    }
}
