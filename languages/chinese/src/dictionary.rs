use twdict_core::dictionary::{Dictionary, DictionaryMetadata, SearchMode, SearchOptions};
use twdict_core::index::{FuzzyMatch, LookupIndex};
use twdict_types::{DatasetVersion, DictionaryRecord};

/// One loaded dataset generation of an MOE dictionary.
#[derive(Debug)]
pub struct MoeDictionary {
    name: String,
    version: DatasetVersion,
    index: LookupIndex,
}

impl MoeDictionary {
    pub fn new(name: impl Into<String>, version: DatasetVersion, records: Vec<DictionaryRecord>) -> Self {
        Self {
            name: name.into(),
            version,
            index: LookupIndex::build(records),
        }
    }

    /// Wrap an index that was already built and validated.
    pub fn from_index(name: impl Into<String>, version: DatasetVersion, index: LookupIndex) -> Self {
        Self {
            name: name.into(),
            version,
            index,
        }
    }

    pub fn version(&self) -> &DatasetVersion {
        &self.version
    }
}

impl Dictionary for MoeDictionary {
    fn lookup_exact(&self, query: &str) -> &[DictionaryRecord] {
        self.index.exact(query)
    }

    fn search(&self, query: &str, options: &SearchOptions) -> Vec<FuzzyMatch<'_>> {
        match options.mode {
            SearchMode::Exact => {
                let records = self.index.exact(query);
                if records.is_empty() {
                    return Vec::new();
                }
                vec![FuzzyMatch {
                    headword: records[0].headword.as_str(),
                    distance: 0,
                    records,
                }]
            }
            SearchMode::Prefix => {
                let query_len = query.chars().count();
                self.index
                    .prefix(query, options.max_results)
                    .into_iter()
                    .map(|headword| FuzzyMatch {
                        headword,
                        distance: headword.chars().count() - query_len,
                        records: self.index.exact(headword),
                    })
                    .collect()
            }
            SearchMode::Fuzzy { max_distance } => {
                self.index.fuzzy(query, max_distance, options.max_results)
            }
        }
    }

    fn metadata(&self) -> DictionaryMetadata {
        DictionaryMetadata {
            id: self.version.dictionary_id.clone(),
            name: self.name.clone(),
            version: self.version.version_tag.clone(),
            language: "zh-Hant".to_string(),
            entry_count: self.index.len(),
            headword_count: self.index.headword_count(),
        }
    }
}
