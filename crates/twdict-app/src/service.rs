use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use twdict_config::Config;
use twdict_core::dictionary::{Dictionary, DictionaryLoader, SearchMode, SearchOptions};
use twdict_core::error::{LookupError, ParseError};
use twdict_core::preprocess::Preprocessor;
use twdict_fetch::{ArchiveFetcher, FetchError, HttpSource, VersionSource};
use twdict_lang_chinese::{ChineseProcessor, MoeDictionary, XlsxLoader};
use twdict_types::{
    Candidate, CheckFailure, CheckSummary, DatasetVersion, DetailLevel, EntryView, LookupResponse,
    MatchType, UpdateReport, VersionCheck,
};

use crate::error::UpdateError;
use crate::metadata::MetadataError;
use crate::reconciler::{ReconcileState, VersionReconciler};

/// Entry point for lookups and updates.
///
/// Each loaded dictionary sits behind an `Arc`. An update builds the new
/// dictionary completely, then swaps the `Arc`; lookups already holding the
/// old one finish against it.
pub struct QueryService {
    config: Arc<Config>,
    reconciler: VersionReconciler,
    loader: Arc<dyn DictionaryLoader>,
    processor: ChineseProcessor,
    dictionaries: RwLock<HashMap<String, Arc<MoeDictionary>>>,
}

impl QueryService {
    pub fn new(
        config: Arc<Config>,
        source: Arc<dyn VersionSource>,
        fetcher: Arc<dyn ArchiveFetcher>,
        loader: Arc<dyn DictionaryLoader>,
    ) -> Self {
        Self {
            reconciler: VersionReconciler::new(
                Arc::clone(&config),
                source,
                fetcher,
                Arc::clone(&loader),
            ),
            config,
            loader,
            processor: ChineseProcessor,
            dictionaries: RwLock::new(HashMap::new()),
        }
    }

    /// Service talking to the real publisher and reading xlsx files.
    pub fn with_http(config: Config) -> Result<Self, FetchError> {
        let http = Arc::new(HttpSource::new(config.network.clone())?);
        Ok(Self::new(
            Arc::new(config),
            http.clone(),
            http,
            Arc::new(XlsxLoader),
        ))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load every dataset recorded in metadata.
    ///
    /// A dataset that fails to load is logged and skipped. Only unreadable
    /// metadata is an error.
    pub async fn open(&self) -> Result<(), MetadataError> {
        let metadata = self.reconciler.metadata().load()?;

        for (id, entry) in &metadata {
            let version = DatasetVersion::from_entry(id, entry);
            match self.load_dataset(version).await {
                Ok(dictionary) => {
                    let meta = dictionary.metadata();
                    tracing::info!(
                        "Loaded {} ({}) {}: {} entries, {} headwords",
                        meta.id,
                        meta.name,
                        meta.version,
                        meta.entry_count,
                        meta.headword_count
                    );
                    self.dictionaries
                        .write()
                        .await
                        .insert(id.clone(), Arc::new(dictionary));
                }
                Err(e) => tracing::warn!("Cannot load {} {}: {}", id, entry.version, e),
            }
        }

        Ok(())
    }

    async fn load_dataset(&self, version: DatasetVersion) -> Result<MoeDictionary, ParseError> {
        let name = self
            .config
            .dictionary(&version.dictionary_id)
            .map(|d| d.name.clone())
            .unwrap_or_else(|| version.dictionary_id.clone());

        let loader = Arc::clone(&self.loader);
        let path = version.data_file_path.clone();
        let records = tokio::task::spawn_blocking(move || loader.load_from_file(&path))
            .await
            .map_err(|e| ParseError::io(&version.data_file_path, io::Error::other(e)))??;

        Ok(MoeDictionary::new(name, version, records))
    }

    pub async fn dictionary(&self, dictionary_id: &str) -> Option<Arc<MoeDictionary>> {
        self.dictionaries.read().await.get(dictionary_id).cloned()
    }

    async fn loaded(&self, dictionary_id: &str) -> Result<Arc<MoeDictionary>, LookupError> {
        self.dictionary(dictionary_id)
            .await
            .ok_or_else(|| LookupError::NotLoaded {
                dictionary_id: dictionary_id.to_string(),
            })
    }

    /// Exact match first, then edit-distance candidates.
    pub async fn lookup(
        &self,
        dictionary_id: &str,
        word: &str,
        detail: DetailLevel,
    ) -> Result<LookupResponse, LookupError> {
        let dictionary = self.loaded(dictionary_id).await?;
        let query = self.processor.process(word);
        let not_found = || LookupError::NotFound {
            query: query.clone(),
        };
        if query.is_empty() {
            return Err(not_found());
        }

        let exact = dictionary.lookup_exact(&query);
        let (match_type, candidates) = if !exact.is_empty() {
            let candidate = Candidate {
                headword: query.clone(),
                distance: 0,
                entries: exact.iter().map(|r| EntryView::render(r, detail)).collect(),
            };
            (MatchType::Exact, vec![candidate])
        } else {
            let lookup = &self.config.lookup;
            let options = SearchOptions {
                max_results: lookup.fuzzy_limit,
                mode: SearchMode::Fuzzy {
                    max_distance: lookup.max_distance_for(query.chars().count()),
                },
            };
            let candidates: Vec<Candidate> = dictionary
                .search(&query, &options)
                .into_iter()
                .map(|m| Candidate {
                    headword: m.headword.to_string(),
                    distance: m.distance,
                    entries: m.records.iter().map(|r| EntryView::render(r, detail)).collect(),
                })
                .collect();
            (MatchType::Fuzzy, candidates)
        };

        if candidates.is_empty() {
            tracing::debug!("No match for {} in {}", query, dictionary_id);
            return Err(not_found());
        }

        Ok(LookupResponse {
            dictionary_id: dictionary_id.to_string(),
            query: query.clone(),
            match_type,
            candidates,
        })
    }

    /// Headwords starting with `prefix`, in sorted order.
    pub async fn suggest(
        &self,
        dictionary_id: &str,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<String>, LookupError> {
        let dictionary = self.loaded(dictionary_id).await?;
        let prefix = self.processor.process(prefix);
        if prefix.is_empty() {
            return Ok(Vec::new());
        }

        let options = SearchOptions {
            max_results: limit,
            mode: SearchMode::Prefix,
        };
        Ok(dictionary
            .search(&prefix, &options)
            .into_iter()
            .map(|m| m.headword.to_string())
            .collect())
    }

    /// Bring `dictionary_id` up to date and serve the new dataset on success.
    pub async fn request_update(
        &self,
        dictionary_id: &str,
        force: bool,
        cancel: &CancellationToken,
    ) -> Result<UpdateReport, UpdateError> {
        let outcome = self.reconciler.reconcile(dictionary_id, force, cancel).await?;

        if let Some(dictionary) = outcome.dictionary {
            self.dictionaries
                .write()
                .await
                .insert(dictionary_id.to_string(), Arc::new(dictionary));
        }
        Ok(outcome.report)
    }

    /// Compare the installed version with the newest published one.
    pub async fn check_updates(&self, dictionary_id: &str) -> Result<VersionCheck, UpdateError> {
        let local = self
            .reconciler
            .metadata()
            .current(dictionary_id)
            .map_err(|e| UpdateError::new(dictionary_id, ReconcileState::Checking, e))?
            .map(|v| v.version_tag);
        let latest = self.reconciler.latest_version(dictionary_id).await?;

        Ok(VersionCheck::new(dictionary_id, local, latest))
    }

    /// Check every installed dictionary that is still enabled. Per-dictionary
    /// failures are reported in the summary instead of aborting the run.
    pub async fn check_all(&self) -> Result<CheckSummary, MetadataError> {
        let installed = self.reconciler.metadata().load()?;
        let enabled = |id: &String| {
            self.config
                .dictionary(id)
                .is_some_and(|dictionary| dictionary.enabled)
        };

        let mut dictionaries = Vec::new();
        let mut failures = Vec::new();
        for id in installed.keys().filter(|id| enabled(id)) {
            match self.check_updates(id).await {
                Ok(check) => dictionaries.push(check),
                Err(e) => {
                    tracing::warn!("Version check for {} failed: {}", id, e.kind);
                    failures.push(CheckFailure {
                        dictionary_id: id.clone(),
                        error: e.kind.to_string(),
                    });
                }
            }
        }

        Ok(CheckSummary {
            checked_at: Utc::now(),
            updates_available: dictionaries.iter().any(|c| c.update_available),
            dictionaries,
            failures,
        })
    }

    /// Whether `auto_update_interval_days` have passed since the active
    /// dataset was downloaded. Always true when nothing is installed.
    pub fn refresh_due(&self, dictionary_id: &str) -> Result<bool, MetadataError> {
        let Some(current) = self.reconciler.metadata().current(dictionary_id)? else {
            return Ok(true);
        };

        let interval = Duration::days(i64::from(self.config.auto_update_interval_days));
        Ok(Utc::now() - current.downloaded_at >= interval)
    }
}
