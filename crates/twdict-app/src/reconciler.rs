use std::collections::HashSet;
use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use twdict_archive::SafeExtractor;
use twdict_config::Config;
use twdict_config::dictionary::DictionaryConfig;
use twdict_core::dictionary::DictionaryLoader;
use twdict_core::index::LookupIndex;
use twdict_fetch::{ArchiveFetcher, VersionSource};
use twdict_lang_chinese::MoeDictionary;
use twdict_types::{DatasetVersion, UpdateOutcome, UpdateReport, VersionStatus};
use uuid::Uuid;

use crate::dataset;
use crate::error::{UpdateError, UpdateErrorKind};
use crate::metadata::MetadataStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileState {
    Idle,
    Checking,
    Fetching,
    Extracting,
    Parsing,
    Validating,
    Swapping,
    Failed,
}

impl fmt::Display for ReconcileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReconcileState::Idle => "idle",
            ReconcileState::Checking => "checking",
            ReconcileState::Fetching => "fetching",
            ReconcileState::Extracting => "extracting",
            ReconcileState::Parsing => "parsing",
            ReconcileState::Validating => "validating",
            ReconcileState::Swapping => "swapping",
            ReconcileState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A finished cycle.
#[derive(Debug)]
pub struct ReconcileOutcome {
    pub report: UpdateReport,
    /// Every state entered, starting and ending with `Idle`
    pub trace: Vec<ReconcileState>,
    /// The newly activated dataset, `None` when already up to date
    pub dictionary: Option<MoeDictionary>,
}

/// Decides when a dictionary must be replaced and performs the replacement.
///
/// Nothing under the active dataset or in `metadata.json` changes until a new
/// dataset has been fetched, extracted, parsed and indexed out of place.
pub struct VersionReconciler {
    config: Arc<Config>,
    source: Arc<dyn VersionSource>,
    fetcher: Arc<dyn ArchiveFetcher>,
    loader: Arc<dyn DictionaryLoader>,
    extractor: SafeExtractor,
    metadata: MetadataStore,
    in_flight: Mutex<HashSet<String>>,
}

impl VersionReconciler {
    pub fn new(
        config: Arc<Config>,
        source: Arc<dyn VersionSource>,
        fetcher: Arc<dyn ArchiveFetcher>,
        loader: Arc<dyn DictionaryLoader>,
    ) -> Self {
        Self {
            extractor: SafeExtractor::new(config.extract),
            metadata: MetadataStore::new(config.metadata_path()),
            config,
            source,
            fetcher,
            loader,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    /// Newest tag the publisher offers for `dictionary_id`.
    pub async fn latest_version(&self, dictionary_id: &str) -> Result<String, UpdateError> {
        let dictionary = self.dictionary_config(dictionary_id)?;
        self.source
            .latest_version(dictionary_id, &dictionary.source)
            .await
            .map_err(|e| UpdateError::new(dictionary_id, ReconcileState::Checking, e))
    }

    /// Run one cycle for `dictionary_id`.
    ///
    /// A second call for the same id while one is running fails with `Busy`.
    /// `force` skips the version comparison.
    pub async fn reconcile(
        &self,
        dictionary_id: &str,
        force: bool,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome, UpdateError> {
        let dictionary = self.dictionary_config(dictionary_id)?;

        let Some(_guard) = InFlight::acquire(&self.in_flight, dictionary_id) else {
            tracing::warn!("Update of {} already in progress", dictionary_id);
            return Err(UpdateError::new(
                dictionary_id,
                ReconcileState::Idle,
                UpdateErrorKind::Busy,
            ));
        };

        let mut cycle = Cycle::new(dictionary_id);
        match self.run(&mut cycle, dictionary, force, cancel).await {
            Ok((report, dictionary)) => {
                cycle.enter(ReconcileState::Idle);
                Ok(ReconcileOutcome {
                    report,
                    trace: cycle.trace,
                    dictionary,
                })
            }
            Err(kind) => {
                let failed_in = cycle.state;
                cycle.enter(ReconcileState::Failed);
                tracing::error!(cycle = %cycle.id, "Update of {} failed while {}: {}", dictionary_id, failed_in, kind);
                cycle.enter(ReconcileState::Idle);
                Err(UpdateError::new(dictionary_id, failed_in, kind))
            }
        }
    }

    async fn run(
        &self,
        cycle: &mut Cycle<'_>,
        dictionary: &DictionaryConfig,
        force: bool,
        cancel: &CancellationToken,
    ) -> Result<(UpdateReport, Option<MoeDictionary>), UpdateErrorKind> {
        let dictionary_id = cycle.dictionary_id;

        cycle.enter(ReconcileState::Checking);
        let previous = self.metadata.current(dictionary_id)?;
        let previous_version = previous.as_ref().map(|v| v.version_tag.clone());

        let remote = tokio::select! {
            _ = cancel.cancelled() => return Err(UpdateErrorKind::Cancelled),
            latest = self.source.latest_version(dictionary_id, &dictionary.source) => latest?,
        };

        let status = VersionStatus::compare(previous_version.as_deref(), &remote);
        if !force && matches!(status, VersionStatus::UpToDate | VersionStatus::NewerThanRemote) {
            tracing::info!("{} is up to date ({})", dictionary_id, remote);
            let report = UpdateReport {
                dictionary_id: dictionary_id.to_string(),
                outcome: UpdateOutcome::UpToDate,
                previous_version: previous_version.clone(),
                remote_version: remote,
                active_version: previous_version,
                changed: false,
                data_file: previous.map(|v| v.data_file_path),
            };
            return Ok((report, None));
        }

        cycle.enter(ReconcileState::Fetching);
        let storage = self.config.storage_path.clone();
        tokio::fs::create_dir_all(&storage).await?;
        let url = dictionary.source.archive_url_for(&remote);
        let archive = self.fetcher.fetch(&url, &storage, cancel).await?;

        cycle.enter(ReconcileState::Extracting);
        let staged = {
            let extractor = self.extractor;
            let archive_path = archive.path().to_path_buf();
            let staging_parent = storage.clone();
            let stop = cancel.clone();
            blocking(cancel, move || extractor.extract_file(&archive_path, &staging_parent, &stop)).await?
        };
        let stem = archive.stem().to_string();
        drop(archive);

        let data_root = dataset::data_root(staged.path(), &stem)?;
        let data_filename = dataset::find_data_file(
            &data_root,
            &stem,
            &dictionary.source.data_filename,
            &self.loader.supported_formats(),
        )?;
        tracing::debug!(
            "Staged {} files ({} bytes), data file {}",
            staged.files().len(),
            staged.bytes_written(),
            data_filename
        );

        cycle.enter(ReconcileState::Parsing);
        let records = {
            let loader = Arc::clone(&self.loader);
            let data_path = data_root.join(&data_filename);
            blocking(cancel, move || loader.load_from_file(&data_path)).await?
        };

        cycle.enter(ReconcileState::Validating);
        let index = LookupIndex::build(records);
        if index.is_empty() {
            return Err(UpdateErrorKind::EmptyDataset);
        }
        if cancel.is_cancelled() {
            return Err(UpdateErrorKind::Cancelled);
        }

        cycle.enter(ReconcileState::Swapping);
        let promoted = dataset::promote(&data_root, &storage, dictionary_id, &remote)?;
        drop(staged);

        let version = DatasetVersion {
            dictionary_id: dictionary_id.to_string(),
            version_tag: remote.clone(),
            downloaded_at: Utc::now(),
            data_file_path: promoted.join(&data_filename),
        };
        self.metadata.activate(&version)?;
        tracing::info!(
            "{} now at {} ({} entries)",
            dictionary_id,
            remote,
            index.len()
        );

        let report = UpdateReport {
            dictionary_id: dictionary_id.to_string(),
            outcome: UpdateOutcome::Updated,
            previous_version,
            remote_version: remote.clone(),
            active_version: Some(remote),
            changed: true,
            data_file: Some(version.data_file_path.clone()),
        };
        let loaded = MoeDictionary::from_index(&dictionary.name, version, index);
        Ok((report, Some(loaded)))
    }

    /// Configured source for `dictionary_id`. Disabled dictionaries are
    /// never probed or fetched.
    fn dictionary_config(&self, dictionary_id: &str) -> Result<&DictionaryConfig, UpdateError> {
        let refuse = |kind: UpdateErrorKind| UpdateError::new(dictionary_id, ReconcileState::Idle, kind);

        let dictionary = self
            .config
            .dictionary(dictionary_id)
            .ok_or_else(|| refuse(UpdateErrorKind::UnknownDictionary))?;
        if !dictionary.enabled {
            tracing::warn!("{} is disabled, not updating", dictionary_id);
            return Err(refuse(UpdateErrorKind::Disabled));
        }
        Ok(dictionary)
    }
}

/// Run local work off the async runtime, abandoning it on cancellation.
///
/// An abandoned task still runs until it next observes the token or
/// finishes; whatever it produced is dropped, which removes any staging
/// directory it created.
async fn blocking<T, E>(
    cancel: &CancellationToken,
    work: impl FnOnce() -> Result<T, E> + Send + 'static,
) -> Result<T, UpdateErrorKind>
where
    T: Send + 'static,
    E: Into<UpdateErrorKind> + Send + 'static,
{
    let task = tokio::task::spawn_blocking(work);
    tokio::select! {
        _ = cancel.cancelled() => Err(UpdateErrorKind::Cancelled),
        joined = task => joined.map_err(io::Error::other)?.map_err(Into::into),
    }
}

/// State bookkeeping for one cycle.
struct Cycle<'a> {
    id: Uuid,
    dictionary_id: &'a str,
    state: ReconcileState,
    trace: Vec<ReconcileState>,
}

impl<'a> Cycle<'a> {
    fn new(dictionary_id: &'a str) -> Self {
        Self {
            id: Uuid::new_v4(),
            dictionary_id,
            state: ReconcileState::Idle,
            trace: vec![ReconcileState::Idle],
        }
    }

    fn enter(&mut self, next: ReconcileState) {
        tracing::info!(
            cycle = %self.id,
            dictionary = self.dictionary_id,
            "{} -> {}",
            self.state,
            next
        );
        self.state = next;
        self.trace.push(next);
    }
}

/// Marks a dictionary id as being updated until dropped.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<String>>,
    dictionary_id: String,
}

impl<'a> InFlight<'a> {
    fn acquire(set: &'a Mutex<HashSet<String>>, dictionary_id: &str) -> Option<Self> {
        let inserted = set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(dictionary_id.to_string());

        inserted.then(|| Self {
            set,
            dictionary_id: dictionary_id.to_string(),
        })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.dictionary_id);
    }
}
