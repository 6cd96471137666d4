use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use twdict_config::Config;
use twdict_config::dictionary::SourceConfig;
use twdict_core::dictionary::DictionaryLoader;
use twdict_core::error::ParseError;
use twdict_fetch::{ArchiveFetcher, DownloadedArchive, FetchError, VersionSource, archive_filename};
use twdict_types::DictionaryRecord;
use zip::write::SimpleFileOptions;

use crate::reconciler::VersionReconciler;
use crate::service::QueryService;

pub const DATA_FILE: &str = "dict_concised_2014.xlsx";

/// Publisher whose latest tag is set by the test. `None` means the page
/// carries no tag.
pub struct StubSource {
    version: Mutex<Option<String>>,
}

impl StubSource {
    pub fn new(version: &str) -> Self {
        Self {
            version: Mutex::new(Some(version.to_string())),
        }
    }

    pub fn set(&self, version: Option<&str>) {
        *self.version.lock().unwrap() = version.map(str::to_string);
    }
}

#[async_trait::async_trait]
impl VersionSource for StubSource {
    async fn latest_version(
        &self,
        dictionary_id: &str,
        _source: &SourceConfig,
    ) -> Result<String, FetchError> {
        self.version
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| FetchError::VersionNotFound {
                dictionary_id: dictionary_id.to_string(),
            })
    }
}

/// Pauses a fetch until released.
#[derive(Default)]
pub struct Gate {
    pub started: Notify,
    pub release: Notify,
}

/// Builds the archive in place of a download.
///
/// With `wrap` set, every file is placed under a directory named after the
/// archive, the way the publisher packages datasets.
pub struct StubFetcher {
    files: Mutex<Vec<(String, String)>>,
    wrap: bool,
    gate: Option<Arc<Gate>>,
    fetches: AtomicU32,
}

impl StubFetcher {
    pub fn wrapped(files: &[(&str, &str)]) -> Self {
        Self {
            files: Mutex::new(owned(files)),
            wrap: true,
            gate: None,
            fetches: AtomicU32::new(0),
        }
    }

    pub fn raw(files: &[(&str, &str)]) -> Self {
        Self {
            wrap: false,
            ..Self::wrapped(files)
        }
    }

    pub fn gated(mut self, gate: Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn set_files(&self, files: &[(&str, &str)]) {
        *self.files.lock().unwrap() = owned(files);
    }

    pub fn fetches(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }
}

fn owned(files: &[(&str, &str)]) -> Vec<(String, String)> {
    files
        .iter()
        .map(|(name, content)| (name.to_string(), content.to_string()))
        .collect()
}

#[async_trait::async_trait]
impl ArchiveFetcher for StubFetcher {
    async fn fetch(
        &self,
        url: &str,
        temp_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<DownloadedArchive, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.started.notify_one();
            tokio::select! {
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                _ = gate.release.notified() => {}
            }
        }

        let filename = archive_filename(url);
        let stem = filename.trim_end_matches(".zip").to_string();
        let files = self.files.lock().unwrap().clone();

        let mut file = tempfile::Builder::new()
            .prefix(".download-")
            .suffix(".zip")
            .tempfile_in(temp_dir)?;
        {
            let mut zip = zip::ZipWriter::new(file.as_file_mut());
            let options = SimpleFileOptions::default();
            for (name, content) in &files {
                let name = if self.wrap {
                    format!("{stem}/{name}")
                } else {
                    name.clone()
                };
                zip.start_file(name, options).map_err(io::Error::other)?;
                zip.write_all(content.as_bytes())?;
            }
            zip.finish().map_err(io::Error::other)?;
        }
        let bytes = file.as_file().metadata()?.len();

        Ok(DownloadedArchive {
            file,
            filename,
            bytes,
        })
    }
}

/// Reads tab-separated rows from a file named like the real workbook:
/// headword, pronunciation, part of speech, definition, example, extra.
#[derive(Default)]
pub struct TsvLoader {
    /// Cancelled as soon as a file is loaded
    pub cancel_on_load: Option<CancellationToken>,
}

impl DictionaryLoader for TsvLoader {
    fn load_from_file(&self, path: &Path) -> Result<Vec<DictionaryRecord>, ParseError> {
        if let Some(cancel) = &self.cancel_on_load {
            cancel.cancel();
        }

        let text = fs::read_to_string(path).map_err(|e| ParseError::io(path, e))?;
        Ok(text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                let cells: Vec<&str> = line.split('\t').collect();
                let cell = |i: usize| cells.get(i).copied().unwrap_or_default().to_string();
                let optional = |i: usize| Some(cell(i)).filter(|c| !c.is_empty());
                DictionaryRecord {
                    headword: cell(0),
                    pronunciations: vec![cell(1)],
                    part_of_speech: optional(2),
                    definitions: vec![cell(3)],
                    examples: optional(4).into_iter().collect(),
                    extra: optional(5),
                }
            })
            .collect())
    }

    fn supported_formats(&self) -> Vec<String> {
        vec!["xlsx".to_string()]
    }
}

/// Isolated storage root with stub collaborators.
pub struct Harness {
    pub storage: TempDir,
    pub config: Arc<Config>,
    pub source: Arc<StubSource>,
    pub fetcher: Arc<StubFetcher>,
    pub loader: Arc<TsvLoader>,
}

impl Harness {
    pub fn new(version: &str, fetcher: StubFetcher) -> Self {
        Self::with_loader(version, fetcher, TsvLoader::default())
    }

    pub fn with_loader(version: &str, fetcher: StubFetcher, loader: TsvLoader) -> Self {
        let storage = tempfile::tempdir().unwrap();
        let config = Arc::new(Config::with_storage(storage.path()));
        Self {
            storage,
            config,
            source: Arc::new(StubSource::new(version)),
            fetcher: Arc::new(fetcher),
            loader: Arc::new(loader),
        }
    }

    pub fn reconciler(&self) -> VersionReconciler {
        VersionReconciler::new(
            Arc::clone(&self.config),
            self.source.clone(),
            self.fetcher.clone(),
            self.loader.clone(),
        )
    }

    /// A fresh service over the same storage, as after a restart.
    pub fn service(&self) -> QueryService {
        QueryService::new(
            Arc::clone(&self.config),
            self.source.clone(),
            self.fetcher.clone(),
            self.loader.clone(),
        )
    }

    /// Names directly under the storage root, sorted.
    pub fn storage_entries(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.storage.path())
            .map(|dir| {
                dir.filter_map(Result::ok)
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

pub fn row(headword: &str, pronunciation: &str, definition: &str) -> String {
    format!("{headword}\t{pronunciation}\t\t{definition}\n")
}
