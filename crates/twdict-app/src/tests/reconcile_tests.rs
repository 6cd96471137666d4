use std::fs;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use twdict_archive::ExtractError;
use twdict_core::dictionary::Dictionary;
use twdict_core::error::ParseError;
use twdict_types::UpdateOutcome;

use super::support::{DATA_FILE, Gate, Harness, StubFetcher, TsvLoader, row};
use crate::error::UpdateErrorKind;
use crate::reconciler::ReconcileState::{self, *};

const FULL_CYCLE: [ReconcileState; 8] = [
    Idle, Checking, Fetching, Extracting, Parsing, Validating, Swapping, Idle,
];

fn dataset() -> String {
    row("梅雨", "ㄇㄟˊ ㄩˇ", "春末夏初的連續降雨。") + &row("梅", "ㄇㄟˊ", "植物名。")
}

#[tokio::test]
async fn outdated_version_walks_every_state() {
    let data = dataset();
    let h = Harness::new("20200929", StubFetcher::wrapped(&[(DATA_FILE, data.as_str())]));
    let reconciler = h.reconciler();
    let cancel = CancellationToken::new();

    let first = reconciler.reconcile("concised", false, &cancel).await.unwrap();
    assert_eq!(first.trace, FULL_CYCLE);
    assert_eq!(first.report.previous_version, None);

    h.source.set(Some("20251229"));
    let second = reconciler.reconcile("concised", false, &cancel).await.unwrap();

    assert_eq!(second.trace, FULL_CYCLE);
    assert_eq!(second.report.outcome, UpdateOutcome::Updated);
    assert_eq!(second.report.previous_version.as_deref(), Some("20200929"));
    assert_eq!(second.report.active_version.as_deref(), Some("20251229"));
    assert!(second.report.changed);

    let current = reconciler.metadata().current("concised").unwrap().unwrap();
    assert_eq!(current.version_tag, "20251229");
    assert_eq!(
        current.data_file_path,
        h.storage.path().join("concised_20251229").join(DATA_FILE)
    );
    assert_eq!(second.dictionary.unwrap().metadata().entry_count, 2);

    // superseded generations stay on disk
    assert_eq!(
        h.storage_entries(),
        vec!["concised_20200929", "concised_20251229", "metadata.json"]
    );
}

#[tokio::test]
async fn equal_versions_never_fetch() {
    let data = dataset();
    let h = Harness::new("20251229", StubFetcher::wrapped(&[(DATA_FILE, data.as_str())]));
    let reconciler = h.reconciler();
    let cancel = CancellationToken::new();

    reconciler.reconcile("concised", false, &cancel).await.unwrap();
    let again = reconciler.reconcile("concised", false, &cancel).await.unwrap();

    assert_eq!(again.trace, vec![Idle, Checking, Idle]);
    assert_eq!(again.report.outcome, UpdateOutcome::UpToDate);
    assert!(!again.report.changed);
    assert!(again.dictionary.is_none());
    assert_eq!(h.fetcher.fetches(), 1);
}

#[tokio::test]
async fn older_remote_counts_as_up_to_date() {
    let data = dataset();
    let h = Harness::new("20251229", StubFetcher::wrapped(&[(DATA_FILE, data.as_str())]));
    let reconciler = h.reconciler();
    let cancel = CancellationToken::new();

    reconciler.reconcile("concised", false, &cancel).await.unwrap();
    h.source.set(Some("20200929"));
    let outcome = reconciler.reconcile("concised", false, &cancel).await.unwrap();

    assert_eq!(outcome.report.outcome, UpdateOutcome::UpToDate);
    assert_eq!(outcome.report.active_version.as_deref(), Some("20251229"));
}

#[tokio::test]
async fn force_adds_a_new_generation() {
    let data = dataset();
    let h = Harness::new("20251229", StubFetcher::wrapped(&[(DATA_FILE, data.as_str())]));
    let reconciler = h.reconciler();
    let cancel = CancellationToken::new();

    let first = reconciler.reconcile("concised", false, &cancel).await.unwrap();
    let forced = reconciler.reconcile("concised", true, &cancel).await.unwrap();

    assert_eq!(forced.trace, FULL_CYCLE);
    assert_eq!(forced.report.outcome, UpdateOutcome::Updated);
    assert_ne!(forced.report.data_file, first.report.data_file);
    assert!(first.report.data_file.unwrap().is_file());
    assert!(forced.report.data_file.unwrap().is_file());
    assert_eq!(h.fetcher.fetches(), 2);
}

#[tokio::test]
async fn concurrent_update_is_rejected_as_busy() {
    let data = dataset();
    let gate = Arc::new(Gate::default());
    let h = Harness::new(
        "20251229",
        StubFetcher::wrapped(&[(DATA_FILE, data.as_str())]).gated(Arc::clone(&gate)),
    );
    let service = Arc::new(h.service());
    let cancel = CancellationToken::new();

    let running = tokio::spawn({
        let service = Arc::clone(&service);
        let cancel = cancel.clone();
        async move { service.request_update("concised", false, &cancel).await }
    });
    gate.started.notified().await;

    let err = service
        .request_update("concised", false, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err.kind, UpdateErrorKind::Busy));

    gate.release.notify_one();
    let report = running.await.unwrap().unwrap();
    assert_eq!(report.active_version.as_deref(), Some("20251229"));

    // the slot is free again
    let again = service.request_update("concised", false, &cancel).await.unwrap();
    assert_eq!(again.outcome, UpdateOutcome::UpToDate);
}

#[tokio::test]
async fn empty_dataset_keeps_previous_version() {
    let data = dataset();
    let h = Harness::new("20200929", StubFetcher::wrapped(&[(DATA_FILE, data.as_str())]));
    let service = h.service();
    let cancel = CancellationToken::new();
    service.request_update("concised", false, &cancel).await.unwrap();

    h.source.set(Some("20251229"));
    h.fetcher.set_files(&[(DATA_FILE, "")]);
    let err = service
        .request_update("concised", false, &cancel)
        .await
        .unwrap_err();

    assert_eq!(err.state, Validating);
    assert!(matches!(err.kind, UpdateErrorKind::EmptyDataset));
    assert!(err.to_string().contains("previous version remains active"));

    let check = service.check_updates("concised").await.unwrap();
    assert_eq!(check.local_version.as_deref(), Some("20200929"));
    assert!(service.lookup("concised", "梅雨", Default::default()).await.is_ok());
    assert_eq!(h.storage_entries(), vec!["concised_20200929", "metadata.json"]);
}

#[tokio::test]
async fn traversal_archive_writes_nothing() {
    let h = Harness::new(
        "20251229",
        StubFetcher::raw(&[("../../evil.txt", "pwned"), (DATA_FILE, "梅\tㄇㄟˊ\t\t植物名。")]),
    );
    let cancel = CancellationToken::new();

    let err = h
        .reconciler()
        .reconcile("concised", false, &cancel)
        .await
        .unwrap_err();

    assert_eq!(err.state, Extracting);
    assert!(matches!(
        err.kind,
        UpdateErrorKind::Extract(ExtractError::PathTraversal { .. })
    ));
    assert!(h.storage_entries().is_empty());
    assert!(!h.storage.path().join("../evil.txt").exists());
}

#[tokio::test]
async fn mismatched_wrapper_directory_is_rejected() {
    let h = Harness::new(
        "20251229",
        StubFetcher::raw(&[("dict_concised_2014_20200101/dict_concised_2014.xlsx", "梅\tㄇㄟˊ\t\t植物名。")]),
    );
    let cancel = CancellationToken::new();

    let err = h
        .reconciler()
        .reconcile("concised", false, &cancel)
        .await
        .unwrap_err();

    assert_eq!(err.state, Extracting);
    assert!(matches!(
        err.kind,
        UpdateErrorKind::Parse(ParseError::UnexpectedLayout(_))
    ));
    assert!(h.storage_entries().is_empty());
}

#[tokio::test]
async fn root_level_archive_is_accepted() {
    let data = dataset();
    let h = Harness::new("20251229", StubFetcher::raw(&[(DATA_FILE, data.as_str())]));
    let cancel = CancellationToken::new();

    let outcome = h
        .reconciler()
        .reconcile("concised", false, &cancel)
        .await
        .unwrap();

    assert_eq!(
        outcome.report.data_file,
        Some(h.storage.path().join("concised_20251229").join(DATA_FILE))
    );
}

#[tokio::test]
async fn crash_before_metadata_write_keeps_old_version() {
    let data = dataset();
    let h = Harness::new("20200929", StubFetcher::wrapped(&[(DATA_FILE, data.as_str())]));
    let cancel = CancellationToken::new();
    h.service()
        .request_update("concised", false, &cancel)
        .await
        .unwrap();

    // promoted directory without the metadata write that would follow it
    let orphan = h.storage.path().join("concised_20251229");
    fs::create_dir_all(&orphan).unwrap();
    fs::write(orphan.join(DATA_FILE), row("藍寶石", "ㄌㄢˊ ㄅㄠˇ ㄕˊ", "寶石名。")).unwrap();

    let restarted = h.service();
    restarted.open().await.unwrap();

    let dictionary = restarted.dictionary("concised").await.unwrap();
    assert_eq!(dictionary.version().version_tag, "20200929");
    assert!(restarted.lookup("concised", "梅雨", Default::default()).await.is_ok());
    assert!(restarted.lookup("concised", "藍寶石", Default::default()).await.is_err());
}

#[tokio::test]
async fn cancelled_cycle_leaves_no_staging() {
    let data = dataset();
    let cancel = CancellationToken::new();
    let h = Harness::with_loader(
        "20251229",
        StubFetcher::wrapped(&[(DATA_FILE, data.as_str())]),
        TsvLoader {
            cancel_on_load: Some(cancel.clone()),
        },
    );

    let err = h
        .reconciler()
        .reconcile("concised", false, &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(matches!(err.state, Parsing | Validating));
    assert!(h.storage_entries().is_empty());
}

#[tokio::test]
async fn cancelled_download_is_reported() {
    let gate = Arc::new(Gate::default());
    let h = Harness::new(
        "20251229",
        StubFetcher::wrapped(&[(DATA_FILE, "")]).gated(Arc::clone(&gate)),
    );
    let reconciler = h.reconciler();
    let cancel = CancellationToken::new();

    let (result, _) = tokio::join!(reconciler.reconcile("concised", false, &cancel), async {
        gate.started.notified().await;
        cancel.cancel();
    });

    let err = result.unwrap_err();
    assert_eq!(err.state, Fetching);
    assert!(err.is_cancelled());
    assert!(h.storage_entries().is_empty());
}

#[tokio::test]
async fn unknown_dictionary_is_refused() {
    let h = Harness::new("20251229", StubFetcher::wrapped(&[]));
    let err = h
        .reconciler()
        .reconcile("klingon", false, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err.kind, UpdateErrorKind::UnknownDictionary));
    assert_eq!(h.fetcher.fetches(), 0);
}

#[tokio::test]
async fn disabled_dictionary_is_never_fetched() {
    let data = dataset();
    let h = Harness::new("20251229", StubFetcher::wrapped(&[(DATA_FILE, data.as_str())]));
    let reconciler = h.reconciler();

    let err = reconciler
        .reconcile("revised", true, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err.kind, UpdateErrorKind::Disabled));
    assert_eq!(err.state, Idle);

    let latest = reconciler.latest_version("revised").await.unwrap_err();
    assert!(matches!(latest.kind, UpdateErrorKind::Disabled));

    assert_eq!(h.fetcher.fetches(), 0);
    assert!(h.storage_entries().is_empty());
}
