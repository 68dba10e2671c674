use rag_core::persist::{load_index, IndexPaths};
use rag_core::staleness::{self, needs_rebuild, Staleness};
use rag_core::{open_or_build, OpenOutcome, RagConfig, RebuildReason, SearchService};
use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::tempdir;

fn config_for(corpus: &Path, index: &Path) -> RagConfig {
    RagConfig {
        corpus_dir: corpus.to_path_buf(),
        index_dir: index.to_path_buf(),
        ocr_command: String::new(),
        ..RagConfig::default()
    }
}

fn touch_future(path: &Path) {
    let f = File::options().write(true).open(path).unwrap();
    f.set_modified(SystemTime::now() + Duration::from_secs(60)).unwrap();
}

#[test]
fn touching_a_corpus_file_flips_needs_rebuild() {
    let corpus = tempdir().unwrap();
    let index = tempdir().unwrap();
    fs::write(corpus.path().join("A.txt"), "H1B visa sponsor Amazon approvals").unwrap();
    assert!(needs_rebuild(corpus.path(), index.path()));

    let cfg = config_for(corpus.path(), index.path());
    let (_, outcome) = open_or_build(&cfg).unwrap();
    assert_eq!(outcome, OpenOutcome::Built(RebuildReason::Staleness(Staleness::Missing)));
    // back-date the corpus so the freshly written artifact is strictly newer
    let past = SystemTime::now() - Duration::from_secs(3600);
    File::options().write(true).open(corpus.path().join("A.txt")).unwrap().set_modified(past).unwrap();
    File::open(corpus.path()).unwrap().set_modified(past).unwrap();
    assert!(!needs_rebuild(corpus.path(), index.path()));

    touch_future(&corpus.path().join("A.txt"));
    assert_eq!(staleness::check(corpus.path(), index.path()), Staleness::Stale);
    assert!(needs_rebuild(corpus.path(), index.path()));
}

#[test]
fn fresh_index_is_loaded_not_rebuilt() {
    let corpus = tempdir().unwrap();
    let index = tempdir().unwrap();
    fs::write(corpus.path().join("A.txt"), "Denial rates for Google").unwrap();
    let past = SystemTime::now() - Duration::from_secs(3600);
    File::options().write(true).open(corpus.path().join("A.txt")).unwrap().set_modified(past).unwrap();
    File::open(corpus.path()).unwrap().set_modified(past).unwrap();

    let cfg = config_for(corpus.path(), index.path());
    let (built, first) = open_or_build(&cfg).unwrap();
    assert!(matches!(first, OpenOutcome::Built(_)));
    let (loaded, second) = open_or_build(&cfg).unwrap();
    assert_eq!(second, OpenOutcome::Loaded);
    assert_eq!(built.chunks(), loaded.chunks());
}

#[test]
fn corrupt_index_triggers_rebuild() {
    let corpus = tempdir().unwrap();
    let index = tempdir().unwrap();
    fs::write(corpus.path().join("A.txt"), "asylum interview").unwrap();
    let past = SystemTime::now() - Duration::from_secs(3600);
    File::options().write(true).open(corpus.path().join("A.txt")).unwrap().set_modified(past).unwrap();
    File::open(corpus.path()).unwrap().set_modified(past).unwrap();

    let cfg = config_for(corpus.path(), index.path());
    open_or_build(&cfg).unwrap();
    fs::write(IndexPaths::new(index.path()).items(), "{not json\n").unwrap();

    let (rebuilt, outcome) = open_or_build(&cfg).unwrap();
    assert!(matches!(outcome, OpenOutcome::Built(RebuildReason::Unloadable(_))));
    assert_eq!(rebuilt.meta().count, 1);
}

#[test]
fn service_rebuild_swaps_without_disturbing_held_snapshot() {
    let corpus = tempdir().unwrap();
    let index = tempdir().unwrap();
    fs::write(corpus.path().join("A.txt"), "H1B visa sponsor Amazon approvals").unwrap();
    let (service, _) = SearchService::open(config_for(corpus.path(), index.path())).unwrap();

    let held = service.handle().current();
    fs::write(corpus.path().join("B.txt"), "Denial rates for Google").unwrap();
    service.rebuild();

    assert_eq!(held.len(), 1);
    assert_eq!(service.handle().current().len(), 2);
    let hits = service.retrieve("google denial", 5);
    assert_eq!(hits[0].source, "B.txt");

    let (hits, ctx) = service.context("Amazon");
    assert_eq!(hits.len(), 1);
    assert!(ctx.starts_with("SOURCE FILE: A.txt  CHUNK: 0"));
}

#[test]
fn refresh_only_rebuilds_when_stale() {
    let corpus = tempdir().unwrap();
    let index = tempdir().unwrap();
    fs::write(corpus.path().join("A.txt"), "parole in place").unwrap();
    let (service, _) = SearchService::open(config_for(corpus.path(), index.path())).unwrap();

    let past = SystemTime::now() - Duration::from_secs(3600);
    File::options().write(true).open(corpus.path().join("A.txt")).unwrap().set_modified(past).unwrap();
    File::open(corpus.path()).unwrap().set_modified(past).unwrap();
    assert!(!service.refresh_if_stale());

    touch_future(&corpus.path().join("A.txt"));
    assert!(service.refresh_if_stale());
}

#[test]
fn concurrent_rebuilds_through_clones_leave_a_loadable_index() {
    let corpus = tempdir().unwrap();
    let index = tempdir().unwrap();
    fs::write(corpus.path().join("A.txt"), "H1B visa sponsor Amazon approvals").unwrap();
    fs::write(corpus.path().join("B.txt"), "Denial rates for Google").unwrap();
    let (service, _) = SearchService::open(config_for(corpus.path(), index.path())).unwrap();

    let workers: Vec<_> = (0..6)
        .map(|_| {
            let service = service.clone();
            std::thread::spawn(move || {
                for _ in 0..5 {
                    service.rebuild();
                    assert_eq!(service.handle().current().len(), 2);
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    let on_disk = load_index(&IndexPaths::new(index.path())).unwrap();
    assert_eq!(on_disk.len(), 2);
    assert_eq!(on_disk.chunks(), service.handle().current().chunks());
    let leftovers: Vec<_> = fs::read_dir(index.path()).unwrap()
        .map(|e| e.unwrap().file_name())
        .filter(|n| !["items.jsonl", "meta.json", "stats.bin"].iter().any(|k| n == k))
        .collect();
    assert!(leftovers.is_empty(), "stray files: {:?}", leftovers);
}

#[test]
fn unwritable_index_dir_still_serves_the_built_index() {
    let corpus = tempdir().unwrap();
    let scratch = tempdir().unwrap();
    fs::write(corpus.path().join("A.txt"), "asylum interview scheduling").unwrap();
    let blocker = scratch.path().join("not-a-dir");
    fs::write(&blocker, "regular file").unwrap();

    let cfg = config_for(corpus.path(), &blocker.join("index"));
    let (service, outcome) = SearchService::open(cfg.clone()).unwrap();
    assert!(matches!(outcome, OpenOutcome::Built(_)));
    let hits = service.retrieve("asylum interview", 3);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].source, "A.txt");

    service.rebuild();
    assert_eq!(service.handle().current().len(), 1);
    assert!(rag_core::lifecycle::build_and_save(&cfg).is_err());
}
