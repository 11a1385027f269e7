//! Job store tests against an on-disk database

use crate::fixtures::candidate;
use jobtrawl::crawler::compact_duplicates;
use jobtrawl::storage::{open_store, JobStatus, JobStore, RunStatus};

#[test]
fn test_compaction_keeps_lowest_id_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_store(&dir.path().join("jobs.db")).unwrap();

    let mut ids = Vec::new();
    for suffix in ["a", "b", "c"] {
        let mut copy = candidate(1);
        copy.url = format!("{}?ref={}", copy.url, suffix);
        ids.push(store.insert(&copy).unwrap().unwrap().id);
    }
    let other = store.insert(&candidate(2)).unwrap().unwrap();

    assert_eq!(compact_duplicates(&mut store).unwrap(), 2);
    assert_eq!(compact_duplicates(&mut store).unwrap(), 0);

    let lowest = *ids.iter().min().unwrap();
    assert!(store.get(lowest).unwrap().is_some());
    for id in ids.iter().filter(|id| **id != lowest) {
        assert!(store.get(*id).unwrap().is_none());
    }
    assert!(store.get(other.id).unwrap().is_some());
    assert_eq!(store.count().unwrap(), 2);
}

#[test]
fn test_records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("jobs.db");

    {
        let mut store = open_store(&path).unwrap();
        store.insert(&candidate(1)).unwrap();
    }

    let store = open_store(&path).unwrap();
    assert!(store.exists(&candidate(1).url).unwrap());
    assert!(store
        .exists_by_triple("Role 1", "Company 1", "City 1, CA")
        .unwrap());
    assert!(!store.exists(&candidate(2).url).unwrap());
}

#[test]
fn test_insert_reports_url_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_store(&dir.path().join("jobs.db")).unwrap();

    assert!(store.insert(&candidate(1)).unwrap().is_some());
    let mut same_url = candidate(7);
    same_url.url = candidate(1).url;
    assert!(store.insert(&same_url).unwrap().is_none());
    assert_eq!(store.count().unwrap(), 1);
}

#[test]
fn test_mark_applied() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_store(&dir.path().join("jobs.db")).unwrap();
    let record = store.insert(&candidate(1)).unwrap().unwrap();

    assert_eq!(record.status, JobStatus::Found);
    assert!(store.mark_applied(record.id).unwrap());
    assert!(!store.mark_applied(record.id + 100).unwrap());

    let applied = store.get(record.id).unwrap().unwrap();
    assert!(applied.applied);
    assert!(applied.applied_at.is_some());
    assert_eq!(applied.status, JobStatus::Applied);
}

#[test]
fn test_list_all_most_recent_first() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_store(&dir.path().join("jobs.db")).unwrap();
    for id in 1..=3 {
        store.insert(&candidate(id)).unwrap();
    }

    let titles: Vec<String> = store
        .list_all()
        .unwrap()
        .into_iter()
        .map(|job| job.title)
        .collect();
    assert_eq!(titles, vec!["Role 3", "Role 2", "Role 1"]);
}

#[test]
fn test_latest_runs_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open_store(&dir.path().join("jobs.db")).unwrap();

    let first = store.create_run("h1").unwrap();
    store
        .finish_run(first, RunStatus::Completed, "end-of-results", 4, 12)
        .unwrap();
    let second = store.create_run("h2").unwrap();

    let runs = store.latest_runs(10).unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].id, second);
    assert_eq!(runs[0].status, RunStatus::Running);
    assert_eq!(runs[1].stop_reason.as_deref(), Some("end-of-results"));
    assert_eq!(runs[1].saved, 12);
}
