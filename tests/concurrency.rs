mod support;

use std::process::Command;
use std::thread;

use assert_cmd::cargo::cargo_bin;
use tally::assigned::{AssignmentFilter, AssignmentStore};
use tally::bulk;
use tally::storage::Storage;

use support::TestStore;

#[test]
fn parallel_bulk_merges_keep_one_document_per_key() {
    let store = TestStore::new();
    let storage = Storage::new(store.path());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let storage = storage.clone();
            thread::spawn(move || {
                let payload = format!(
                    r#"[{{"eid":"E1","projectType":"Type{i}","assigned":{i},"month":6,"year":2024}}]"#
                );
                let store = AssignmentStore::new(storage);
                let items = bulk::parse_items(&payload).expect("parse");
                bulk::merge(&store, bulk::normalize(items)).expect("merge");
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread");
    }

    let groups = AssignmentStore::new(storage)
        .list(&AssignmentFilter::default())
        .expect("list");
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].tasks.len(), 8);
}

#[test]
fn parallel_processes_do_not_lose_tasks() {
    let store = TestStore::new();
    let children: Vec<_> = (0..6)
        .map(|i| {
            Command::new(cargo_bin("tally"))
                .env("TALLY_DATA_DIR", store.path())
                .args([
                    "task", "add", "--eid", &format!("E{i}"), "--name", "Asha", "--date", "2024-06-15",
                    "--project", "Wedding A", "--type", "Film", "--status", "Completed",
                    "--category", "post-production", "-q",
                ])
                .spawn()
                .expect("spawn tally")
        })
        .collect();
    for mut child in children {
        assert!(child.wait().expect("wait").success());
    }

    assert_eq!(store.records("tasks").len(), 6);
}
