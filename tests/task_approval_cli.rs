mod support;

use support::TestStore;

#[test]
fn approval_creates_assignment_entry() {
    let store = TestStore::new();
    let id = store.add_task("E1", "2024-06-15", "Film");

    let data = store.json_ok(&["task", "approval", &id, "approved"]);
    assert_eq!(data["task"]["approval"], "approved");
    assert_eq!(data["reconcile"]["status"], "applied");
    assert_eq!(data["reconcile"]["completed"], 1);

    let groups = store.json_ok(&["assigned", "list", "--eid", "E1"]);
    assert_eq!(groups["total"], 1);
    let group = &groups["groups"][0];
    assert_eq!(group["month"], 6);
    assert_eq!(group["year"], 2024);
    assert_eq!(group["tasks"][0]["projectType"], "Film");
    assert_eq!(group["tasks"][0]["assigned"], 0);
    assert_eq!(group["tasks"][0]["completed"], 1);
}

#[test]
fn reapproval_leaves_counts_unchanged() {
    let store = TestStore::new();
    let id = store.add_task("E1", "2024-06-15", "Film");

    store.json_ok(&["task", "approval", &id, "approved"]);
    let data = store.json_ok(&["task", "approval", &id, "approved"]);
    assert_eq!(data["reconcile"]["status"], "not_triggered");

    let groups = store.records("assigned_tasks");
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["tasks"][0]["completed"], 1);
}

#[test]
fn full_edit_also_reconciles() {
    let store = TestStore::new();
    store.json_ok(&[
        "assigned", "bulk", "--file", &write_payload(&store),
    ]);
    let id = store.add_task("E1", "2024-06-02", "Film");

    let data = store.json_ok(&["task", "edit", &id, "--approval", "approved", "--note", "final cut"]);
    assert_eq!(data["task"]["note"], "final cut");
    assert_eq!(data["reconcile"]["status"], "applied");

    let groups = store.records("assigned_tasks");
    assert_eq!(groups[0]["tasks"][0]["assigned"], 5);
    assert_eq!(groups[0]["tasks"][0]["completed"], 1);
}

fn write_payload(store: &TestStore) -> String {
    store
        .write_file(
            "payload.json",
            r#"[{"eid":"E1","projectType":"Film","assigned":5,"completed":0,"month":6,"year":2024}]"#,
        )
        .expect("write payload")
        .display()
        .to_string()
}

#[test]
fn invalid_approval_value_is_rejected() {
    let store = TestStore::new();
    let id = store.add_task("E1", "2024-06-15", "Film");

    let err = store.json_err(&["task", "approval", &id, "rejected"], 2);
    assert_eq!(err["http_status"], 400);
    assert_eq!(err["details"]["value"], "rejected");

    let tasks = store.records("tasks");
    assert_eq!(tasks[0]["approval"], "pending");
}

#[test]
fn unknown_task_is_not_found() {
    let store = TestStore::new();
    let err = store.json_err(&["task", "approval", "01NOPE", "approved"], 3);
    assert_eq!(err["kind"], "not_found");
    assert_eq!(err["http_status"], 404);
}

#[test]
fn regression_can_be_disabled_in_config() {
    let store = TestStore::new();
    store
        .write_config("[tasks]\nallow_approval_regression = false\n")
        .expect("write config");
    let id = store.add_task("E1", "2024-06-15", "Film");
    store.json_ok(&["task", "approval", &id, "approved"]);

    store.json_err(&["task", "approval", &id, "pending"], 2);
    let tasks = store.records("tasks");
    assert_eq!(tasks[0]["approval"], "approved");
}

#[test]
fn task_queries_filter_and_total_points() {
    let store = TestStore::new();
    store.add_task("E1", "2024-06-01", "Film");
    store.add_task("E1", "2024-06-20", "Reel");
    store.add_task("E2", "2024-07-01", "Film");

    let month = store.json_ok(&["task", "month", "--eid", "E1", "--month", "2024-06"]);
    assert_eq!(month["total"], 2);
    assert_eq!(month["total_points"], 13.0);
    assert_eq!(month["tasks"][0]["date"], "2024-06-20");

    let films = store.json_ok(&["task", "list", "--project-type", "Film"]);
    assert_eq!(films["total"], 2);

    let all = store.json_ok(&["task", "all"]);
    assert_eq!(all["total"], 3);
    assert_eq!(all["tasks"][0]["date"], "2024-07-01");

    store.json_err(&["task", "month", "--eid", "E1", "--month", "June"], 2);
}

#[test]
fn add_rejects_bad_dates_and_rm_deletes() {
    let store = TestStore::new();
    store.json_err(
        &[
            "task", "add", "--eid", "E1", "--name", "Asha", "--date", "2024-02-30", "--project", "P",
            "--type", "Film", "--status", "Completed", "--category", "onsite",
        ],
        2,
    );

    let id = store.add_task("E1", "2024-06-15", "Film");
    store.json_ok(&["task", "rm", &id]);
    store.json_err(&["task", "rm", &id], 3);
}
