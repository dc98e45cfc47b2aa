mod support;

use support::TestStore;

#[test]
fn option_lists_are_seeded_and_editable() {
    let store = TestStore::new();
    let types = store.json_ok(&["option", "list", "--kind", "type"]);
    assert_eq!(types["kind"], "projecttype");
    assert!(types["values"]
        .as_array()
        .expect("values")
        .iter()
        .any(|v| v == "Film"));

    let added = store.json_ok(&["option", "add", "--kind", "type", "Podcast"]);
    assert!(added["values"].as_array().expect("values").iter().any(|v| v == "Podcast"));
    store.json_err(&["option", "add", "--kind", "type", "podcast"], 2);

    store.json_ok(&["option", "rename", "--kind", "status", "On Hold", "Paused"]);
    store.json_err(&["option", "rename", "--kind", "status", "On Hold", "Waiting"], 3);
    store.json_ok(&["option", "rm", "--kind", "status", "Paused"]);
    store.json_err(&["option", "list", "--kind", "colour"], 2);
}

#[test]
fn points_set_and_apply_to_saved_tasks() {
    let store = TestStore::new();
    store.add_task("E1", "2024-06-15", "Film");
    store.add_task("E1", "2024-06-16", "Film");

    let film = store.json_ok(&["points", "show", "Film"]);
    assert_eq!(film["points"], 10.0);
    store.json_err(&["points", "show", "Documentary"], 3);

    let set = store.json_ok(&["points", "set", "Film", "12"]);
    assert_eq!(set["points"], 12.0);
    assert!(set.get("tasks_updated").is_none());
    let tasks = store.records("tasks");
    assert_eq!(tasks[0]["points"], 10.0);

    let applied = store.json_ok(&["points", "set", "Film", "12", "--apply"]);
    assert_eq!(applied["tasks_updated"], 2);
    let tasks = store.records("tasks");
    assert!(tasks.iter().all(|t| t["points"] == 12.0));

    store.json_err(&["points", "set", "Film", "-1"], 2);
}

#[test]
fn unknown_project_type_logs_zero_points() {
    let store = TestStore::new();
    store.add_task("E1", "2024-06-15", "Documentary");
    assert_eq!(store.records("tasks")[0]["points"], 0.0);
}

#[test]
fn projects_add_deactivate_remove() {
    let store = TestStore::new();
    store.json_ok(&["project", "add", "Wedding A"]);
    store.json_ok(&["project", "add", "Brand Reel"]);
    store.json_err(&["project", "add", "wedding a"], 2);

    store.json_ok(&["project", "deactivate", "Wedding A"]);
    let active = store.json_ok(&["project", "list"]);
    assert_eq!(active["total"], 1);
    let all = store.json_ok(&["project", "list", "--all"]);
    assert_eq!(all["total"], 2);

    store.json_ok(&["project", "rm", "Brand Reel"]);
    store.json_err(&["project", "rm", "Brand Reel"], 3);
}
