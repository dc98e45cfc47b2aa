#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

pub struct TestStore {
    dir: TempDir,
}

impl TestStore {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_file(&self, rel_path: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<PathBuf> {
        self.write_file("tally.toml", contents)
    }

    /// Raw records of a collection file.
    pub fn records(&self, collection: &str) -> Vec<Value> {
        let path = self.dir.path().join(format!("{collection}.json"));
        if !path.exists() {
            return Vec::new();
        }
        let contents = fs::read_to_string(&path).expect("read collection");
        let value: Value = serde_json::from_str(&contents).expect("collection json");
        value["records"].as_array().cloned().unwrap_or_default()
    }

    /// A tally command bound to this data directory.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("tally").expect("binary");
        cmd.env("TALLY_DATA_DIR", self.dir.path())
            .env_remove("TALLY_PASSWORD")
            .env_remove("TALLY_TOKEN")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Run with `--json`, assert success and return the envelope's `data`.
    pub fn json_ok(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .args(args)
            .arg("--json")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let value: Value = serde_json::from_slice(&output).expect("json envelope");
        assert_eq!(value["status"], "success");
        value["data"].clone()
    }

    /// Run with `--json`, assert the exit code and return the envelope's `error`.
    pub fn json_err(&self, args: &[&str], code: i32) -> Value {
        let output = self
            .cmd()
            .args(args)
            .arg("--json")
            .assert()
            .code(code)
            .get_output()
            .stdout
            .clone();
        let value: Value = serde_json::from_slice(&output).expect("json envelope");
        assert_eq!(value["status"], "error");
        value["error"].clone()
    }

    pub fn add_task(&self, eid: &str, date: &str, projecttype: &str) -> String {
        let data = self.json_ok(&[
            "task",
            "add",
            "--eid",
            eid,
            "--name",
            "Asha",
            "--date",
            date,
            "--project",
            "Wedding A",
            "--type",
            projecttype,
            "--status",
            "In Progress",
            "--category",
            "post-production",
        ]);
        data["id"].as_str().expect("task id").to_string()
    }
}
