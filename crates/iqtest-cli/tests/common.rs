#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use assert_cmd::assert::Assert;
use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

pub const SITE: &str = "dev.localhost";

/// Stand-in for `bench`: appends its arguments to `calls.log` and fails any
/// invocation that mentions "fail".
const FAKE_BENCH: &str = r#"#!/bin/sh
echo "$*" >> "$(dirname "$0")/calls.log"
case "$*" in
  *fail*)
    echo "Running $*"
    echo "FAIL: test_broken (tests.test_broken)" >&2
    echo "FAILED (failures=1)" >&2
    exit 1
    ;;
esac
echo "Ran 1 test"
echo "OK"
"#;

pub struct FakeBench {
    _temp: TempDir,
    root: PathBuf,
}

impl FakeBench {
    /// Bench with `apps` installed; each `(app, manifest)` pair writes
    /// `apps/<app>/pyproject.toml` when the manifest is non-empty.
    pub fn new(apps: &[(&str, &str)]) -> Self {
        let temp = tempfile::Builder::new()
            .prefix("iqtest-bench")
            .tempdir()
            .expect("tempdir");
        let root = temp.path().join("bench");
        fs::create_dir_all(root.join("sites")).expect("sites dir");
        let apps_txt: String = apps.iter().map(|(app, _)| format!("{app}\n")).collect();
        fs::write(root.join("sites/apps.txt"), apps_txt).expect("apps.txt");
        fs::write(root.join("sites/currentsite.txt"), format!("{SITE}\n")).expect("currentsite");
        for (app, manifest) in apps {
            let dir = root.join("apps").join(app);
            fs::create_dir_all(&dir).expect("app dir");
            if !manifest.is_empty() {
                fs::write(dir.join("pyproject.toml"), manifest).expect("manifest");
            }
        }
        write_executable(&root.join("bin/bench"), FAKE_BENCH);
        Self { _temp: temp, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn remove_current_site(&self) {
        fs::remove_file(self.root.join("sites/currentsite.txt")).expect("remove currentsite");
    }

    /// Argument lines received by the fake `bench`, in call order.
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.root.join("bin/calls.log"))
            .map(|log| log.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// `iqtest` running inside the bench with a scrubbed environment.
    pub fn iqtest(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("iqtest");
        cmd.current_dir(&self.root)
            .env_remove("IQTEST_BENCH_ROOT")
            .env_remove("IQTEST_SITE")
            .env_remove("IQTEST_PYTHON")
            .env("IQTEST_BENCH_BIN", self.root.join("bin/bench"))
            .env("NO_COLOR", "1");
        cmd
    }
}

pub fn write_executable(path: &Path, contents: &str) {
    use std::os::unix::fs::PermissionsExt;

    fs::create_dir_all(path.parent().expect("parent")).expect("bin dir");
    fs::write(path, contents).expect("write script");
    let mut perms = fs::metadata(path).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("chmod");
}

pub fn parse_json(assert: &Assert) -> Value {
    serde_json::from_slice(&assert.get_output().stdout).expect("valid json")
}

pub fn stdout(assert: &Assert) -> String {
    String::from_utf8_lossy(&assert.get_output().stdout).into_owned()
}

pub fn stderr(assert: &Assert) -> String {
    String::from_utf8_lossy(&assert.get_output().stderr).into_owned()
}

pub const APP_A: &str = r#"
[project]
name = "a"

[[tool.iq.tests]]
section = "Core"
steps = [
    { module = "a.step1" },
    { module = "a.fail_step2" },
]
"#;

pub const APP_B: &str = r#"
[project]
name = "b"

[[tool.iq.tests]]
section = "Billing"
steps = [
    { module = "b.step1", tests = ["test_vat", "test_gst"] },
    { doctype = "Sales Invoice" },
]
"#;
