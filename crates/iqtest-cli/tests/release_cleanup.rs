#![cfg(unix)]

mod common;

use std::fs;

use common::{parse_json, stdout, FakeBench};

const CLEANUP_APP: &str = r#"
[project]
name = "acme"

[[tool.iq.release-cleanup]]
bash = "touch cleaned.marker"

[[tool.iq.release-cleanup]]
function = "acme.release.drop_caches"

[[tool.iq.release-cleanup]]
script = "scripts/tidy.sh"
"#;

const BROKEN_CLEANUP_APP: &str = r#"
[[tool.iq.release-cleanup]]
bash = "exit 4"

[[tool.iq.release-cleanup]]
bash = "touch after-failure.marker"
"#;

#[test]
fn runs_declared_tasks_in_the_bench_root() {
    let bench = FakeBench::new(&[("acme", CLEANUP_APP)]);
    let scripts = bench.root().join("apps/acme/scripts");
    fs::create_dir_all(&scripts).expect("scripts dir");
    fs::write(scripts.join("tidy.sh"), "touch tidied.marker\n").expect("script");

    let assert = bench.iqtest().arg("release-cleanup").assert().success();

    assert!(bench.root().join("cleaned.marker").exists());
    assert!(bench.root().join("tidied.marker").exists());
    let out = stdout(&assert);
    assert!(out.contains("> CLEANUP [acme]: bash: touch cleaned.marker"));
    assert!(out.contains("- skipped: function acme.release.drop_caches needs the host interpreter"));
    assert!(out.contains("Release cleanup finished"));
}

#[test]
fn failed_tasks_set_the_exit_code_but_do_not_stop_the_rest() {
    let bench = FakeBench::new(&[("acme", BROKEN_CLEANUP_APP)]);

    let assert = bench
        .iqtest()
        .args(["release-cleanup", "--json"])
        .assert()
        .code(1);

    assert!(bench.root().join("after-failure.marker").exists());
    let payload = parse_json(&assert);
    let records = payload["records"].as_array().expect("records");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["outcome"]["outcome"], "failed");
    assert_eq!(records[0]["outcome"]["return_code"], 4);
    assert_eq!(records[1]["outcome"]["outcome"], "succeeded");
}

#[test]
fn nothing_declared_is_not_an_error() {
    let bench = FakeBench::new(&[("acme", "[project]\nname = \"acme\"\n")]);

    let assert = bench.iqtest().arg("release-cleanup").assert().success();

    assert!(stdout(&assert).contains("No release-cleanup tasks declared."));
}
