//! Binary-level tests for `sim_lsmplugin`.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use rstest::{fixture, rstest};

#[fixture]
fn plugin() -> Command {
    let mut command = cargo_bin_cmd!("sim_lsmplugin");
    command.env("LSM_LOG_FILTER", "warn");
    command
}

#[rstest]
fn lists_systems_in_standalone_mode(mut plugin: Command) {
    plugin
        .args(["--uri", "sim://", "systems"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"sim-01\""));
}

#[rstest]
fn forwards_search_params(mut plugin: Command) {
    plugin
        .args([
            "--uri",
            "sim://",
            "--params",
            r#"{"search_key": "id", "search_value": "POO1"}"#,
            "pools",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("POO1").and(predicate::str::contains("POO2").not()));
}

#[rstest]
fn rejects_foreign_uris(mut plugin: Command) {
    plugin
        .args(["--uri", "ontap://filer", "systems"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("sim://"));
}

#[rstest]
fn reports_unsupported_operations(mut plugin: Command) {
    plugin
        .args(["--uri", "sim://", "volumes"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unsupported operation"));
}

#[rstest]
fn prints_help(mut plugin: Command) {
    plugin
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--uri"));
}

#[rstest]
#[case("987654")]
#[case("4294967296")]
fn unusable_descriptor_exits_abnormally(mut plugin: Command, #[case] descriptor: &str) {
    plugin.arg(descriptor).assert().code(2);
}
