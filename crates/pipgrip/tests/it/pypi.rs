//! Resolution with a real Python interpreter, whose pip talks to PyPI.

use std::process::Command;

use anyhow::Result;
use assert_cmd::assert::OutputAssertExt;
use predicates::prelude::predicate;

/// A command using the interpreter pipgrip finds on `PATH`, rather than the fake one.
fn command() -> Command {
    let context = pipgrip_test::test_context!();
    let mut command = context.command();
    command.env_remove("PIPGRIP_PYTHON");
    // The context's temporary directory goes away with it.
    command.current_dir(std::env::temp_dir());
    command
}

#[test]
fn no_compile() {
    command()
        .args(["--no-compile", "requests==2.22.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("requests==2.22.0"))
        .stdout(predicate::str::contains("certifi=="));
}

#[test]
fn tree_json() -> Result<()> {
    let output = command()
        .args(["--tree", "--json", "--no-compile", "requests==2.22.0", "six"])
        .output()?;
    assert!(output.status.success());

    let packages: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout)?;
    let requests = packages
        .iter()
        .find(|package| package["name"] == "requests")
        .expect("requests is a top-level package");
    assert_eq!(requests["version"], "2.22.0");
    assert!(
        requests["dependencies"]
            .as_array()
            .is_some_and(|dependencies| dependencies
                .iter()
                .any(|dependency| dependency["name"] == "certifi"))
    );
    Ok(())
}

#[test]
fn skip_invalid_input() -> Result<()> {
    let output = command()
        .args([
            "--skip-invalid-input",
            "--json",
            "--no-compile",
            "gevent==20.9.0",
            "six",
        ])
        .output()?;
    assert!(output.status.success());

    let pins: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(&output.stdout)?;
    assert!(pins.contains_key("gevent"));
    assert!(pins.contains_key("six"));
    Ok(())
}

#[test]
fn unresolvable() {
    command()
        .args(["--no-compile", "nonexistent-package-that-does-not-exist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to get report for"));
}
