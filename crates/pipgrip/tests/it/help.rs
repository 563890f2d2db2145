use assert_cmd::assert::OutputAssertExt;
use predicates::prelude::predicate;

#[test]
fn help() {
    let context = pipgrip_test::test_context!();

    context
        .command()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Lightweight pip dependency resolver with deptree preview functionality.",
        ))
        .stdout(predicate::str::contains("--no-compile"))
        .stdout(predicate::str::contains(
            "Avoid building/compiling packages from source",
        ))
        .stdout(predicate::str::contains("--skip-invalid-input"))
        .stdout(predicate::str::contains("Skip invalid requirements"))
        .stdout(predicate::str::contains("--ignore-invalid"))
        .stdout(predicate::str::contains("Ignore invalid requirements"))
        .stdout(predicate::str::contains(
            "Zero or negative values mean no limit",
        ));
}

#[test]
fn help_short_flag() {
    let context = pipgrip_test::test_context!();

    context
        .command()
        .arg("-h")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: pipgrip [OPTIONS] [DEPENDENCIES]..."))
        .stdout(predicate::str::contains("--no-compile"));
}

/// The help wins over everything else on the command line.
#[test]
fn help_with_dependencies() {
    let context = pipgrip_test::test_context!();

    context
        .command()
        .args(["requests==2.22.0", "--no-compile", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--no-compile"));

    assert!(context.pip_invocations().is_empty());
}

#[test]
fn unknown_flag() {
    let context = pipgrip_test::test_context!();

    context
        .command()
        .arg("--no-such-flag")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains(
            "unexpected argument '--no-such-flag' found",
        ));
}

#[test]
fn conflicting_trees() {
    let context = pipgrip_test::test_context!();

    context
        .command()
        .args(["--tree", "--reversed-tree", "six"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("cannot be used with"));
}
