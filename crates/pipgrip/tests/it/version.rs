use pipgrip_test::pipgrip_snapshot;

#[test]
fn version() {
    let context = pipgrip_test::test_context!();

    pipgrip_snapshot!(context.filters(), context.command().arg("--version"), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    pipgrip, version 0.11.0

    ----- stderr -----
    ");
}

#[test]
fn version_short_flag() {
    let context = pipgrip_test::test_context!();

    pipgrip_snapshot!(context.filters(), context.command().arg("-V"), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    pipgrip, version 0.11.0

    ----- stderr -----
    ");
}

/// Printing the version doesn't need an interpreter.
#[test]
fn version_without_python() {
    let context = pipgrip_test::test_context!();

    pipgrip_snapshot!(context.filters(), context
        .command()
        .arg("--version")
        .env("PIPGRIP_PYTHON", "/does/not/exist/python"), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    pipgrip, version 0.11.0

    ----- stderr -----
    ");
}
