use anyhow::Result;
use assert_fs::prelude::*;
use indoc::indoc;

use pipgrip_test::pipgrip_snapshot;

#[test]
fn flat() {
    let context = pipgrip_test::test_context!();

    pipgrip_snapshot!(context.filters(), context.command().arg("requests==2.22.0"), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    requests==2.22.0
    chardet==3.0.4
    idna==2.8
    urllib3==1.25.11
    certifi==2024.8.30

    ----- stderr -----
    ");

    insta::assert_debug_snapshot!(context.pip_invocations(), @r#"
    [
        "pip install --dry-run --ignore-installed --quiet --no-input --disable-pip-version-check --report [TEMP] requests==2.22.0",
    ]
    "#);
}

#[test]
fn zero_dependencies() {
    let context = pipgrip_test::test_context!();

    pipgrip_snapshot!(context.filters(), context.command().args(["six", "--json"]), @r#"
    success: true
    exit_code: 0
    ----- stdout -----
    {"six":"1.16.0"}

    ----- stderr -----
    "#);
}

#[test]
fn pipe_sorted() {
    let context = pipgrip_test::test_context!();

    pipgrip_snapshot!(context.filters(), context.command().args(["requests==2.22.0", "six", "--pipe", "--sort"]), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    certifi==2024.8.30 chardet==3.0.4 idna==2.8 requests==2.22.0 six==1.16.0 urllib3==1.25.11

    ----- stderr -----
    ");
}

/// The JSON object keeps the output order, rather than sorting by name.
#[test]
fn json() -> Result<()> {
    let context = pipgrip_test::test_context!();

    pipgrip_snapshot!(context.filters(), context.command().args(["requests==2.22.0", "--json"]), @r#"
    success: true
    exit_code: 0
    ----- stdout -----
    {"requests":"2.22.0","chardet":"3.0.4","idna":"2.8","urllib3":"1.25.11","certifi":"2024.8.30"}

    ----- stderr -----
    "#);

    let output = context
        .command()
        .args(["requests==2.22.0", "--json"])
        .output()?;
    let pins: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(&output.stdout)?;
    assert_eq!(pins.len(), 5);
    assert_eq!(pins["requests"], "2.22.0");
    Ok(())
}

/// A requirements file behaves like the same requirements on the command line.
#[test]
fn requirements_file() -> Result<()> {
    let context = pipgrip_test::test_context!();
    let requirements_txt = context.temp_dir.child("requirements.txt");
    requirements_txt.write_str(indoc! {"
        # The HTTP client
        requests==2.22.0
        six>=1.0  # no dependencies
    "})?;

    let from_file = context.command().args(["-r", "requirements.txt"]).output()?;
    let from_arguments = context
        .command()
        .args(["requests==2.22.0", "six>=1.0"])
        .output()?;
    assert!(from_file.status.success());
    assert_eq!(from_file.stdout, from_arguments.stdout);

    pipgrip_snapshot!(context.filters(), context.command().args(["-r", "requirements.txt"]), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    requests==2.22.0
    chardet==3.0.4
    idna==2.8
    urllib3==1.25.11
    certifi==2024.8.30
    six==1.16.0

    ----- stderr -----
    ");
    Ok(())
}

/// The first requirement on a package wins, whether from the command line or a file.
#[test]
fn duplicate_requirements() -> Result<()> {
    let context = pipgrip_test::test_context!();
    let requirements_txt = context.temp_dir.child("requirements.txt");
    requirements_txt.write_str("Requests>=2.0\nsix\n")?;

    pipgrip_snapshot!(context.filters(), context.command().args(["requests==2.22.0", "-r", "requirements.txt", "--pipe"]), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    requests==2.22.0 chardet==3.0.4 idna==2.8 urllib3==1.25.11 certifi==2024.8.30 six==1.16.0

    ----- stderr -----
    ");

    insta::assert_debug_snapshot!(context.pip_invocations(), @r#"
    [
        "pip install --dry-run --ignore-installed --quiet --no-input --disable-pip-version-check --report [TEMP] requests==2.22.0 six",
    ]
    "#);
    Ok(())
}

#[test]
fn unresolvable() {
    let context = pipgrip_test::test_context!();

    pipgrip_snapshot!(context.filters(), context.command().arg("nonexistent-package"), @r"
    success: false
    exit_code: 2
    ----- stdout -----

    ----- stderr -----
    error: Failed to get report for nonexistent-package
      Caused by: ERROR: Could not find a version that satisfies the requirement nonexistent-package (from versions: none)
                 ERROR: No matching distribution found for nonexistent-package
    ");
}

/// Without `--skip-invalid-input`, one unresolvable requirement fails the whole resolution.
#[test]
fn unresolvable_with_resolvable() {
    let context = pipgrip_test::test_context!();

    pipgrip_snapshot!(context.filters(), context.command().args(["requests==2.22.0", "nonexistent-package"]), @r"
    success: false
    exit_code: 2
    ----- stdout -----

    ----- stderr -----
    error: Failed to get report for requests==2.22.0 nonexistent-package
      Caused by: ERROR: Could not find a version that satisfies the requirement nonexistent-package (from versions: none)
                 ERROR: No matching distribution found for nonexistent-package
    ");
}

#[test]
fn invalid_syntax() {
    let context = pipgrip_test::test_context!();

    let output = context.command().arg("invalid::syntax").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.starts_with("error: Failed to parse `invalid::syntax`"),
        "{stderr}"
    );
    assert!(stderr.contains("::syntax"), "{stderr}");
    assert!(context.pip_invocations().is_empty());
}

/// Nothing to resolve is not an error, and pip isn't asked.
#[test]
fn no_requirements() {
    let context = pipgrip_test::test_context!();

    pipgrip_snapshot!(context.filters(), context.command(), @r"
    success: true
    exit_code: 0
    ----- stdout -----

    ----- stderr -----
    ");
    assert!(context.pip_invocations().is_empty());
}

#[test]
fn pip_options() -> Result<()> {
    let context = pipgrip_test::test_context!();
    let requirements_txt = context.temp_dir.child("requirements.txt");
    requirements_txt.write_str(indoc! {"
        --extra-index-url https://example.org/extra
        -c constraints.txt
        requests==2.22.0
    "})?;
    context
        .temp_dir
        .child("constraints.txt")
        .write_str("urllib3<1.26\n")?;

    let output = context
        .command()
        .args([
            "-r",
            "requirements.txt",
            "--no-compile",
            "--pre",
            "--index-url",
            "https://example.org/simple",
            "--no-cache-dir",
        ])
        .output()?;
    assert!(output.status.success());

    insta::assert_debug_snapshot!(context.pip_invocations(), @r#"
    [
        "pip install --dry-run --ignore-installed --quiet --no-input --disable-pip-version-check --report [TEMP] --only-binary=:all: --pre --index-url https://example.org/simple --extra-index-url https://example.org/extra --no-cache-dir --constraint [TEMP] requests==2.22.0",
    ]
    "#);
    Ok(())
}

#[test]
fn missing_python() {
    let context = pipgrip_test::test_context!();

    let output = context
        .command()
        .arg("six")
        .env("PIPGRIP_PYTHON", "/does/not/exist/python")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.starts_with("error: Python interpreter `/does/not/exist/python` not found"),
        "{stderr}"
    );
}

#[test]
fn missing_requirements_file() {
    let context = pipgrip_test::test_context!();

    let output = context
        .command()
        .args(["-r", "missing.txt"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing.txt"), "{stderr}");
}
