use anyhow::Result;
use assert_fs::prelude::*;
use indoc::indoc;

use pipgrip_test::pipgrip_snapshot;

/// The unresolvable requirement is kept in the output, next to everything that resolved.
#[test]
fn unresolvable() {
    let context = pipgrip_test::test_context!();

    pipgrip_snapshot!(context.filters(), context.command().args(["--skip-invalid-input", "--threads", "1", "requests==2.22.0", "nonexistent-package"]), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    requests==2.22.0
    chardet==3.0.4
    idna==2.8
    urllib3==1.25.11
    certifi==2024.8.30
    nonexistent-package

    ----- stderr -----
    warning: Skipping `nonexistent-package`, which failed to resolve: ERROR: No matching distribution found for nonexistent-package
    ");

    // The combined report fails, then every requirement is reported on by itself. The report
    // of the only survivor is reused.
    insta::assert_debug_snapshot!(context.pip_invocations(), @r#"
    [
        "pip install --dry-run --ignore-installed --quiet --no-input --disable-pip-version-check --report [TEMP] requests==2.22.0 nonexistent-package",
        "pip install --dry-run --ignore-installed --quiet --no-input --disable-pip-version-check --report [TEMP] requests==2.22.0",
        "pip install --dry-run --ignore-installed --quiet --no-input --disable-pip-version-check --report [TEMP] nonexistent-package",
    ]
    "#);
}

#[test]
fn unresolvable_json() -> Result<()> {
    let context = pipgrip_test::test_context!();

    let output = context
        .command()
        .args([
            "--skip-invalid-input",
            "--json",
            "nonexistent-package",
            "requests==2.22.0",
        ])
        .output()?;
    assert!(output.status.success());

    let pins: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(&output.stdout)?;
    assert_eq!(pins["requests"], "2.22.0");
    assert_eq!(pins["nonexistent-package"], serde_json::Value::Null);
    Ok(())
}

/// The requirements that resolve on their own are reported on together once more.
#[test]
fn survivors_reported_together() {
    let context = pipgrip_test::test_context!();

    pipgrip_snapshot!(context.filters(), context
        .command()
        .args(["--skip-invalid-input", "--threads", "1", "requests==2.22.0", "nonexistent-package", "six>=1.0"]), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    requests==2.22.0
    chardet==3.0.4
    idna==2.8
    urllib3==1.25.11
    certifi==2024.8.30
    nonexistent-package
    six==1.16.0

    ----- stderr -----
    warning: Skipping `nonexistent-package`, which failed to resolve: ERROR: No matching distribution found for nonexistent-package
    ");

    let invocations = context.pip_invocations();
    assert_eq!(invocations.len(), 5);
    assert!(invocations[4].ends_with(" requests==2.22.0 six>=1.0"));
}

/// A lone unresolvable requirement is only reported on once.
#[test]
fn only_unresolvable() {
    let context = pipgrip_test::test_context!();

    pipgrip_snapshot!(context.filters(), context.command().args(["--skip-invalid-input", "--tree", "nonexistent-package==1.0"]), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    nonexistent-package==1.0 (skipped)

    ----- stderr -----
    warning: Skipping `nonexistent-package==1.0`, which failed to resolve: ERROR: No matching distribution found for nonexistent-package==1.0
    ");
    assert_eq!(context.pip_invocations().len(), 1);
}

#[test]
fn invalid_syntax() {
    let context = pipgrip_test::test_context!();

    pipgrip_snapshot!(context.filters(), context.command().args(["--skip-invalid-input", "invalid::syntax", "six"]), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    six==1.16.0

    ----- stderr -----
    warning: Skipping invalid requirement 'invalid::syntax'
    ");
}

#[test]
fn ignore_invalid_syntax() {
    let context = pipgrip_test::test_context!();

    pipgrip_snapshot!(context.filters(), context.command().args(["--ignore-invalid", "invalid::syntax", "six"]), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    six==1.16.0

    ----- stderr -----
    warning: Ignoring invalid requirement 'invalid::syntax'
    ");
}

/// `--ignore-invalid` only covers syntax errors.
#[test]
fn ignore_invalid_unresolvable() {
    let context = pipgrip_test::test_context!();

    let output = context
        .command()
        .args(["--ignore-invalid", "nonexistent-package"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.starts_with("error: Failed to get report for nonexistent-package"),
        "{stderr}"
    );
}

#[test]
fn flags_alone() {
    let context = pipgrip_test::test_context!();

    for flag in ["--skip-invalid-input", "--ignore-invalid"] {
        let output = context.command().arg(flag).output().unwrap();
        assert!(output.status.success());
        assert!(output.stdout.is_empty());
    }
    assert!(context.pip_invocations().is_empty());
}

#[test]
fn requirements_file() -> Result<()> {
    let context = pipgrip_test::test_context!();
    let requirements_txt = context.temp_dir.child("requirements.txt");
    requirements_txt.write_str(indoc! {"
        requests==2.22.0
        invalid::syntax
        # comment line
        six
        http://invalid-url::format
    "})?;

    pipgrip_snapshot!(context.filters(), context.command().args(["--skip-invalid-input", "-r", "requirements.txt", "--pipe"]), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    requests==2.22.0 chardet==3.0.4 idna==2.8 urllib3==1.25.11 certifi==2024.8.30 six==1.16.0

    ----- stderr -----
    warning: Skipping invalid requirement 'invalid::syntax'
    warning: Skipping invalid requirement 'http://invalid-url::format'
    ");
    Ok(())
}

/// A requirement that fails on its own, on a package another requirement pulls in anyway,
/// shows up once, at the version pip resolved.
#[test]
fn unresolvable_on_a_resolved_package() {
    let context = pipgrip_test::test_context!();

    pipgrip_snapshot!(context.filters(), context.command().args(["--skip-invalid-input", "--json", "requests==2.22.0", "certifi==1900.1"]), @r#"
    success: true
    exit_code: 0
    ----- stdout -----
    {"requests":"2.22.0","chardet":"3.0.4","idna":"2.8","urllib3":"1.25.11","certifi":"2024.8.30"}

    ----- stderr -----
    warning: Skipping `certifi==1900.1`, which failed to resolve: ERROR: No matching distribution found for certifi==1900.1
    "#);

    pipgrip_snapshot!(context.filters(), context.command().args(["--skip-invalid-input", "requests==2.22.0", "certifi==1900.1"]), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    requests==2.22.0
    chardet==3.0.4
    idna==2.8
    urllib3==1.25.11
    certifi==2024.8.30

    ----- stderr -----
    warning: Skipping `certifi==1900.1`, which failed to resolve: ERROR: No matching distribution found for certifi==1900.1
    ");
}

#[test]
fn unresolvable_tree_json() -> Result<()> {
    let context = pipgrip_test::test_context!();

    let output = context
        .command()
        .args([
            "--skip-invalid-input",
            "--tree",
            "--json",
            "requests==2.22.0",
            "nonexistent-package==1.0",
        ])
        .output()?;
    assert!(output.status.success());

    let packages: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout)?;
    assert_eq!(packages.len(), 2);

    let requests = &packages[0];
    assert_eq!(requests["name"], "requests");
    assert_eq!(requests["version"], "2.22.0");
    assert!(
        requests["dependencies"]
            .as_array()
            .is_some_and(|dependencies| dependencies
                .iter()
                .any(|dependency| dependency["name"] == "certifi"))
    );

    let skipped = packages
        .iter()
        .filter(|package| package["name"] == "nonexistent-package")
        .collect::<Vec<_>>();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0]["version"], "1.0");
    assert!(skipped[0].get("dependencies").is_none());
    Ok(())
}

/// An unresolvable line in a requirements file is skipped like the same positional argument.
#[test]
fn requirements_file_unresolvable() -> Result<()> {
    let context = pipgrip_test::test_context!();
    let requirements_txt = context.temp_dir.child("requirements.txt");
    requirements_txt.write_str(indoc! {"
        requests==2.22.0
        nonexistent-package
    "})?;

    let from_file = context
        .command()
        .args(["--skip-invalid-input", "-r", "requirements.txt"])
        .output()?;
    let from_arguments = context
        .command()
        .args(["--skip-invalid-input", "requests==2.22.0", "nonexistent-package"])
        .output()?;
    assert!(from_file.status.success());
    assert_eq!(from_file.stdout, from_arguments.stdout);
    assert_eq!(from_file.stderr, from_arguments.stderr);

    pipgrip_snapshot!(context.filters(), context.command().args(["--skip-invalid-input", "-r", "requirements.txt"]), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    requests==2.22.0
    chardet==3.0.4
    idna==2.8
    urllib3==1.25.11
    certifi==2024.8.30
    nonexistent-package

    ----- stderr -----
    warning: Skipping `nonexistent-package`, which failed to resolve: ERROR: No matching distribution found for nonexistent-package
    ");
    Ok(())
}
